//! Display types shared by several pages.
//!
//! Templates only see preformatted strings, so price and date formatting
//! lives here instead of in the templates.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::{Address, CartItem, Order, OrderItem, Product, Service, Slide};

/// `?error=` / `?success=` codes set by form redirects.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

impl MessageQuery {
    #[must_use]
    pub fn flash(&self) -> Flash {
        Flash {
            error: self.error.as_deref().map(error_text),
            success: self.success.as_deref().map(success_text),
        }
    }
}

/// Messages rendered at the top of a page.
#[derive(Debug, Clone, Default)]
pub struct Flash {
    pub error: Option<&'static str>,
    pub success: Option<&'static str>,
}

fn error_text(code: &str) -> &'static str {
    match code {
        "invalid_credentials" => "Email o contraseña incorrectos.",
        "invalid_email" => "El email no es válido.",
        "missing_fields" => "Completá todos los campos obligatorios.",
        "invalid_phone" => "El teléfono no es válido.",
        "email_taken" => "Ya existe una cuenta con ese email.",
        "weak_password" => "La contraseña debe tener al menos 8 caracteres.",
        "password_mismatch" => "Las contraseñas no coinciden.",
        "captcha" => "No pudimos verificar que no seas un robot. Probá de nuevo.",
        "empty_cart" => "Tu carrito está vacío.",
        "stock" => "Alguno de los productos no tiene stock suficiente.",
        "unavailable" => "Ese producto no está disponible.",
        "address_required" => "Elegí una dirección para el envío.",
        "address_not_found" => "No encontramos esa dirección.",
        "payment_unavailable" => {
            "No pudimos iniciar el pago. Tu carrito quedó como estaba, probá de nuevo."
        }
        "not_cancellable" => "Este pedido ya no se puede cancelar.",
        "invalid_form" => "Revisá los datos del formulario.",
        _ => "Algo salió mal. Probá de nuevo.",
    }
}

fn success_text(code: &str) -> &'static str {
    match code {
        "added" => "Producto agregado al carrito.",
        "updated" => "Carrito actualizado.",
        "removed" => "Producto quitado del carrito.",
        "profile" => "Datos actualizados.",
        "password" => "Contraseña actualizada.",
        "address_saved" => "Dirección guardada.",
        "address_deleted" => "Dirección eliminada.",
        "default_address" => "Dirección predeterminada actualizada.",
        "cancelled" => "Pedido cancelado.",
        "registered" => "¡Tu cuenta está lista!",
        "logged_out" => "Cerraste sesión.",
        _ => "Listo.",
    }
}

/// `15/03/2026`
#[must_use]
pub fn short_date(at: &DateTime<Utc>) -> String {
    at.format("%d/%m/%Y").to_string()
}

/// Shorten text to about `max` characters at a word boundary.
#[must_use]
pub fn excerpt(text: &str, max: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let cut: String = text.chars().take(max).collect();
    let cut = cut
        .rfind(' ')
        .and_then(|i| cut.get(..i))
        .unwrap_or(cut.as_str());
    format!("{}…", cut.trim_end_matches(['.', ',', ';', ':']))
}

#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: i32,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub summary: String,
    pub category: String,
    pub price: String,
    pub stock: i32,
    pub available: bool,
    pub sold: bool,
    pub image_url: Option<String>,
}

impl From<&Product> for ProductView {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id.as_i32(),
            slug: p.slug.clone(),
            name: p.name.clone(),
            description: p.description.clone(),
            summary: excerpt(&p.description, 110),
            category: p.category.clone(),
            price: p.price.display(),
            stock: p.stock,
            available: p.is_available(),
            sold: !p.is_available(),
            image_url: p.image_url.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SlideView {
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
}

impl From<&Slide> for SlideView {
    fn from(s: &Slide) -> Self {
        Self {
            title: s.title.clone(),
            subtitle: s.subtitle.clone(),
            image_url: s.image_url.clone(),
            link_url: s.link_url.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceView {
    pub name: String,
    pub description: String,
    pub price_from: Option<String>,
    pub image_url: Option<String>,
}

impl From<&Service> for ServiceView {
    fn from(s: &Service) -> Self {
        Self {
            name: s.name.clone(),
            description: s.description.clone(),
            price_from: s.price_from.map(|p| p.display()),
            image_url: s.image_url.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CartItemView {
    pub product_id: i32,
    pub slug: String,
    pub name: String,
    pub image_url: Option<String>,
    pub unit_price: String,
    pub quantity: u32,
    pub max_quantity: i32,
    pub total: String,
    /// Why the line blocks checkout, if it does.
    pub problem: Option<String>,
}

impl From<&CartItem> for CartItemView {
    fn from(item: &CartItem) -> Self {
        let problem = item.problem().map(|p| {
            use vivero_core::CheckoutRuleError as E;
            match p {
                E::InsufficientStock { available: 0 } | E::Unavailable(_) => {
                    "Ya no está disponible".to_owned()
                }
                E::InsufficientStock { available } => {
                    format!("Sólo quedan {available} unidades")
                }
                other => other.to_string(),
            }
        });
        Self {
            product_id: item.product_id.as_i32(),
            slug: item.slug.clone(),
            name: item.name.clone(),
            image_url: item.image_url.clone(),
            unit_price: item.unit_price.display(),
            quantity: item.quantity,
            max_quantity: item.stock.clamp(1, 99),
            total: item.total().display(),
            problem,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AddressView {
    pub id: i32,
    pub label: String,
    pub street: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub notes: String,
    pub one_line: String,
    pub is_default: bool,
}

impl From<&Address> for AddressView {
    fn from(a: &Address) -> Self {
        Self {
            id: a.id.as_i32(),
            label: a.label.clone(),
            street: a.street.clone(),
            city: a.city.clone(),
            province: a.province.clone(),
            postal_code: a.postal_code.clone(),
            notes: a.notes.clone().unwrap_or_default(),
            one_line: a.one_line(),
            is_default: a.is_default,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: i32,
    pub number: String,
    pub status: String,
    pub status_label: &'static str,
    pub payment_label: &'static str,
    pub payment_method: &'static str,
    pub delivery_label: &'static str,
    pub shipping_address: Option<String>,
    pub contact_phone: Option<String>,
    pub notes: Option<String>,
    pub payment_status: Option<String>,
    pub payment_id: Option<String>,
    pub subtotal: String,
    pub shipping_cost: String,
    pub has_shipping_cost: bool,
    pub total: String,
    pub placed_on: String,
    pub can_cancel: bool,
    pub awaiting_payment: bool,
}

impl From<&Order> for OrderView {
    fn from(o: &Order) -> Self {
        Self {
            id: o.id.as_i32(),
            number: o.number(),
            status: o.status.to_string(),
            status_label: o.status.label(),
            payment_label: o.payment_method.label(),
            payment_method: o.payment_method.as_str(),
            delivery_label: o.delivery_method.label(),
            shipping_address: o.shipping_address.clone(),
            contact_phone: o.contact_phone.clone(),
            notes: o.notes.clone(),
            payment_status: o.payment_status.clone(),
            payment_id: o.payment_id.clone(),
            subtotal: o.subtotal.display(),
            shipping_cost: o.shipping_cost.display(),
            has_shipping_cost: !o.shipping_cost.amount.is_zero(),
            total: o.total.display(),
            placed_on: short_date(&o.created_at),
            can_cancel: o.can_customer_cancel(),
            awaiting_payment: o.awaiting_gateway_payment(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderItemView {
    pub product_name: String,
    pub unit_price: String,
    pub quantity: u32,
    pub line_total: String,
}

impl From<&OrderItem> for OrderItemView {
    fn from(i: &OrderItem) -> Self {
        Self {
            product_name: i.product_name.clone(),
            unit_price: i.unit_price.display(),
            quantity: i.quantity,
            line_total: i.line_total.display(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("Helecho", 20), "Helecho");
        assert_eq!(
            excerpt("Planta de interior, ideal para luz indirecta", 20),
            "Planta de interior…"
        );
    }

    #[test]
    fn test_flash_texts() {
        let query = MessageQuery {
            error: Some("email_taken".to_owned()),
            success: None,
        };
        let flash = query.flash();
        assert_eq!(flash.error, Some("Ya existe una cuenta con ese email."));
        assert_eq!(flash.success, None);

        let unknown = MessageQuery {
            error: Some("<script>".to_owned()),
            success: Some("added".to_owned()),
        }
        .flash();
        assert_eq!(unknown.error, Some("Algo salió mal. Probá de nuevo."));
        assert_eq!(unknown.success, Some("Producto agregado al carrito."));
    }
}
