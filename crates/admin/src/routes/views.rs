//! Display types shared by admin pages.

use serde::Deserialize;

use vivero_core::{OrderStatus, ProductState, UserRole};
use vivero_storefront::models::{CurrentUser, Page};

/// The logged-in admin, for the layout header.
#[derive(Debug, Clone)]
pub struct AdminUserView {
    pub id: i32,
    pub name: String,
    pub email: String,
}

impl From<&CurrentUser> for AdminUserView {
    fn from(admin: &CurrentUser) -> Self {
        Self {
            id: admin.id.as_i32(),
            name: admin.name.clone(),
            email: admin.email.to_string(),
        }
    }
}

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

#[derive(Debug, Clone, Default)]
pub struct Flash {
    pub error: Option<&'static str>,
    pub success: Option<&'static str>,
}

fn error_text(code: &str) -> &'static str {
    match code {
        "invalid_credentials" => "Email o contraseña incorrectos.",
        "not_admin" => "Esa cuenta no tiene acceso al panel.",
        "missing_fields" => "Completá todos los campos obligatorios.",
        "invalid_number" => "Revisá los precios y cantidades.",
        "slug_taken" => "Ya existe un producto con ese slug.",
        "image_type" => "La imagen debe ser JPG, PNG o WebP.",
        "image_size" => "La imagen no puede superar los 5 MB.",
        "image_empty" => "El archivo de imagen está vacío.",
        "image_required" => "Subí una imagen.",
        "upload_failed" => "No se pudo subir la imagen. Probá de nuevo.",
        "invalid_transition" => "Ese cambio de estado no está permitido.",
        "not_cancellable" => "El pedido ya no se puede cancelar.",
        "self_demote" => "No podés quitarte el rol de administrador.",
        "self_delete" => "No podés eliminar tu propia cuenta.",
        "has_orders" => "El usuario tiene pedidos y no se puede eliminar.",
        "in_use" => "No se puede eliminar porque está en uso.",
        _ => "Algo salió mal. Probá de nuevo.",
    }
}

fn success_text(code: &str) -> &'static str {
    match code {
        "created" => "Creado.",
        "saved" => "Cambios guardados.",
        "deleted" => "Eliminado.",
        "status" => "Estado del pedido actualizado.",
        "cancelled" => "Pedido cancelado y stock repuesto.",
        "role" => "Rol actualizado.",
        "resolved" => "Error marcado como resuelto.",
        "purged" => "Errores resueltos eliminados.",
        "toggled" => "Visibilidad actualizada.",
        _ => "Listo.",
    }
}

/// An option in a filter or form select.
#[derive(Debug, Clone)]
pub struct SelectOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

impl SelectOption {
    #[must_use]
    pub fn product_states(current: Option<ProductState>) -> Vec<Self> {
        ProductState::ALL
            .iter()
            .map(|s| Self {
                value: s.as_str(),
                label: s.label(),
                selected: current == Some(*s),
            })
            .collect()
    }

    /// States an editor can pick. Sold is derived from stock on save, so a
    /// sold product shows as active in the editor.
    #[must_use]
    pub fn editable_product_states(current: ProductState) -> Vec<Self> {
        let current = match current {
            ProductState::Sold => ProductState::Active,
            other => other,
        };
        [ProductState::Active, ProductState::Inactive]
            .iter()
            .map(|s| Self {
                value: s.as_str(),
                label: s.label(),
                selected: current == *s,
            })
            .collect()
    }

    #[must_use]
    pub fn order_statuses(current: Option<OrderStatus>) -> Vec<Self> {
        OrderStatus::ALL
            .iter()
            .map(|s| Self {
                value: s.as_str(),
                label: s.label(),
                selected: current == Some(*s),
            })
            .collect()
    }

    #[must_use]
    pub fn user_roles(current: Option<UserRole>) -> Vec<Self> {
        UserRole::ALL
            .iter()
            .map(|r| Self {
                value: r.as_str(),
                label: r.label(),
                selected: current == Some(*r),
            })
            .collect()
    }
}

/// Previous/next links for a paged list.
#[derive(Debug, Clone, Default)]
pub struct Pager {
    pub page: u32,
    pub total_pages: u32,
    pub total: i64,
    pub prev_link: Option<String>,
    pub next_link: Option<String>,
}

impl Pager {
    /// `base_query` holds the list's other filters, already URL-encoded,
    /// without a leading `?`.
    #[must_use]
    pub fn new<T>(page: &Page<T>, path: &str, base_query: &str) -> Self {
        let link = |n: u32| {
            if base_query.is_empty() {
                format!("{path}?page={n}")
            } else {
                format!("{path}?{base_query}&page={n}")
            }
        };
        Self {
            page: page.page,
            total_pages: page.total_pages(),
            total: page.total,
            prev_link: page.has_prev().then(|| link(page.prev_page())),
            next_link: page.has_next().then(|| link(page.next_page())),
        }
    }
}

/// Build `k=v&k=v` from the non-empty pairs.
#[must_use]
pub fn query_string(pairs: &[(&str, Option<&str>)]) -> String {
    pairs
        .iter()
        .filter_map(|(k, v)| {
            v.filter(|v| !v.is_empty())
                .map(|v| format!("{k}={}", urlencoding::encode(v)))
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// CSS class for an order status badge.
#[must_use]
pub const fn order_status_class(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending | OrderStatus::PendingPayment | OrderStatus::PendingConfirmation => {
            "badge-warning"
        }
        OrderStatus::Confirmed | OrderStatus::Shipped => "badge-info",
        OrderStatus::Delivered => "badge-success",
        OrderStatus::Cancelled => "badge-muted",
    }
}

/// CSS class for a product state badge.
#[must_use]
pub const fn product_state_class(state: ProductState) -> &'static str {
    match state {
        ProductState::Active => "badge-success",
        ProductState::Inactive => "badge-muted",
        ProductState::Sold => "badge-warning",
    }
}

/// Parse an optional enum filter, treating blank and unknown values as "all".
pub fn parse_filter<T: std::str::FromStr>(value: Option<&str>) -> Option<T> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse().ok())
}

/// `15/03/2026 14:05`
#[must_use]
pub fn date_time(at: &chrono::DateTime<chrono::Utc>) -> String {
    at.format("%d/%m/%Y %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_string_skips_blank_values() {
        assert_eq!(
            query_string(&[("status", Some("shipped")), ("q", Some("")), ("x", None)]),
            "status=shipped"
        );
        assert_eq!(
            query_string(&[("q", Some("ana pérez"))]),
            "q=ana%20p%C3%A9rez"
        );
    }

    #[test]
    fn test_pager_links_keep_filters() {
        let page: Page<()> = Page {
            items: vec![],
            page: 2,
            per_page: 10,
            total: 35,
        };
        let pager = Pager::new(&page, "/orders", "status=shipped");
        assert_eq!(pager.prev_link.as_deref(), Some("/orders?status=shipped&page=1"));
        assert_eq!(pager.next_link.as_deref(), Some("/orders?status=shipped&page=3"));
        assert_eq!(pager.total_pages, 4);

        let pager = Pager::new(&page, "/users", "");
        assert_eq!(pager.next_link.as_deref(), Some("/users?page=3"));
    }

    #[test]
    fn test_editor_never_offers_sold() {
        let options = SelectOption::editable_product_states(ProductState::Sold);
        let values: Vec<_> = options.iter().map(|o| o.value).collect();
        assert_eq!(values, ["active", "inactive"]);
        assert!(options.iter().any(|o| o.value == "active" && o.selected));

        let options = SelectOption::editable_product_states(ProductState::Inactive);
        assert!(options.iter().any(|o| o.value == "inactive" && o.selected));
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!(
            parse_filter::<OrderStatus>(Some("shipped")),
            Some(OrderStatus::Shipped)
        );
        assert_eq!(parse_filter::<OrderStatus>(Some("")), None);
        assert_eq!(parse_filter::<OrderStatus>(Some("bogus")), None);
        assert_eq!(parse_filter::<OrderStatus>(None), None);
    }

    #[test]
    fn test_flash_texts() {
        let query = MessageQuery {
            error: Some("image_size".to_owned()),
            success: None,
        };
        let flash = query.flash();
        assert_eq!(flash.error, Some("La imagen no puede superar los 5 MB."));
        assert!(flash.success.is_none());
    }
}
