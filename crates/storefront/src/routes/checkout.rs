//! Checkout: the order form, placing the order and the gateway return page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::{error, instrument};

use vivero_core::{AddressId, DeliveryMethod, OrderId, PaymentMethod};

use crate::config::BankTransferConfig;
use crate::db::{AddressRepository, CartRepository, OrderRepository, UserRepository};
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{CartSummary, CurrentUser, non_blank};
use crate::services::{CheckoutError, CheckoutForm, CheckoutService, ErrorLogEntry};
use crate::state::AppState;

use super::views::{AddressView, CartItemView, Flash, MessageQuery, OrderItemView, OrderView};

#[derive(Debug, Deserialize)]
pub struct CheckoutFormData {
    /// Missing or unknown values send the customer back to the form.
    pub payment_method: Option<String>,
    pub delivery_method: Option<String>,
    /// Empty when picking up at the nursery.
    pub address_id: Option<String>,
    pub contact_phone: Option<String>,
    pub notes: Option<String>,
}

impl CheckoutFormData {
    fn into_form(self) -> Option<CheckoutForm> {
        let payment_method = self.payment_method.as_deref()?.parse().ok()?;
        let delivery_method = self.delivery_method.as_deref()?.parse().ok()?;
        Some(CheckoutForm {
            payment_method,
            delivery_method,
            address_id: self
                .address_id
                .as_deref()
                .and_then(|s| s.trim().parse::<i32>().ok())
                .map(AddressId::new),
            contact_phone: self.contact_phone,
            notes: self.notes,
        })
    }
}

/// Bank account shown for transfer payments.
#[derive(Debug, Clone)]
pub struct BankView {
    pub alias: Option<String>,
    pub cbu: Option<String>,
    pub holder: Option<String>,
}

impl BankView {
    fn for_config(bank: &BankTransferConfig) -> Option<Self> {
        bank.is_configured().then(|| Self {
            alias: bank.alias.clone(),
            cbu: bank.cbu.clone(),
            holder: bank.holder.clone(),
        })
    }
}

/// A choice on the checkout form.
#[derive(Debug, Clone)]
pub struct OptionView {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub current_user: Option<CurrentUser>,
    pub flash: Flash,
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub shipping_cost: String,
    pub addresses: Vec<AddressView>,
    pub payment_methods: Vec<OptionView>,
    pub delivery_methods: Vec<OptionView>,
    pub bank: Option<BankView>,
    pub phone: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "checkout/confirmation.html")]
pub struct ConfirmationTemplate {
    pub current_user: Option<CurrentUser>,
    pub order: OrderView,
    pub items: Vec<OrderItemView>,
    pub bank: Option<BankView>,
}

#[derive(Template, WebTemplate)]
#[template(path = "checkout/return.html")]
pub struct PaymentReturnTemplate {
    pub current_user: Option<CurrentUser>,
    pub order: OrderView,
    /// "approved", "pending" or "failure".
    pub outcome: &'static str,
}

/// Checkout form. An empty or blocked cart goes back to the cart page.
#[instrument(skip(state, user, messages), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(messages): Query<MessageQuery>,
) -> Result<Response, AppError> {
    let items = CartRepository::new(state.pool())
        .items_for_user(user.id)
        .await?;
    let summary = CartSummary::new(items);

    if summary.is_empty() {
        return Ok(Redirect::to("/cart?error=empty_cart").into_response());
    }
    if !summary.is_checkout_ready() {
        return Ok(Redirect::to("/cart?error=stock").into_response());
    }

    let addresses = AddressRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    let phone = UserRepository::new(state.pool())
        .get_by_id(user.id)
        .await?
        .and_then(|u| u.phone)
        .unwrap_or_default();

    Ok(CheckoutTemplate {
        current_user: Some(user),
        flash: messages.flash(),
        items: summary.items.iter().map(CartItemView::from).collect(),
        subtotal: summary.subtotal.display(),
        shipping_cost: state.shipping_cost().display(),
        addresses: addresses.iter().map(AddressView::from).collect(),
        payment_methods: PaymentMethod::ALL
            .iter()
            .map(|m| OptionView {
                value: m.as_str(),
                label: m.label(),
            })
            .collect(),
        delivery_methods: DeliveryMethod::ALL
            .iter()
            .map(|m| OptionView {
                value: m.as_str(),
                label: m.label(),
            })
            .collect(),
        bank: BankView::for_config(&state.config().bank_transfer),
        phone,
    }
    .into_response())
}

/// Place the order.
///
/// Gateway payments redirect to the gateway; other methods show the
/// confirmation page right away.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn place_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<CheckoutFormData>,
) -> Result<Response, AppError> {
    let service = CheckoutService::new(
        state.pool(),
        state.payments(),
        state.email(),
        &state.config().bank_transfer,
        state.shipping_cost(),
    );

    let Some(form) = form.into_form() else {
        return Ok(Redirect::to("/checkout?error=missing_fields").into_response());
    };

    let placed = match service.place_order(&user, form).await {
        Ok(placed) => placed,
        Err(CheckoutError::EmptyCart) => {
            return Ok(Redirect::to("/cart?error=empty_cart").into_response());
        }
        Err(e) if e.is_user_error() => {
            return Ok(Redirect::to(&format!("/checkout?error={}", e.code())).into_response());
        }
        Err(CheckoutError::Payment(e)) => {
            error!(error = %e, "Payment preference failed, order rolled back");
            let mut response = Redirect::to("/checkout?error=payment_unavailable").into_response();
            response.extensions_mut().insert(ErrorLogEntry::new(
                "Payment gateway unavailable at checkout",
                e.to_string(),
            ));
            return Ok(response);
        }
        Err(e) => return Err(e.into()),
    };

    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_id", placed.order.id.to_string().as_str())]),
    );

    if let Some(url) = placed.redirect_url {
        return Ok(Redirect::to(&url).into_response());
    }

    let bank = (placed.order.payment_method == PaymentMethod::BankTransfer)
        .then(|| BankView::for_config(&state.config().bank_transfer))
        .flatten();

    Ok(ConfirmationTemplate {
        current_user: Some(user),
        order: OrderView::from(&placed.order),
        items: placed.items.iter().map(OrderItemView::from).collect(),
        bank,
    }
    .into_response())
}

#[derive(Debug, Deserialize)]
pub struct PaymentReturnQuery {
    pub status: Option<String>,
    pub collection_status: Option<String>,
    pub external_reference: Option<String>,
}

impl PaymentReturnQuery {
    fn order_id(&self) -> Option<OrderId> {
        self.external_reference
            .as_deref()
            .and_then(|s| s.trim().parse::<i32>().ok())
            .map(OrderId::new)
    }

    /// Outcome the gateway reports in the back URL.
    ///
    /// Only informational; the order itself changes through the webhook.
    fn outcome(&self) -> &'static str {
        let status = non_blank(self.collection_status.clone())
            .or_else(|| non_blank(self.status.clone()))
            .unwrap_or_default();
        match status.as_str() {
            "approved" => "approved",
            "pending" | "in_process" | "authorized" => "pending",
            _ => "failure",
        }
    }
}

/// Where the gateway sends the customer back to after paying.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn payment_return(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<PaymentReturnQuery>,
) -> Result<Response, AppError> {
    let Some(order_id) = query.order_id() else {
        return Ok(Redirect::to("/account/orders").into_response());
    };

    let Some(order) = OrderRepository::new(state.pool())
        .get(order_id)
        .await?
        .filter(|o| o.user_id == user.id)
    else {
        return Ok(Redirect::to("/account/orders").into_response());
    };

    Ok(PaymentReturnTemplate {
        current_user: Some(user),
        order: OrderView::from(&order),
        outcome: query.outcome(),
    }
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(status: Option<&str>, reference: Option<&str>) -> PaymentReturnQuery {
        PaymentReturnQuery {
            status: status.map(str::to_owned),
            collection_status: None,
            external_reference: reference.map(str::to_owned),
        }
    }

    #[test]
    fn test_return_outcome() {
        assert_eq!(query(Some("approved"), None).outcome(), "approved");
        assert_eq!(query(Some("in_process"), None).outcome(), "pending");
        assert_eq!(query(Some("rejected"), None).outcome(), "failure");
        assert_eq!(query(None, None).outcome(), "failure");
    }

    #[test]
    fn test_return_order_reference() {
        assert_eq!(query(None, Some("17")).order_id(), Some(OrderId::new(17)));
        assert_eq!(query(None, Some("null")).order_id(), None);
    }

    fn form_data(payment: Option<&str>, delivery: Option<&str>, address: &str) -> CheckoutFormData {
        CheckoutFormData {
            payment_method: payment.map(str::to_owned),
            delivery_method: delivery.map(str::to_owned),
            address_id: Some(address.to_owned()),
            contact_phone: None,
            notes: None,
        }
    }

    #[test]
    fn test_form_parses_address() {
        let shipping = form_data(Some("cash"), Some("shipping"), "12").into_form();
        let shipping = shipping.expect("complete form");
        assert_eq!(shipping.payment_method, PaymentMethod::Cash);
        assert_eq!(shipping.delivery_method, DeliveryMethod::Shipping);
        assert_eq!(shipping.address_id, Some(AddressId::new(12)));

        let pickup = form_data(Some("bank_transfer"), Some("pickup"), "").into_form();
        assert_eq!(pickup.expect("complete form").address_id, None);
    }

    #[test]
    fn test_form_without_methods_is_rejected() {
        assert!(form_data(None, Some("pickup"), "").into_form().is_none());
        assert!(form_data(Some("cash"), None, "").into_form().is_none());
        assert!(form_data(Some("bitcoin"), Some("pickup"), "").into_form().is_none());
    }
}
