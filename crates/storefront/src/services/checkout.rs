//! Turning a cart into an order.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use vivero_core::{
    AddressId, CartLine, CheckoutRuleError, DeliveryMethod, PaymentMethod, Price, order_subtotal,
    validate_line,
};

use super::email::EmailService;
use super::payments::{MercadoPagoClient, PaymentError, PreferenceItem, PreferencePayer};
use crate::config::BankTransferConfig;
use crate::db::{AddressRepository, CartRepository, OrderRepository, RepositoryError};
use crate::models::{CartItem, CurrentUser, NewOrder, Order, OrderItem, non_blank};

/// What the customer submits on the checkout page.
#[derive(Debug, Clone)]
pub struct CheckoutForm {
    pub payment_method: PaymentMethod,
    pub delivery_method: DeliveryMethod,
    pub address_id: Option<AddressId>,
    pub contact_phone: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("{name}: {source}")]
    Rule {
        name: String,
        source: CheckoutRuleError,
    },

    #[error("shipping requires an address")]
    AddressRequired,

    #[error("address not found")]
    AddressNotFound,

    #[error("{0}")]
    OutOfStock(String),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("payment gateway error: {0}")]
    Payment(#[from] PaymentError),
}

impl CheckoutError {
    /// Short code for `?error=` redirects.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EmptyCart => "empty_cart",
            Self::Rule { .. } | Self::OutOfStock(_) => "stock",
            Self::AddressRequired => "address_required",
            Self::AddressNotFound => "address_not_found",
            Self::Repository(_) => "server_error",
            Self::Payment(_) => "payment_unavailable",
        }
    }

    /// Caused by the cart or form rather than by the server.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        !matches!(self, Self::Repository(_) | Self::Payment(_))
    }
}

/// A successfully placed order.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
    /// Gateway checkout page, for gateway payments.
    pub redirect_url: Option<String>,
}

pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    payments: &'a MercadoPagoClient,
    email: &'a EmailService,
    bank: &'a BankTransferConfig,
    shipping_cost: Price,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        payments: &'a MercadoPagoClient,
        email: &'a EmailService,
        bank: &'a BankTransferConfig,
        shipping_cost: Price,
    ) -> Self {
        Self {
            pool,
            payments,
            email,
            bank,
            shipping_cost,
        }
    }

    /// Validate the cart and form, reserve stock and write the order.
    ///
    /// Gateway payments also get a checkout preference. If the gateway call
    /// fails the order is cancelled again, which puts the stock back, and the
    /// items return to the cart.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError` describing the first problem found.
    #[instrument(skip(self, user, form), fields(user_id = %user.id, payment = %form.payment_method))]
    pub async fn place_order(
        &self,
        user: &CurrentUser,
        form: CheckoutForm,
    ) -> Result<PlacedOrder, CheckoutError> {
        let items = CartRepository::new(self.pool)
            .items_for_user(user.id)
            .await?;
        let lines = check_items(&items)?;

        let shipping_address = if form.delivery_method.requires_address() {
            let id = form.address_id.ok_or(CheckoutError::AddressRequired)?;
            let address = AddressRepository::new(self.pool)
                .get(user.id, id)
                .await?
                .ok_or(CheckoutError::AddressNotFound)?;
            Some(address.one_line())
        } else {
            None
        };

        let shipping_cost = if form.delivery_method.requires_address() {
            self.shipping_cost.amount
        } else {
            Decimal::ZERO
        };
        let subtotal = order_subtotal(&lines).map_err(|source| CheckoutError::Rule {
            name: "Carrito".to_owned(),
            source,
        })?;

        let new_order = NewOrder {
            user_id: user.id,
            payment_method: form.payment_method,
            delivery_method: form.delivery_method,
            shipping_address,
            contact_phone: non_blank(form.contact_phone),
            notes: non_blank(form.notes),
            subtotal: subtotal.amount,
            shipping_cost,
            total: subtotal.amount + shipping_cost,
        };

        let orders = OrderRepository::new(self.pool);
        let order = match orders.create_from_lines(&new_order, &items).await {
            Ok(order) => order,
            Err(RepositoryError::Conflict(msg)) => return Err(CheckoutError::OutOfStock(msg)),
            Err(e) => return Err(e.into()),
        };
        let order_items = orders.items(order.id).await?;

        info!(order_id = %order.id, total = %order.total, "Order placed");

        let redirect_url = if form.payment_method.uses_gateway() {
            match self.start_gateway_payment(user, &order, &order_items).await {
                Ok(url) => Some(url),
                Err(e) => {
                    self.roll_back(user, &order, &items).await;
                    return Err(e);
                }
            }
        } else {
            None
        };

        self.notify(user, &order, &order_items);

        Ok(PlacedOrder {
            order,
            items: order_items,
            redirect_url,
        })
    }

    async fn start_gateway_payment(
        &self,
        user: &CurrentUser,
        order: &Order,
        items: &[OrderItem],
    ) -> Result<String, CheckoutError> {
        let mut pref_items: Vec<PreferenceItem> = items
            .iter()
            .map(|item| PreferenceItem {
                id: item
                    .product_id
                    .map_or_else(|| item.id.to_string(), |id| id.to_string()),
                title: item.product_name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price.amount,
                currency_id: item.unit_price.currency_code.code(),
            })
            .collect();

        if !order.shipping_cost.amount.is_zero() {
            pref_items.push(PreferenceItem {
                id: "shipping".to_owned(),
                title: "Envío".to_owned(),
                quantity: 1,
                unit_price: order.shipping_cost.amount,
                currency_id: order.shipping_cost.currency_code.code(),
            });
        }

        let payer = PreferencePayer {
            name: user.name.clone(),
            email: user.email.to_string(),
        };

        let preference = self
            .payments
            .create_preference(order.id, &pref_items, &payer)
            .await?;

        OrderRepository::new(self.pool)
            .set_payment_reference(order.id, &preference.id)
            .await?;

        Ok(preference.init_point)
    }

    /// Undo an order whose gateway payment could not be started.
    async fn roll_back(&self, user: &CurrentUser, order: &Order, items: &[CartItem]) {
        if let Err(e) = OrderRepository::new(self.pool).cancel(order.id).await {
            warn!(order_id = %order.id, error = %e, "failed to cancel order after gateway error");
            return;
        }

        let carts = CartRepository::new(self.pool);
        for item in items {
            if let Err(e) = carts.add(user.id, item.product_id, item.quantity).await {
                warn!(product_id = %item.product_id, error = %e, "failed to restore cart item");
            }
        }
    }

    /// Send the customer and store emails in the background.
    fn notify(&self, user: &CurrentUser, order: &Order, items: &[OrderItem]) {
        let email = self.email.clone();
        let bank = self.bank.clone();
        let to = user.email.to_string();
        let name = user.name.clone();
        let order = order.clone();
        let items = items.to_vec();

        tokio::spawn(async move {
            if let Err(e) = email
                .send_order_placed(&to, &name, &order, &items, &bank)
                .await
            {
                warn!(order_id = %order.id, error = %e, "failed to send order confirmation");
            }
            if let Err(e) = email
                .send_store_new_order(&name, &to, &order, &items)
                .await
            {
                warn!(order_id = %order.id, error = %e, "failed to send store notification");
            }
        });
    }
}

/// Check every line can be bought and return them for pricing.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart` or the first line that breaks a rule.
pub fn check_items(items: &[CartItem]) -> Result<Vec<CartLine>, CheckoutError> {
    if items.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    items
        .iter()
        .map(|item| {
            let line = item.line();
            validate_line(&line).map_err(|source| CheckoutError::Rule {
                name: item.name.clone(),
                source,
            })?;
            Ok(line)
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use vivero_core::{CartItemId, ProductId, ProductState};

    use super::*;

    fn item(id: i32, quantity: u32, stock: i32, state: ProductState) -> CartItem {
        CartItem {
            id: CartItemId::new(id),
            product_id: ProductId::new(id),
            slug: format!("planta-{id}"),
            name: format!("Planta {id}"),
            image_url: None,
            unit_price: Price::ars(Decimal::new(1500, 0)),
            quantity,
            stock,
            state,
        }
    }

    #[test]
    fn test_storing_payment_reference_failure_is_a_server_error() {
        let err = CheckoutError::from(RepositoryError::NotFound);
        assert!(matches!(err, CheckoutError::Repository(_)));
        assert_eq!(err.code(), "server_error");
        assert!(!err.is_user_error());

        let err = CheckoutError::from(PaymentError::Parse("bad json".into()));
        assert_eq!(err.code(), "payment_unavailable");
    }

    #[test]
    fn test_check_items_empty_cart() {
        assert!(matches!(check_items(&[]), Err(CheckoutError::EmptyCart)));
    }

    #[test]
    fn test_check_items_names_failing_line() {
        let items = vec![
            item(1, 1, 5, ProductState::Active),
            item(2, 4, 3, ProductState::Active),
        ];
        match check_items(&items) {
            Err(CheckoutError::Rule { name, source }) => {
                assert_eq!(name, "Planta 2");
                assert_eq!(source, CheckoutRuleError::InsufficientStock { available: 3 });
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_check_items_rejects_sold_products() {
        let items = vec![item(3, 1, 0, ProductState::Sold)];
        let err = check_items(&items).unwrap_err();
        assert_eq!(err.code(), "stock");
        assert!(err.is_user_error());
    }

    #[test]
    fn test_check_items_returns_lines() {
        let items = vec![
            item(1, 2, 5, ProductState::Active),
            item(2, 1, 1, ProductState::Active),
        ];
        let lines = check_items(&items).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            order_subtotal(&lines).unwrap().amount,
            Decimal::new(4500, 0)
        );
    }
}
