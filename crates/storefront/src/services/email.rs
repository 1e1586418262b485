//! Transactional email.
//!
//! Uses SMTP via lettre with askama HTML and plain-text templates. Callers
//! send from spawned tasks and only log failures; an email problem never
//! fails the request that triggered it.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use vivero_core::PaymentMethod;

use crate::config::{BankTransferConfig, EmailConfig};
use crate::models::{Order, OrderItem};

#[derive(Template)]
#[template(path = "email/welcome.html")]
struct WelcomeHtml<'a> {
    name: &'a str,
    shop_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/welcome.txt")]
struct WelcomeText<'a> {
    name: &'a str,
    shop_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_placed.html")]
struct OrderPlacedHtml<'a> {
    name: &'a str,
    order: &'a Order,
    items: &'a [OrderItem],
    bank: Option<&'a BankTransferConfig>,
    order_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_placed.txt")]
struct OrderPlacedText<'a> {
    name: &'a str,
    order: &'a Order,
    items: &'a [OrderItem],
    bank: Option<&'a BankTransferConfig>,
    order_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_status.html")]
struct OrderStatusHtml<'a> {
    name: &'a str,
    order: &'a Order,
    order_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_status.txt")]
struct OrderStatusText<'a> {
    name: &'a str,
    order: &'a Order,
    order_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/store_new_order.html")]
struct StoreNewOrderHtml<'a> {
    customer_name: &'a str,
    customer_email: &'a str,
    order: &'a Order,
    items: &'a [OrderItem],
}

#[derive(Template)]
#[template(path = "email/store_new_order.txt")]
struct StoreNewOrderText<'a> {
    customer_name: &'a str,
    customer_email: &'a str,
    order: &'a Order,
    items: &'a [OrderItem],
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    /// Storefront URL for links in messages.
    base_url: String,
    /// Receives new-order notifications.
    store_address: String,
}

impl EmailService {
    /// Create a new email service. No connection is made until the first send.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay settings are invalid.
    pub fn new(
        config: &EmailConfig,
        base_url: &str,
        store_address: &str,
    ) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            store_address: store_address.to_owned(),
        })
    }

    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_welcome(&self, to: &str, name: &str) -> Result<(), EmailError> {
        let shop_url = format!("{}/products", self.base_url);
        let html = WelcomeHtml {
            name,
            shop_url: &shop_url,
        }
        .render()?;
        let text = WelcomeText {
            name,
            shop_url: &shop_url,
        }
        .render()?;

        self.send_multipart(to, "¡Bienvenido/a a Vivero!", &text, &html)
            .await
    }

    /// Order confirmation for the customer. Bank-transfer orders include the
    /// account details to pay into.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_order_placed(
        &self,
        to: &str,
        name: &str,
        order: &Order,
        items: &[OrderItem],
        bank: &BankTransferConfig,
    ) -> Result<(), EmailError> {
        let order_url = self.order_url(order);
        let bank = (order.payment_method == PaymentMethod::BankTransfer).then_some(bank);

        let html = OrderPlacedHtml {
            name,
            order,
            items,
            bank,
            order_url: &order_url,
        }
        .render()?;
        let text = OrderPlacedText {
            name,
            order,
            items,
            bank,
            order_url: &order_url,
        }
        .render()?;

        let subject = format!("Recibimos tu pedido {}", order.number());
        self.send_multipart(to, &subject, &text, &html).await
    }

    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_order_status_changed(
        &self,
        to: &str,
        name: &str,
        order: &Order,
    ) -> Result<(), EmailError> {
        let order_url = self.order_url(order);
        let html = OrderStatusHtml {
            name,
            order,
            order_url: &order_url,
        }
        .render()?;
        let text = OrderStatusText {
            name,
            order,
            order_url: &order_url,
        }
        .render()?;

        let subject = format!(
            "Tu pedido {} está {}",
            order.number(),
            order.status.label().to_lowercase()
        );
        self.send_multipart(to, &subject, &text, &html).await
    }

    /// Notify the store's inbox about a new order.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_store_new_order(
        &self,
        customer_name: &str,
        customer_email: &str,
        order: &Order,
        items: &[OrderItem],
    ) -> Result<(), EmailError> {
        let html = StoreNewOrderHtml {
            customer_name,
            customer_email,
            order,
            items,
        }
        .render()?;
        let text = StoreNewOrderText {
            customer_name,
            customer_email,
            order,
            items,
        }
        .render()?;

        let subject = format!(
            "Nuevo pedido {} ({})",
            order.number(),
            order.total.display()
        );
        self.send_multipart(&self.store_address, &subject, &text, &html)
            .await
    }

    fn order_url(&self, order: &Order) -> String {
        format!("{}/account/orders/{}", self.base_url, order.id)
    }

    async fn send_multipart(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;
        tracing::info!(subject, "email sent");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use vivero_core::{
        DeliveryMethod, OrderId, OrderItemId, OrderStatus, Price, ProductId, UserId,
    };

    use super::*;

    fn order(method: PaymentMethod) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(42),
            user_id: UserId::new(1),
            status: method.initial_order_status(),
            payment_method: method,
            delivery_method: DeliveryMethod::Shipping,
            shipping_address: Some("Av. Siempreviva 742, Springfield (1234), BA".to_owned()),
            contact_phone: None,
            notes: None,
            subtotal: Price::ars(Decimal::new(20_000, 0)),
            shipping_cost: Price::ars(Decimal::new(2_500, 0)),
            total: Price::ars(Decimal::new(22_500, 0)),
            payment_reference: None,
            payment_id: None,
            payment_status: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn items() -> Vec<OrderItem> {
        vec![OrderItem {
            id: OrderItemId::new(1),
            order_id: OrderId::new(42),
            product_id: Some(ProductId::new(3)),
            product_name: "Ficus lyrata".to_owned(),
            unit_price: Price::ars(Decimal::new(10_000, 0)),
            quantity: 2,
            line_total: Price::ars(Decimal::new(20_000, 0)),
        }]
    }

    #[test]
    fn test_order_placed_includes_bank_details_for_transfers() {
        let order = order(PaymentMethod::BankTransfer);
        let items = items();
        let bank = BankTransferConfig {
            alias: Some("vivero.plantas.mp".to_owned()),
            cbu: Some("0000003100000000000001".to_owned()),
            holder: Some("Vivero SRL".to_owned()),
        };
        let text = OrderPlacedText {
            name: "Ana",
            order: &order,
            items: &items,
            bank: Some(&bank),
            order_url: "http://localhost:3000/account/orders/42",
        }
        .render()
        .unwrap();

        assert!(text.contains("#000042"));
        assert!(text.contains("Ficus lyrata"));
        assert!(text.contains("vivero.plantas.mp"));
        assert!(text.contains("$ 22.500,00"));
    }

    #[test]
    fn test_status_email_mentions_new_status() {
        let mut order = order(PaymentMethod::Cash);
        order.status = OrderStatus::Shipped;
        let html = OrderStatusHtml {
            name: "Ana",
            order: &order,
            order_url: "http://localhost:3000/account/orders/42",
        }
        .render()
        .unwrap();
        assert!(html.contains(OrderStatus::Shipped.label()));
    }
}
