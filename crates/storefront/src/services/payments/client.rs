//! HTTP client for the MercadoPago REST API.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use vivero_core::OrderId;

use super::{PaymentError, PaymentStatus, parse_payment_id};
use crate::config::MercadoPagoConfig;

/// A line on a checkout preference.
#[derive(Debug, Clone, Serialize)]
pub struct PreferenceItem {
    pub id: String,
    pub title: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    pub currency_id: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreferencePayer {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
struct BackUrls {
    success: String,
    pending: String,
    failure: String,
}

#[derive(Debug, Serialize)]
struct PreferenceRequest<'a> {
    items: &'a [PreferenceItem],
    payer: &'a PreferencePayer,
    external_reference: String,
    back_urls: BackUrls,
    auto_return: &'static str,
    notification_url: String,
    statement_descriptor: &'static str,
}

/// A created checkout preference.
#[derive(Debug, Clone, Deserialize)]
pub struct Preference {
    pub id: String,
    /// Where to send the customer to pay.
    pub init_point: String,
}

/// A payment as returned by `GET /v1/payments/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Payment {
    pub id: u64,
    status: String,
    #[serde(default)]
    pub status_detail: Option<String>,
    /// Our order id, as sent in the preference.
    #[serde(default)]
    pub external_reference: Option<String>,
}

impl Payment {
    #[must_use]
    pub fn status(&self) -> PaymentStatus {
        PaymentStatus::parse(&self.status)
    }

    #[must_use]
    pub fn raw_status(&self) -> &str {
        &self.status
    }

    /// The order this payment belongs to.
    #[must_use]
    pub fn order_id(&self) -> Option<OrderId> {
        self.external_reference
            .as_deref()
            .and_then(|r| r.trim().parse::<i32>().ok())
            .map(OrderId::new)
    }
}

/// MercadoPago API client.
#[derive(Clone)]
pub struct MercadoPagoClient {
    client: reqwest::Client,
    api_base: String,
    base_url: String,
}

impl MercadoPagoClient {
    /// Create a client. `base_url` is the storefront's public URL, used for
    /// back URLs and the notification URL.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &MercadoPagoConfig, base_url: &str) -> Result<Self, PaymentError> {
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {}", config.access_token.expose_secret());
        let mut auth = HeaderValue::from_str(&bearer)
            .map_err(|e| PaymentError::Parse(format!("invalid access token format: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Create a checkout preference for an order.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[tracing::instrument(skip(self, items, payer), fields(order_id = %order_id))]
    pub async fn create_preference(
        &self,
        order_id: OrderId,
        items: &[PreferenceItem],
        payer: &PreferencePayer,
    ) -> Result<Preference, PaymentError> {
        let return_url = format!("{}/checkout/return", self.base_url);
        let request = PreferenceRequest {
            items,
            payer,
            external_reference: order_id.to_string(),
            back_urls: BackUrls {
                success: return_url.clone(),
                pending: return_url.clone(),
                failure: return_url,
            },
            auto_return: "approved",
            notification_url: format!("{}/webhooks/payments", self.base_url),
            statement_descriptor: "VIVERO",
        };

        let response = self
            .client
            .post(format!("{}/checkout/preferences", self.api_base))
            .header("X-Idempotency-Key", format!("order-{order_id}"))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))
    }

    /// Fetch a payment by id.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidPaymentId` before any request for a
    /// malformed id, otherwise any API error.
    #[tracing::instrument(skip(self))]
    pub async fn get_payment(&self, payment_id: &str) -> Result<Payment, PaymentError> {
        let payment_id = parse_payment_id(payment_id)?;

        let response = self
            .client
            .get(format!("{}/v1/payments/{payment_id}", self.api_base))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_order_reference() {
        let json = r#"{"id": 123456789, "status": "approved", "status_detail": "accredited",
                       "external_reference": "42", "transaction_amount": 1500.5}"#;
        let payment: Payment = serde_json::from_str(json).unwrap();
        assert_eq!(payment.status(), PaymentStatus::Approved);
        assert_eq!(payment.order_id(), Some(OrderId::new(42)));

        let json = r#"{"id": 1, "status": "rejected", "external_reference": "abc"}"#;
        let payment: Payment = serde_json::from_str(json).unwrap();
        assert_eq!(payment.order_id(), None);
        assert_eq!(payment.raw_status(), "rejected");
    }

    #[test]
    fn test_preference_item_serializes_price_as_number() {
        let item = PreferenceItem {
            id: "7".to_owned(),
            title: "Monstera".to_owned(),
            quantity: 2,
            unit_price: Decimal::new(125_050, 2),
            currency_id: "ARS",
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["unit_price"], serde_json::json!(1250.5));
        assert_eq!(value["quantity"], 2);
    }

    #[tokio::test]
    async fn test_get_payment_rejects_bad_id_without_request() {
        let config = MercadoPagoConfig {
            access_token: secrecy::SecretString::from("APP_USR-token"),
            webhook_secret: None,
            api_base: "http://127.0.0.1:9".to_owned(),
        };
        let client = MercadoPagoClient::new(&config, "http://localhost:3000").unwrap();
        assert!(matches!(
            client.get_payment("../users").await,
            Err(PaymentError::InvalidPaymentId(_))
        ));
    }
}
