//! Payment gateway notifications.
//!
//! The gateway reports payment changes by POSTing a notification that only
//! carries the payment id. The handler validates that id, checks the
//! `x-signature` header when a webhook secret is configured, fetches the
//! payment from the gateway and applies it to the order it references.
//!
//! Responses: `200` once handled or deliberately ignored, `400` for a bad
//! payment id, `401` for a bad signature and `502` when the gateway cannot be
//! queried (the gateway retries on non-2xx).

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::error::AppError;
use crate::services::OrderService;
use crate::services::payments::{PaymentError, parse_payment_id, verify_signature};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Older IPN-style notifications use `topic` and `id`.
    pub topic: Option<String>,
    #[serde(rename = "data.id")]
    pub data_id: Option<String>,
    pub id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NotificationBody {
    #[serde(rename = "type")]
    kind: Option<String>,
    data: Option<NotificationData>,
}

#[derive(Debug, Deserialize)]
struct NotificationData {
    id: serde_json::Value,
}

/// What a notification is about, merged from the query string and the body.
#[derive(Debug, PartialEq, Eq)]
struct Notification {
    kind: Option<String>,
    data_id: Option<String>,
}

impl Notification {
    fn from_parts(query: NotificationQuery, body: &[u8]) -> Self {
        let body: NotificationBody = serde_json::from_slice(body).unwrap_or_default();

        let body_id = body.data.and_then(|d| match d.id {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

        Self {
            kind: query.kind.or(query.topic).or(body.kind),
            data_id: query.data_id.or(query.id).or(body_id),
        }
    }

    fn is_payment(&self) -> bool {
        self.kind.as_deref() == Some("payment")
    }
}

#[instrument(skip(state, headers, body))]
pub async fn payments(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<NotificationQuery>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let notification = Notification::from_parts(query, &body);
    if !notification.is_payment() {
        debug!(kind = ?notification.kind, "Ignoring non-payment notification");
        return Ok(StatusCode::OK);
    }

    let raw_id = notification
        .data_id
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("missing payment id".to_owned()))?;
    let payment_id = parse_payment_id(raw_id)?;

    if let Some(secret) = &state.config().mercadopago.webhook_secret {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
        };
        let signature = header("x-signature");
        if signature.is_empty() {
            return Err(PaymentError::InvalidSignature("missing x-signature".to_owned()).into());
        }
        verify_signature(
            secret.expose_secret(),
            signature,
            header("x-request-id"),
            payment_id,
        )?;
    }

    let payment = state.payments().get_payment(payment_id).await?;

    let change = OrderService::new(state.pool(), state.email())
        .apply_payment_update(&payment)
        .await?;

    if let Some(change) = change {
        info!(
            order_id = %change.order.id,
            payment_status = payment.raw_status(),
            status = %change.order.status,
            "Payment notification applied"
        );
    }

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_from_query() {
        let query = NotificationQuery {
            kind: Some("payment".to_owned()),
            data_id: Some("123".to_owned()),
            ..NotificationQuery::default()
        };
        let n = Notification::from_parts(query, b"");
        assert!(n.is_payment());
        assert_eq!(n.data_id.as_deref(), Some("123"));
    }

    #[test]
    fn test_notification_from_body_numeric_id() {
        let body = br#"{"action":"payment.updated","type":"payment","data":{"id":987654}}"#;
        let n = Notification::from_parts(NotificationQuery::default(), body);
        assert_eq!(
            n,
            Notification {
                kind: Some("payment".to_owned()),
                data_id: Some("987654".to_owned()),
            }
        );
    }

    #[test]
    fn test_notification_legacy_topic() {
        let query = NotificationQuery {
            topic: Some("merchant_order".to_owned()),
            id: Some("55".to_owned()),
            ..NotificationQuery::default()
        };
        assert!(!Notification::from_parts(query, b"not json").is_payment());
    }
}
