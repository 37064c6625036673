//! Payment gateway webhook receiver.
//!
//! The gateway POSTs signed deliveries here; the signature covers the raw
//! body, so the handler takes the bytes untouched and leaves all parsing
//! to the payment service. Response codes drive the gateway's retry
//! behavior: a `401` (bad signature) is final, any `5xx` is retried.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use courtbook::payments::{PaymentError, WebhookDisposition};
use serde::Serialize;

use super::AppState;
use super::error::{ApiError, ErrorResponse, payment_error};
use crate::{logging, metrics};

/// Header carrying the hex-encoded HMAC signature
pub const SIGNATURE_HEADER: &str = "x-gateway-signature";

/// Acknowledgement returned for an accepted delivery
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub disposition: &'static str,
    pub reservation_id: Option<i64>,
}

/// Receive a payment gateway webhook.
///
/// # Response codes
///
/// - `200 OK`: delivery applied (or found already applied)
/// - `401 Unauthorized`: signature mismatch; the gateway must not retry
/// - `409 Conflict`: settlement for an expired or released reservation
/// - `429 Too Many Requests`: delivery rate exceeded, retry later
/// - `5xx`: transient failure; the gateway retries delivery
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    {
        let mut limiter = state
            .webhook_limiter
            .lock()
            .expect("webhook limiter lock poisoned");
        if !limiter.check() {
            return Err((
                StatusCode::TOO_MANY_REQUESTS,
                Json(ErrorResponse::new(
                    "rate_limited",
                    "Too many deliveries, retry later".to_string(),
                )),
            ));
        }
    }

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            logging::log_security_event(
                "webhook_signature_missing",
                None,
                "Delivery without signature header",
            );
            metrics::webhook_signature_rejections_total();
            payment_error(&PaymentError::InvalidSignature)
        })?;

    match state.payments.handle_gateway_webhook(&body, signature).await {
        Ok(disposition) => {
            let ack = match &disposition {
                WebhookDisposition::Settled(reservation) => {
                    metrics::payments_settled_total(reservation.payment_method.as_str());
                    metrics::payment_amount_cents(reservation.total_price_cents);
                    WebhookAck {
                        disposition: "settled",
                        reservation_id: Some(reservation.id),
                    }
                }
                WebhookDisposition::AlreadySettled => WebhookAck {
                    disposition: "already_settled",
                    reservation_id: None,
                },
                WebhookDisposition::FailureRecorded => WebhookAck {
                    disposition: "failure_recorded",
                    reservation_id: None,
                },
                WebhookDisposition::Cancelled(reservation) => WebhookAck {
                    disposition: "cancelled",
                    reservation_id: Some(reservation.id),
                },
                WebhookDisposition::Ignored => WebhookAck {
                    disposition: "ignored",
                    reservation_id: None,
                },
            };

            metrics::webhook_deliveries_total(ack.disposition);
            Ok(Json(ack))
        }
        Err(e) => {
            if matches!(e, PaymentError::InvalidSignature) {
                logging::log_security_event(
                    "webhook_signature_mismatch",
                    None,
                    "Rejected delivery with bad signature",
                );
                metrics::webhook_signature_rejections_total();
            }
            metrics::webhook_deliveries_total("rejected");
            Err(payment_error(&e))
        }
    }
}
