//! Payment gateway webhook verification and payload decoding.
//!
//! The gateway signs each delivery with HMAC-SHA256 over the raw body,
//! hex-encoded in the signature header. Verification is constant-time and
//! fails closed: a delivery that does not verify is rejected before any
//! byte of the payload is interpreted.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::errors::{PaymentError, PaymentResult};

type HmacSha256 = Hmac<Sha256>;

/// Prefix the core uses when handing order references to the gateway
pub const ORDER_REF_PREFIX: &str = "res_";

/// Build the gateway order reference for a reservation
pub fn order_reference(reservation_id: i64) -> String {
    format!("{ORDER_REF_PREFIX}{reservation_id}")
}

/// Verifies webhook signatures against the shared gateway secret
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Vec<u8>,
}

impl WebhookVerifier {
    /// Create a verifier from the shared secret
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Verify a raw body against its hex-encoded signature
    ///
    /// # Errors
    ///
    /// * `PaymentError::InvalidSignature` - Signature is not valid hex, has
    ///   the wrong length, or does not match the body
    pub fn verify(&self, body: &[u8], signature_hex: &str) -> PaymentResult<()> {
        let given = hex::decode(signature_hex.trim()).map_err(|_| PaymentError::InvalidSignature)?;

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| PaymentError::InvalidSignature)?;
        mac.update(body);
        let expected = mac.finalize().into_bytes();

        if expected.ct_eq(given.as_slice()).into() {
            Ok(())
        } else {
            Err(PaymentError::InvalidSignature)
        }
    }

    /// Produce the hex signature for a body. Used by tests and by the
    /// sandbox tooling that replays recorded deliveries.
    pub fn sign(&self, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }
}

/// Outcome code reported by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayOutcome {
    /// Funds captured
    Succeeded,
    /// Attempt declined; the customer may retry within the hold
    Failed,
    /// Payment session closed without capture
    Aborted,
}

/// Typed gateway event, decoded at the boundary before it touches any state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEvent {
    /// Gateway-side delivery identifier
    pub event_id: String,
    /// Order reference the core handed out at checkout (`res_<id>`)
    pub order_reference: String,
    pub amount_cents: i64,
    pub outcome: GatewayOutcome,
}

impl GatewayEvent {
    /// Decode a verified webhook body
    ///
    /// # Errors
    ///
    /// * `PaymentError::MalformedPayload` - Body is not the expected shape
    pub fn decode(body: &[u8]) -> PaymentResult<Self> {
        serde_json::from_slice(body).map_err(|e| PaymentError::MalformedPayload(e.to_string()))
    }

    /// Map the order reference back to a reservation ID
    ///
    /// # Errors
    ///
    /// * `PaymentError::UnknownOrderReference` - Reference is not in the
    ///   `res_<id>` format
    pub fn reservation_id(&self) -> PaymentResult<i64> {
        self.order_reference
            .strip_prefix(ORDER_REF_PREFIX)
            .and_then(|id| id.parse().ok())
            .ok_or_else(|| PaymentError::UnknownOrderReference(self.order_reference.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-webhook-secret";

    fn event_body() -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "event_id": "evt_001",
            "order_reference": "res_42",
            "amount_cents": 2000,
            "outcome": "succeeded",
        }))
        .unwrap()
    }

    #[test]
    fn test_sign_then_verify() {
        let verifier = WebhookVerifier::new(SECRET);
        let body = event_body();
        let signature = verifier.sign(&body);

        assert!(verifier.verify(&body, &signature).is_ok());
    }

    #[test]
    fn test_tampered_body_rejected() {
        let verifier = WebhookVerifier::new(SECRET);
        let body = event_body();
        let signature = verifier.sign(&body);

        let mut tampered = body.clone();
        tampered[0] ^= 0x01;

        assert!(matches!(
            verifier.verify(&tampered, &signature),
            Err(PaymentError::InvalidSignature)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let signer = WebhookVerifier::new("other-secret");
        let verifier = WebhookVerifier::new(SECRET);
        let body = event_body();
        let signature = signer.sign(&body);

        assert!(matches!(
            verifier.verify(&body, &signature),
            Err(PaymentError::InvalidSignature)
        ));
    }

    #[test]
    fn test_garbage_signature_rejected() {
        let verifier = WebhookVerifier::new(SECRET);
        let body = event_body();

        assert!(verifier.verify(&body, "not-hex").is_err());
        assert!(verifier.verify(&body, "deadbeef").is_err());
        assert!(verifier.verify(&body, "").is_err());
    }

    #[test]
    fn test_decode_event() {
        let event = GatewayEvent::decode(&event_body()).unwrap();
        assert_eq!(event.event_id, "evt_001");
        assert_eq!(event.outcome, GatewayOutcome::Succeeded);
        assert_eq!(event.amount_cents, 2000);
        assert_eq!(event.reservation_id().unwrap(), 42);
    }

    #[test]
    fn test_decode_rejects_unknown_outcome() {
        let body = serde_json::to_vec(&serde_json::json!({
            "event_id": "evt_002",
            "order_reference": "res_42",
            "amount_cents": 2000,
            "outcome": "maybe",
        }))
        .unwrap();

        assert!(matches!(
            GatewayEvent::decode(&body),
            Err(PaymentError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_bad_order_reference() {
        let event = GatewayEvent {
            event_id: "evt_003".to_string(),
            order_reference: "order-42".to_string(),
            amount_cents: 2000,
            outcome: GatewayOutcome::Succeeded,
        };

        assert!(matches!(
            event.reservation_id(),
            Err(PaymentError::UnknownOrderReference(_))
        ));
    }

    #[test]
    fn test_order_reference_round_trip() {
        let event = GatewayEvent {
            event_id: "evt_004".to_string(),
            order_reference: order_reference(7),
            amount_cents: 1500,
            outcome: GatewayOutcome::Failed,
        };
        assert_eq!(event.reservation_id().unwrap(), 7);
    }
}
