//! Payment reconciliation: gateway webhooks, wallet payments, refunds.
//!
//! Every path into this module applies its effect exactly once. Wallet
//! moves carry idempotency keys derived from the reservation ID; webhook
//! settlement is gated on the reservation status inside the transaction
//! that writes it, so a re-delivered event finds the work already done.

pub mod errors;
pub mod gateway;
pub mod service;

pub use errors::{PaymentError, PaymentResult};
pub use gateway::{GatewayEvent, GatewayOutcome, WebhookVerifier, order_reference};
pub use service::{
    CreditsPayment, PaymentService, WebhookDisposition, pay_idempotency_key,
    refund_idempotency_key,
};

pub(crate) use service::refund_in_tx;
