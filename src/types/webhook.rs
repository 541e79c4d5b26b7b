//! Append-only audit records for inbound provider webhooks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::payment::{PaymentId, PaymentMethod, PaymentStatus};

/// Unique webhook event identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WebhookEventId(pub String);

impl WebhookEventId {
    /// Generates a new unique event ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("wh_{}", Uuid::new_v4().simple()))
    }
}

/// How an inbound event was matched to a payment. A provider-payment-id
/// match is unique by construction; a reference match is lower confidence
/// and recorded for operator review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Matched on the provider-assigned payment id.
    ProviderPaymentId,
    /// Fell back to the provider reference.
    ProviderReference,
}

/// Audit entry for one webhook delivery, matched or not. Written exactly
/// once per delivery and never mutated or deleted; this is the ground truth
/// for incident investigation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEventRecord {
    /// Event ID.
    pub id: WebhookEventId,
    /// Raw request body as received.
    pub raw_payload: String,
    /// Method tag extracted from the payload, when parseable.
    pub method: Option<PaymentMethod>,
    /// Provider payment id from the payload.
    pub provider_payment_id: Option<String>,
    /// Provider reference from the payload.
    pub provider_reference: Option<String>,
    /// Canonical status the provider status string mapped to.
    pub mapped_status: Option<PaymentStatus>,
    /// Matched payment, when one was found.
    pub payment_id: Option<PaymentId>,
    /// How the payment was matched.
    pub match_strategy: Option<MatchStrategy>,
    /// Whether the delivery was processed end to end.
    pub success: bool,
    /// Failure reason, when processing stopped early.
    pub error: Option<String>,
    /// When the delivery was handled.
    pub processed_at: DateTime<Utc>,
}

impl WebhookEventRecord {
    /// Starts an audit record for an incoming delivery. Fields are filled
    /// in as the handler progresses.
    #[must_use]
    pub fn started(raw_body: &[u8]) -> Self {
        Self {
            id: WebhookEventId::generate(),
            raw_payload: String::from_utf8_lossy(raw_body).into_owned(),
            method: None,
            provider_payment_id: None,
            provider_reference: None,
            mapped_status: None,
            payment_id: None,
            match_strategy: None,
            success: false,
            error: None,
            processed_at: Utc::now(),
        }
    }
}

/// Response the route layer returns for a webhook delivery. The handler
/// never errors; every outcome carries a status class and the audit id.
#[derive(Debug, Clone)]
pub struct WebhookResponse {
    /// HTTP status class.
    pub status_code: u16,
    /// Minimal client-facing message; full detail lives in the audit record.
    pub message: String,
    /// Audit record written for this delivery.
    pub event_id: WebhookEventId,
}
