//! Webhook reconciliation.
//!
//! Matches inbound provider events to payments, drives status transitions
//! through the orchestrator, and records an audit trail of every delivery —
//! matched or not. The webhook endpoint is unauthenticated by design;
//! signature verification is the only trust decision, and it happens before
//! the body is parsed.

mod tests;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::error;

use crate::config::ProviderConfig;
use crate::errors::{ConfigError, StoreError};
use crate::orchestrator::PaymentOrchestrator;
use crate::security::signature::{timestamp_verdict, TimestampVerdict, DEFAULT_MAX_AGE_SECS};
use crate::security::SignatureVerifier;
use crate::store::{PaymentStore, WebhookEventStore};
use crate::types::payment::{Payment, PaymentMethod, PaymentStatus, StatusSource};
use crate::types::webhook::{MatchStrategy, WebhookEventRecord, WebhookResponse};

/// Provider-defined webhook body. Only the fields the reconciler needs are
/// modeled; unrecognized fields are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderWebhookPayload {
    payment_method: Option<String>,
    payment_id: Option<String>,
    reference: Option<String>,
    status: String,
    timestamp: Option<DateTime<Utc>>,
}

struct ProviderEndpoint {
    name: String,
    signature_header: String,
    verifier: SignatureVerifier,
}

/// Reconciles inbound provider webhooks against stored payments.
pub struct WebhookReconciler {
    providers: Vec<ProviderEndpoint>,
    orchestrator: Arc<PaymentOrchestrator>,
    payments: Arc<dyn PaymentStore>,
    events: Arc<dyn WebhookEventStore>,
}

impl WebhookReconciler {
    /// Builds a reconciler from provider configuration. Fails at startup if
    /// any provider secret is missing or empty.
    pub fn new(
        providers: &[ProviderConfig],
        orchestrator: Arc<PaymentOrchestrator>,
        payments: Arc<dyn PaymentStore>,
        events: Arc<dyn WebhookEventStore>,
    ) -> Result<Self, ConfigError> {
        let providers = providers
            .iter()
            .map(|p| {
                Ok(ProviderEndpoint {
                    name: p.name.clone(),
                    signature_header: p.signature_header.to_ascii_lowercase(),
                    verifier: SignatureVerifier::new(&p.name, &p.webhook_secret)?,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Self { providers, orchestrator, payments, events })
    }

    /// Handles one webhook delivery. Never errors: every outcome, including
    /// rejections, is answered with a status class and backed by exactly one
    /// audit record.
    pub async fn handle(
        &self,
        raw_body: &[u8],
        headers: &HashMap<String, String>,
    ) -> WebhookResponse {
        let mut record = WebhookEventRecord::started(raw_body);

        // 1. Provider tag and signature come from the headers.
        let Some((provider, signature)) = self.extract_signature(headers) else {
            record.error = Some("missing signature header".to_string());
            return self.finish(record, 401, "missing signature").await;
        };

        // 2. Verify over the exact raw bytes before trusting the body.
        if !provider.verifier.verify(raw_body, &signature) {
            record.error = Some(format!("invalid signature for provider {}", provider.name));
            return self.finish(record, 401, "invalid signature").await;
        }

        // 3. Parse the provider payload.
        let payload: ProviderWebhookPayload = match serde_json::from_slice(raw_body) {
            Ok(payload) => payload,
            Err(e) => {
                record.error = Some(format!("unparseable payload: {e}"));
                return self.finish(record, 400, "unparseable payload").await;
            }
        };
        record.method = payload.payment_method.as_deref().and_then(PaymentMethod::parse);
        record.provider_payment_id = payload.payment_id.clone();
        record.provider_reference = payload.reference.clone();

        // Replay protection when the provider stamps its events.
        if let Some(event_time) = payload.timestamp {
            match timestamp_verdict(event_time, Utc::now(), DEFAULT_MAX_AGE_SECS) {
                TimestampVerdict::Fresh => {}
                TimestampVerdict::Stale => {
                    record.error = Some("stale event timestamp".to_string());
                    return self.finish(record, 401, "stale timestamp").await;
                }
                TimestampVerdict::FutureDated => {
                    record.error = Some("future-dated event timestamp".to_string());
                    return self.finish(record, 401, "future-dated timestamp").await;
                }
            }
        }

        // 4./5. Two-step match: provider payment id first, reference second.
        let matched = match self.match_payment(&payload).await {
            Ok(matched) => matched,
            Err(e) => {
                record.error = Some(format!("store lookup failed: {e}"));
                return self.finish(record, 500, "lookup failed").await;
            }
        };
        let Some((payment, strategy)) = matched else {
            record.error = Some("PaymentNotFound".to_string());
            return self.finish(record, 404, "payment not found").await;
        };
        record.payment_id = Some(payment.id.clone());
        record.match_strategy = Some(strategy);

        // 6. Map the provider vocabulary; unknown strings default to pending
        // rather than erroring.
        let mapped = map_provider_status(&payload.status);
        record.mapped_status = Some(mapped);

        // 7. Drive the transition; duplicates and stale statuses no-op.
        match self.orchestrator.apply_status(&payment.id, mapped, StatusSource::Webhook).await {
            Ok(_) => {
                record.success = true;
                self.finish(record, 200, "processed").await
            }
            Err(e) => {
                record.error = Some(e.to_string());
                self.finish(record, 500, "processing failed").await
            }
        }
    }

    fn extract_signature(
        &self,
        headers: &HashMap<String, String>,
    ) -> Option<(&ProviderEndpoint, String)> {
        let lowered: HashMap<String, &String> =
            headers.iter().map(|(k, v)| (k.to_ascii_lowercase(), v)).collect();
        self.providers.iter().find_map(|provider| {
            lowered
                .get(&provider.signature_header)
                .map(|value| (provider, (*value).clone()))
        })
    }

    async fn match_payment(
        &self,
        payload: &ProviderWebhookPayload,
    ) -> Result<Option<(Payment, MatchStrategy)>, StoreError> {
        if let Some(provider_id) = payload.payment_id.as_deref() {
            if let Some(payment) = self.payments.find_by_provider_payment_id(provider_id).await? {
                return Ok(Some((payment, MatchStrategy::ProviderPaymentId)));
            }
        }
        if let Some(reference) = payload.reference.as_deref() {
            if let Some(payment) = self.payments.find_by_provider_reference(reference).await? {
                return Ok(Some((payment, MatchStrategy::ProviderReference)));
            }
        }
        Ok(None)
    }

    /// Writes the audit record and builds the response. Every delivery ends
    /// here exactly once. An audit-write failure is logged but must not mask
    /// the delivery's own outcome.
    async fn finish(
        &self,
        record: WebhookEventRecord,
        status_code: u16,
        message: &str,
    ) -> WebhookResponse {
        let event_id = record.id.clone();
        if let Err(e) = self.events.append(record).await {
            error!(event = %event_id.0, error = %e, "failed to write webhook audit record");
        }
        WebhookResponse { status_code, message: message.to_string(), event_id }
    }
}

/// Maps a provider-native status string to the canonical vocabulary.
/// Unknown strings map to `pending`: an unrecognized term must never crash
/// webhook processing.
#[must_use]
pub fn map_provider_status(raw: &str) -> PaymentStatus {
    match raw.trim().to_ascii_lowercase().as_str() {
        "succeeded" | "paid" | "confirmed" | "completed" => PaymentStatus::Completed,
        "failed" | "declined" => PaymentStatus::Failed,
        "cancelled" => PaymentStatus::Cancelled,
        "refunded" => PaymentStatus::Refunded,
        "processing" => PaymentStatus::Processing,
        _ => PaymentStatus::Pending,
    }
}
