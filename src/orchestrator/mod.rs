//! Payment lifecycle orchestration.
//!
//! The orchestrator is the sole writer of payment and order status
//! transitions. Creation is atomic with respect to the provider: if the
//! gateway call fails, nothing is persisted — a payment recorded locally but
//! rejected upstream is a worse failure mode than a clean rejection.


use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::errors::{PaymentError, PaymentResult, StoreError};
use crate::gateway::PaymentGateway;
use crate::store::{OrderStore, PaymentStore};
use crate::types::order::{CustomerId, OrderId, OrderStatus};
use crate::types::payment::{Payment, PaymentId, PaymentMethod, PaymentStatus, StatusSource};
use crate::validation;

/// The single supported currency code.
pub const SUPPORTED_CURRENCY: &str = "AUD";

/// Request to create a payment against an order.
#[derive(Debug, Clone)]
pub struct CreatePaymentCommand {
    /// Order to settle.
    pub order_id: OrderId,
    /// Amount; must equal the order total exactly.
    pub amount: Decimal,
    /// Currency code; must be AUD.
    pub currency: String,
    /// Payment rail.
    pub method: PaymentMethod,
    /// Raw method-specific detail payload.
    pub details: Value,
    /// Caller-supplied metadata.
    pub metadata: HashMap<String, String>,
    /// Where to send the receipt.
    pub receipt_email: Option<String>,
}

/// A created payment plus the provider's client-facing extras.
#[derive(Debug, Clone)]
pub struct CreatedPayment {
    /// The persisted payment.
    pub payment: Payment,
    /// Human-payable instructions.
    pub instructions: Option<String>,
    /// Hosted payment page, when the rail has one.
    pub redirect_url: Option<String>,
    /// When the payment advice expires.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Extra data attached to a transition: the acting user and a reason.
#[derive(Debug, Clone, Default)]
struct TransitionMeta {
    actor: Option<String>,
    reason: Option<String>,
}

/// Owns payment and order state transitions.
pub struct PaymentOrchestrator {
    orders: Arc<dyn OrderStore>,
    payments: Arc<dyn PaymentStore>,
    gateway: Arc<PaymentGateway>,
}

impl PaymentOrchestrator {
    /// Wires the orchestrator to its collaborators.
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderStore>,
        payments: Arc<dyn PaymentStore>,
        gateway: Arc<PaymentGateway>,
    ) -> Self {
        Self { orders, payments, gateway }
    }

    /// Creates a payment for an order.
    ///
    /// Preconditions are checked in order: currency, order existence,
    /// ownership, no live payment, detail validation, exact amount match.
    /// The gateway is called before anything is persisted; any gateway
    /// failure aborts the whole operation with no local state left behind.
    pub async fn create(
        &self,
        cmd: CreatePaymentCommand,
        principal: &CustomerId,
    ) -> PaymentResult<CreatedPayment> {
        if cmd.currency != SUPPORTED_CURRENCY {
            return Err(PaymentError::UnsupportedCurrency { currency: cmd.currency });
        }
        let mut order = self
            .orders
            .get(&cmd.order_id)
            .await?
            .ok_or_else(|| PaymentError::OrderNotFound(cmd.order_id.0.clone()))?;
        if &order.customer_id != principal {
            return Err(PaymentError::NotOwner);
        }
        if let Some(existing) = self.payments.find_active_for_order(&order.id).await? {
            return Err(PaymentError::DuplicatePayment {
                order_id: order.id.0.clone(),
                existing_status: existing.status,
            });
        }

        let details =
            validation::validate_payment_details(cmd.method, &cmd.details, cmd.amount, Utc::now())?;
        if cmd.amount != order.total {
            return Err(PaymentError::AmountMismatch { expected: order.total, got: cmd.amount });
        }

        let provisioned =
            self.gateway.create(cmd.method, &order, &details).await.map_err(|e| {
                error!(
                    order = %order.id.as_str(),
                    method = cmd.method.as_str(),
                    retryable = e.is_retryable(),
                    error = %e,
                    "gateway rejected payment creation"
                );
                e
            })?;

        let mut payment = Payment::new(
            order.id.clone(),
            order.customer_id.clone(),
            cmd.amount,
            cmd.currency,
            details,
            cmd.metadata,
            cmd.receipt_email,
        );
        payment.provider_payment_id = Some(provisioned.provider_payment_id.clone());
        payment.provider_reference = Some(provisioned.provider_reference.clone());
        self.payments.insert(payment.clone()).await?;

        order.payment_id = Some(payment.id.clone());
        if order.status == OrderStatus::Draft {
            order.status = OrderStatus::Pending;
        }
        order.touch();
        self.orders.update(order).await?;

        info!(
            payment = %payment.id.as_str(),
            order = %payment.order_id.as_str(),
            method = payment.method.as_str(),
            amount = %payment.amount,
            "payment created"
        );
        Ok(CreatedPayment {
            payment,
            instructions: provisioned.instructions,
            redirect_url: provisioned.redirect_url,
            expires_at: provisioned.expires_at,
        })
    }

    /// Cancels a payment. Only pending or processing payments are
    /// cancellable; a provider failure leaves the payment unchanged.
    pub async fn cancel(
        &self,
        payment_id: &PaymentId,
        actor: &str,
        reason: Option<String>,
    ) -> PaymentResult<Payment> {
        let payment = self.fetch(payment_id).await?;
        if !payment.status.is_cancellable() {
            return Err(PaymentError::InvalidStateTransition { current: payment.status });
        }
        self.gateway.cancel(&payment).await?;
        let meta = TransitionMeta {
            actor: Some(actor.to_string()),
            reason: Some(reason.unwrap_or_else(|| "cancelled by request".to_string())),
        };
        self.apply_status_with(payment_id, PaymentStatus::Cancelled, StatusSource::Cancel, meta)
            .await
    }

    /// Polls the provider for authoritative status and persists any change.
    /// This is the synchronous fallback when a webhook has not arrived yet;
    /// calling it twice with no provider-side change is a no-op.
    pub async fn refresh_status(&self, payment_id: &PaymentId) -> PaymentResult<Payment> {
        let payment = self.fetch(payment_id).await?;
        let provider_status = self.gateway.status(&payment).await?;
        if provider_status == payment.status {
            return Ok(payment);
        }
        self.apply_status(payment_id, provider_status, StatusSource::Poll).await
    }

    /// Administrator override of a payment's status and metadata. The status
    /// change is subject to the same transition table as every other source;
    /// metadata entries merge even when the status change itself no-ops.
    pub async fn override_status(
        &self,
        payment_id: &PaymentId,
        new_status: PaymentStatus,
        admin: &str,
        metadata: HashMap<String, String>,
    ) -> PaymentResult<Payment> {
        let meta = TransitionMeta { actor: Some(admin.to_string()), reason: None };
        let mut payment =
            self.apply_status_with(payment_id, new_status, StatusSource::Admin, meta).await?;
        while !metadata.is_empty() {
            let expected_version = payment.version;
            let mut updated = payment.clone();
            updated.metadata.extend(metadata.clone());
            updated.updated_at = Utc::now();
            match self.payments.update(updated, expected_version).await {
                Ok(saved) => return Ok(saved),
                // Lost a race; re-read and merge again.
                Err(StoreError::VersionConflict { .. }) => {
                    payment = self.fetch(payment_id).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(payment)
    }

    /// Fetches a payment or fails with `PaymentNotFound`.
    pub async fn fetch(&self, payment_id: &PaymentId) -> PaymentResult<Payment> {
        self.payments
            .get(payment_id)
            .await?
            .ok_or_else(|| PaymentError::PaymentNotFound(payment_id.0.clone()))
    }

    /// Central state-transition function shared by the webhook, poll,
    /// cancel and admin paths.
    ///
    /// Stale, duplicate or unreachable transitions are logged and ignored
    /// rather than raised: provider callbacks arrive out of order and are
    /// retried, so a no-op is the correct outcome. The update is
    /// version-checked; when two appliers race, exactly one wins and
    /// cascades the order, and the loser re-reads and no-ops.
    pub async fn apply_status(
        &self,
        payment_id: &PaymentId,
        new_status: PaymentStatus,
        source: StatusSource,
    ) -> PaymentResult<Payment> {
        self.apply_status_with(payment_id, new_status, source, TransitionMeta::default()).await
    }

    async fn apply_status_with(
        &self,
        payment_id: &PaymentId,
        new_status: PaymentStatus,
        source: StatusSource,
        meta: TransitionMeta,
    ) -> PaymentResult<Payment> {
        loop {
            let payment = self.fetch(payment_id).await?;
            if payment.status == new_status {
                return Ok(payment);
            }
            if payment.status.is_terminal() {
                warn!(
                    payment = %payment.id.as_str(),
                    current = payment.status.display_name(),
                    requested = new_status.display_name(),
                    source = source.display_name(),
                    "ignoring transition from terminal state"
                );
                return Ok(payment);
            }
            if !payment.status.can_transition_to(new_status) {
                warn!(
                    payment = %payment.id.as_str(),
                    current = payment.status.display_name(),
                    requested = new_status.display_name(),
                    source = source.display_name(),
                    "ignoring unreachable transition"
                );
                return Ok(payment);
            }

            let expected_version = payment.version;
            let mut updated = payment;
            updated.record_transition(new_status, source, Utc::now());
            match new_status {
                PaymentStatus::Cancelled => {
                    updated.cancellation_reason =
                        meta.reason.clone().or(updated.cancellation_reason);
                    if let Some(actor) = &meta.actor {
                        updated.metadata.insert("cancelled_by".to_string(), actor.clone());
                    }
                }
                PaymentStatus::Refunded => {
                    updated.refund_reason = meta.reason.clone().or(updated.refund_reason);
                    if let Some(actor) = &meta.actor {
                        updated.metadata.insert("refunded_by".to_string(), actor.clone());
                    }
                }
                _ => {
                    if let Some(actor) = &meta.actor {
                        updated.metadata.insert("status_set_by".to_string(), actor.clone());
                    }
                }
            }

            match self.payments.update(updated, expected_version).await {
                Ok(saved) => {
                    info!(
                        payment = %saved.id.as_str(),
                        status = saved.status.display_name(),
                        source = source.display_name(),
                        "payment transitioned"
                    );
                    self.cascade_order(&saved, new_status).await?;
                    return Ok(saved);
                }
                // Lost the race; re-read and re-evaluate.
                Err(StoreError::VersionConflict { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Cascades a payment transition onto its order. `pending` and
    /// `processing` produce no cascade; a cascade that is already applied
    /// is skipped so duplicate transitions cannot double-fire.
    async fn cascade_order(
        &self,
        payment: &Payment,
        new_status: PaymentStatus,
    ) -> PaymentResult<()> {
        let target = match new_status {
            PaymentStatus::Completed => OrderStatus::Paid,
            // The order goes back to awaiting payment.
            PaymentStatus::Failed => OrderStatus::Pending,
            PaymentStatus::Cancelled => OrderStatus::Cancelled,
            PaymentStatus::Refunded => OrderStatus::Refunded,
            PaymentStatus::Pending | PaymentStatus::Processing => return Ok(()),
        };
        let Some(mut order) = self.orders.get(&payment.order_id).await? else {
            warn!(
                payment = %payment.id.as_str(),
                order = %payment.order_id.as_str(),
                "linked order missing during cascade"
            );
            return Ok(());
        };
        if order.status != target {
            order.status = target;
            order.touch();
            self.orders.update(order).await?;
        }
        Ok(())
    }
}
