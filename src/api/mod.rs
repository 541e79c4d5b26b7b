//! Request/response contract for the route layer.
//!
//! The HTTP routes themselves live outside this crate; this module is the
//! boundary they call. DTOs follow the wire shape the storefront sends, and
//! errors map to status classes via [`PaymentError::http_status`].


use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{PaymentError, PaymentResult};
use crate::orchestrator::{CreatePaymentCommand, CreatedPayment, PaymentOrchestrator};
use crate::reconciler::WebhookReconciler;
use crate::types::order::{CustomerId, OrderId};
use crate::types::payment::{Payment, PaymentId, PaymentMethod, PaymentStatus};
use crate::types::webhook::WebhookResponse;

/// The authenticated caller, as resolved by the session layer.
#[derive(Debug, Clone)]
pub struct Principal {
    /// Customer identity.
    pub customer_id: CustomerId,
    /// Whether the caller holds the admin role.
    pub is_admin: bool,
}

impl Principal {
    /// A regular customer.
    #[must_use]
    pub fn customer(id: impl Into<String>) -> Self {
        Self { customer_id: CustomerId::new(id), is_admin: false }
    }

    /// An administrator.
    #[must_use]
    pub fn admin(id: impl Into<String>) -> Self {
        Self { customer_id: CustomerId::new(id), is_admin: true }
    }
}

/// Body of `POST /payments`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    /// Order to settle.
    pub order_id: String,
    /// Amount; must equal the order total.
    pub amount: Decimal,
    /// Currency code; AUD only.
    pub currency: String,
    /// Payment rail tag.
    pub payment_method: PaymentMethod,
    /// Method-specific detail payload.
    pub payment_details: Value,
    /// Caller-supplied metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Where to send the receipt.
    pub receipt_email: Option<String>,
}

/// Body of `PUT /payments/{id}` (admin-only override).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentRequest {
    /// Status to drive the payment to.
    pub status: PaymentStatus,
    /// Metadata entries to merge into the payment.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Response for payment creation: the payment plus provider extras the
/// storefront shows the customer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentResponse {
    /// The persisted payment.
    pub payment: Payment,
    /// Human-payable instructions.
    pub instructions: Option<String>,
    /// Hosted payment page, when the rail has one.
    pub redirect_url: Option<String>,
    /// When the payment advice expires.
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<CreatedPayment> for CreatePaymentResponse {
    fn from(created: CreatedPayment) -> Self {
        Self {
            payment: created.payment,
            instructions: created.instructions,
            redirect_url: created.redirect_url,
            expires_at: created.expires_at,
        }
    }
}

/// Facade over the payments core for the route layer.
pub struct PaymentsApi {
    orchestrator: Arc<PaymentOrchestrator>,
    reconciler: Arc<WebhookReconciler>,
}

impl PaymentsApi {
    /// Wires the facade.
    #[must_use]
    pub fn new(orchestrator: Arc<PaymentOrchestrator>, reconciler: Arc<WebhookReconciler>) -> Self {
        Self { orchestrator, reconciler }
    }

    /// `POST /payments` — creates a payment for the caller's order.
    pub async fn create_payment(
        &self,
        request: CreatePaymentRequest,
        principal: &Principal,
    ) -> PaymentResult<CreatePaymentResponse> {
        let command = CreatePaymentCommand {
            order_id: OrderId::new(request.order_id),
            amount: request.amount,
            currency: request.currency,
            method: request.payment_method,
            details: request.payment_details,
            metadata: request.metadata,
            receipt_email: request.receipt_email,
        };
        let created = self.orchestrator.create(command, &principal.customer_id).await?;
        Ok(created.into())
    }

    /// `GET /payments/{id}` — refreshes against the provider and returns
    /// the (possibly updated) payment. Owner or admin only.
    pub async fn get_payment(
        &self,
        payment_id: &str,
        principal: &Principal,
    ) -> PaymentResult<Payment> {
        let payment_id = PaymentId::new(payment_id);
        let payment = self.orchestrator.fetch(&payment_id).await?;
        self.authorize(&payment, principal)?;
        self.orchestrator.refresh_status(&payment_id).await
    }

    /// `PUT /payments/{id}` — admin status/metadata override.
    pub async fn update_payment(
        &self,
        payment_id: &str,
        request: UpdatePaymentRequest,
        principal: &Principal,
    ) -> PaymentResult<Payment> {
        if !principal.is_admin {
            return Err(PaymentError::AdminRequired);
        }
        let payment_id = PaymentId::new(payment_id);
        self.orchestrator
            .override_status(
                &payment_id,
                request.status,
                &principal.customer_id.0,
                request.metadata,
            )
            .await
    }

    /// `DELETE /payments/{id}` — cancels a cancellable payment.
    pub async fn cancel_payment(
        &self,
        payment_id: &str,
        reason: Option<String>,
        principal: &Principal,
    ) -> PaymentResult<Payment> {
        let payment_id = PaymentId::new(payment_id);
        let payment = self.orchestrator.fetch(&payment_id).await?;
        self.authorize(&payment, principal)?;
        self.orchestrator.cancel(&payment_id, &principal.customer_id.0, reason).await
    }

    /// `POST /payments/webhook` — unauthenticated by design; the signature
    /// is the only trust decision and it happens inside the reconciler.
    pub async fn webhook(
        &self,
        raw_body: &[u8],
        headers: &HashMap<String, String>,
    ) -> WebhookResponse {
        self.reconciler.handle(raw_body, headers).await
    }

    fn authorize(&self, payment: &Payment, principal: &Principal) -> PaymentResult<()> {
        if principal.is_admin || payment.customer_id == principal.customer_id {
            Ok(())
        } else {
            Err(PaymentError::NotOwner)
        }
    }
}
