//! Uniform adapter over the four Australian payment rails.
//!
//! Each rail is a strategy behind [`PaymentRail`]; the orchestrator never
//! branches on method beyond selecting one. Provider failures are normalized
//! into [`GatewayError`] so failure handling stays method-agnostic. The real
//! banking protocols sit behind this boundary and are out of scope.

pub mod bank_transfer;
pub mod bpay;
pub mod direct_debit;
pub mod payid;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::GatewayError;
use crate::types::order::Order;
use crate::types::payment::{Payment, PaymentDetails, PaymentMethod, PaymentStatus};

pub use bank_transfer::BankTransferRail;
pub use bpay::BpayRail;
pub use direct_debit::DirectDebitRail;
pub use payid::PayIdRail;

/// Provider response to a successful payment creation.
#[derive(Debug, Clone)]
pub struct GatewayPayment {
    /// Provider-assigned payment id.
    pub provider_payment_id: String,
    /// Provider-assigned reference.
    pub provider_reference: String,
    /// Human-payable instructions for the customer.
    pub instructions: Option<String>,
    /// Hosted page to redirect the customer to, when the rail has one.
    pub redirect_url: Option<String>,
    /// When the payment advice expires.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Provider response to a cancellation request.
#[derive(Debug, Clone)]
pub struct CancelOutcome {
    /// Provider-supplied note, if any.
    pub reason: Option<String>,
}

/// Capability set every rail implements.
#[async_trait]
pub trait PaymentRail: Send + Sync {
    /// Method this rail settles.
    fn method(&self) -> PaymentMethod;

    /// Registers the payment with the provider.
    async fn create(
        &self,
        order: &Order,
        details: &PaymentDetails,
    ) -> Result<GatewayPayment, GatewayError>;

    /// Queries the provider's authoritative status.
    async fn status(&self, payment: &Payment) -> Result<PaymentStatus, GatewayError>;

    /// Asks the provider to cancel the payment.
    async fn cancel(&self, payment: &Payment) -> Result<CancelOutcome, GatewayError>;
}

/// Dispatches to the rail matching a payment method, bounding every provider
/// call with a timeout. A timeout is reported as [`GatewayError::Timeout`];
/// callers treat it like any other gateway failure.
pub struct PaymentGateway {
    rails: Vec<Arc<dyn PaymentRail>>,
    timeout: Duration,
}

impl PaymentGateway {
    /// Builds a gateway over an explicit rail set.
    #[must_use]
    pub fn new(rails: Vec<Arc<dyn PaymentRail>>, timeout: Duration) -> Self {
        Self { rails, timeout }
    }

    /// Gateway with the four built-in rails.
    #[must_use]
    pub fn with_default_rails(timeout: Duration) -> Self {
        Self::new(
            vec![
                Arc::new(BpayRail::new()),
                Arc::new(PayIdRail::new()),
                Arc::new(DirectDebitRail::new()),
                Arc::new(BankTransferRail::new()),
            ],
            timeout,
        )
    }

    fn rail_for(&self, method: PaymentMethod) -> Result<&Arc<dyn PaymentRail>, GatewayError> {
        self.rails.iter().find(|rail| rail.method() == method).ok_or_else(|| {
            GatewayError::Unavailable(format!(
                "no rail configured for {}",
                method.display_name()
            ))
        })
    }

    /// Creates the payment with the provider for the given method.
    pub async fn create(
        &self,
        method: PaymentMethod,
        order: &Order,
        details: &PaymentDetails,
    ) -> Result<GatewayPayment, GatewayError> {
        let rail = self.rail_for(method)?;
        match tokio::time::timeout(self.timeout, rail.create(order, details)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout),
        }
    }

    /// Queries the provider's authoritative status for a payment.
    pub async fn status(&self, payment: &Payment) -> Result<PaymentStatus, GatewayError> {
        let rail = self.rail_for(payment.method)?;
        match tokio::time::timeout(self.timeout, rail.status(payment)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout),
        }
    }

    /// Asks the provider to cancel a payment.
    pub async fn cancel(&self, payment: &Payment) -> Result<CancelOutcome, GatewayError> {
        let rail = self.rail_for(payment.method)?;
        match tokio::time::timeout(self.timeout, rail.cancel(payment)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout),
        }
    }
}

/// Shared guard for rails handed the wrong detail variant. The orchestrator
/// validates before dispatch, so hitting this means a programming error on
/// the caller's side, surfaced as a decline rather than a panic.
fn wrong_details(method: PaymentMethod) -> GatewayError {
    GatewayError::Declined(format!(
        "detail payload does not match the {} rail",
        method.display_name()
    ))
}
