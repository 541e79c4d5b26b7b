//! Manual bank-transfer rail.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::errors::GatewayError;
use crate::types::order::Order;
use crate::types::payment::{Payment, PaymentDetails, PaymentMethod, PaymentStatus};

use super::{wrong_details, CancelOutcome, GatewayPayment, PaymentRail};

/// Days a manual transfer is waited on before the advice lapses.
const TRANSFER_EXPIRY_DAYS: i64 = 3;

/// Settlement account transfers are reconciled against.
const SETTLEMENT_BSB: &str = "062-000";
const SETTLEMENT_ACCOUNT: &str = "11223344";

/// Manual bank-transfer rail. The customer pushes funds from their own bank;
/// reconciliation happens when the deposit lands.
#[derive(Debug, Default)]
pub struct BankTransferRail;

impl BankTransferRail {
    /// Creates the rail client.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PaymentRail for BankTransferRail {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::BankTransfer
    }

    async fn create(
        &self,
        _order: &Order,
        details: &PaymentDetails,
    ) -> Result<GatewayPayment, GatewayError> {
        let PaymentDetails::BankTransfer { amount, reference, .. } = details else {
            return Err(wrong_details(PaymentMethod::BankTransfer));
        };
        Ok(GatewayPayment {
            provider_payment_id: format!("bt_{}", Uuid::new_v4().simple()),
            provider_reference: reference.clone(),
            instructions: Some(format!(
                "Transfer {amount} AUD to BSB {SETTLEMENT_BSB}, account {SETTLEMENT_ACCOUNT}, \
                 using reference {reference}."
            )),
            redirect_url: None,
            expires_at: Some(Utc::now() + Duration::days(TRANSFER_EXPIRY_DAYS)),
        })
    }

    async fn status(&self, payment: &Payment) -> Result<PaymentStatus, GatewayError> {
        Ok(payment.status)
    }

    async fn cancel(&self, _payment: &Payment) -> Result<CancelOutcome, GatewayError> {
        Ok(CancelOutcome { reason: Some("transfer advice withdrawn".to_string()) })
    }
}
