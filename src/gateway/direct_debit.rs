//! Direct-debit mandate rail.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::GatewayError;
use crate::types::order::Order;
use crate::types::payment::{Payment, PaymentDetails, PaymentMethod, PaymentStatus};

use super::{wrong_details, CancelOutcome, GatewayPayment, PaymentRail};

/// Direct-debit rail. Creation lodges the mandate with the sponsor bank;
/// the first draw settles asynchronously.
#[derive(Debug, Default)]
pub struct DirectDebitRail;

impl DirectDebitRail {
    /// Creates the rail client.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PaymentRail for DirectDebitRail {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::DirectDebit
    }

    async fn create(
        &self,
        _order: &Order,
        details: &PaymentDetails,
    ) -> Result<GatewayPayment, GatewayError> {
        let PaymentDetails::DirectDebit { account_name, bsb, recurrence, .. } = details else {
            return Err(wrong_details(PaymentMethod::DirectDebit));
        };
        let mandate_ref = format!("DDM{}", &Uuid::new_v4().simple().to_string()[..10].to_uppercase());
        let schedule = match recurrence {
            Some(_) => "Recurring draws will follow the agreed schedule.",
            None => "A single draw will be made.",
        };
        Ok(GatewayPayment {
            provider_payment_id: format!("dd_{}", Uuid::new_v4().simple()),
            provider_reference: mandate_ref.clone(),
            instructions: Some(format!(
                "Direct debit mandate {mandate_ref} lodged for {account_name} ({bsb}). {schedule}"
            )),
            redirect_url: None,
            expires_at: None,
        })
    }

    async fn status(&self, payment: &Payment) -> Result<PaymentStatus, GatewayError> {
        Ok(payment.status)
    }

    async fn cancel(&self, _payment: &Payment) -> Result<CancelOutcome, GatewayError> {
        Ok(CancelOutcome { reason: Some("mandate revoked".to_string()) })
    }
}
