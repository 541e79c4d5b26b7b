//! PayID rail.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::errors::GatewayError;
use crate::types::order::Order;
use crate::types::payment::{Payment, PaymentDetails, PaymentMethod, PaymentStatus};

use super::{wrong_details, CancelOutcome, GatewayPayment, PaymentRail};

/// Window a PayID request stays payable.
const PAYID_EXPIRY_HOURS: i64 = 24;

/// PayID instant-payment rail.
#[derive(Debug, Default)]
pub struct PayIdRail;

impl PayIdRail {
    /// Creates the rail client.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PaymentRail for PayIdRail {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Payid
    }

    async fn create(
        &self,
        order: &Order,
        details: &PaymentDetails,
    ) -> Result<GatewayPayment, GatewayError> {
        let PaymentDetails::Payid { identifier, amount, .. } = details else {
            return Err(wrong_details(PaymentMethod::Payid));
        };
        let reference = format!("PID{}", &Uuid::new_v4().simple().to_string()[..10].to_uppercase());
        Ok(GatewayPayment {
            provider_payment_id: format!("payid_{}", Uuid::new_v4().simple()),
            provider_reference: reference.clone(),
            instructions: Some(format!(
                "Send {amount} AUD to PayID {identifier} with reference {reference} for order {}.",
                order.id.as_str()
            )),
            redirect_url: None,
            expires_at: Some(Utc::now() + Duration::hours(PAYID_EXPIRY_HOURS)),
        })
    }

    async fn status(&self, payment: &Payment) -> Result<PaymentStatus, GatewayError> {
        Ok(payment.status)
    }

    async fn cancel(&self, _payment: &Payment) -> Result<CancelOutcome, GatewayError> {
        Ok(CancelOutcome { reason: Some("PayID request withdrawn".to_string()) })
    }
}
