//! BPAY rail.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::GatewayError;
use crate::types::order::Order;
use crate::types::payment::{Payment, PaymentDetails, PaymentMethod, PaymentStatus};

use super::{wrong_details, CancelOutcome, GatewayPayment, PaymentRail};

/// BPAY bill-payment rail. The customer pays through their own bank using a
/// biller code and customer reference number, so creation returns payable
/// instructions rather than a redirect.
#[derive(Debug, Default)]
pub struct BpayRail;

impl BpayRail {
    /// Creates the rail client.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PaymentRail for BpayRail {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Bpay
    }

    async fn create(
        &self,
        _order: &Order,
        details: &PaymentDetails,
    ) -> Result<GatewayPayment, GatewayError> {
        let PaymentDetails::Bpay { biller_code, reference, expires_at, .. } = details else {
            return Err(wrong_details(PaymentMethod::Bpay));
        };
        Ok(GatewayPayment {
            provider_payment_id: format!("bpay_{}", Uuid::new_v4().simple()),
            provider_reference: reference.clone(),
            instructions: Some(format!(
                "Pay with BPAY from your internet banking: Biller Code {biller_code}, Ref {reference}."
            )),
            redirect_url: None,
            expires_at: Some(*expires_at),
        })
    }

    async fn status(&self, payment: &Payment) -> Result<PaymentStatus, GatewayError> {
        // Settlement is reported over webhooks; the poll echoes the last
        // known state until the provider advances it.
        Ok(payment.status)
    }

    async fn cancel(&self, _payment: &Payment) -> Result<CancelOutcome, GatewayError> {
        Ok(CancelOutcome { reason: Some("BPAY advice withdrawn".to_string()) })
    }
}
