//! Payment entity, method details and the status state machine.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::order::{CustomerId, OrderId};

// ============================================================================
// IDENTIFIERS
// ============================================================================

/// Unique payment identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentId(pub String);

impl PaymentId {
    /// Creates a payment ID from an existing value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a new unique payment ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("pay_{}", Uuid::new_v4().simple()))
    }

    /// Underlying string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// STATUS STATE MACHINE
// ============================================================================

/// Canonical payment status, distinct from each provider's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Created with the provider, awaiting settlement.
    #[default]
    Pending,
    /// Provider reported the payment in flight.
    Processing,
    /// Settled.
    Completed,
    /// Provider reported failure.
    Failed,
    /// Cancelled before settlement.
    Cancelled,
    /// Refunded after settlement.
    Refunded,
}

impl PaymentStatus {
    /// Whether the status admits no further transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Cancelled | Self::Refunded)
    }

    /// Whether the payment can still be cancelled.
    #[must_use]
    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    /// Valid forward edges of the state machine. Anything else is a stale
    /// or duplicate report and is ignored rather than raised.
    #[must_use]
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        match self {
            Self::Pending => matches!(
                next,
                Self::Processing | Self::Completed | Self::Failed | Self::Cancelled
            ),
            Self::Processing => matches!(next, Self::Completed | Self::Failed | Self::Cancelled),
            Self::Completed => matches!(next, Self::Refunded),
            Self::Failed | Self::Cancelled | Self::Refunded => false,
        }
    }

    /// Display name.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
            Self::Refunded => "Refunded",
        }
    }
}

/// Which path drove a status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusSource {
    /// Inbound provider webhook.
    Webhook,
    /// Synchronous status poll of the provider.
    Poll,
    /// Administrator override.
    Admin,
    /// Customer or administrator cancellation.
    Cancel,
}

impl StatusSource {
    /// Display name.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Webhook => "webhook",
            Self::Poll => "poll",
            Self::Admin => "admin",
            Self::Cancel => "cancel",
        }
    }
}

// ============================================================================
// PAYMENT METHODS AND DETAILS
// ============================================================================

/// The four supported Australian payment rails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// BPAY bill payment.
    Bpay,
    /// PayID instant payment.
    Payid,
    /// Direct-debit mandate.
    DirectDebit,
    /// Manual bank transfer.
    BankTransfer,
}

impl PaymentMethod {
    /// Wire tag for this method.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bpay => "bpay",
            Self::Payid => "payid",
            Self::DirectDebit => "direct_debit",
            Self::BankTransfer => "bank_transfer",
        }
    }

    /// Parses a wire tag, e.g. from a webhook payload.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "bpay" => Some(Self::Bpay),
            "payid" => Some(Self::Payid),
            "direct_debit" => Some(Self::DirectDebit),
            "bank_transfer" => Some(Self::BankTransfer),
            _ => None,
        }
    }

    /// Display name.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Bpay => "BPAY",
            Self::Payid => "PayID",
            Self::DirectDebit => "Direct Debit",
            Self::BankTransfer => "Bank Transfer",
        }
    }
}

/// PayID addressing scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayIdType {
    /// Phone number.
    Phone,
    /// Email address.
    Email,
    /// Australian Business Number.
    Abn,
    /// Organisation identifier.
    OrgIdentifier,
}

/// Direct-debit recurrence frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceFrequency {
    /// Weekly.
    Weekly,
    /// Fortnightly.
    Fortnightly,
    /// Monthly.
    Monthly,
    /// Quarterly.
    Quarterly,
}

/// Optional recurrence attached to a direct-debit mandate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceSchedule {
    /// How often to draw.
    pub frequency: RecurrenceFrequency,
    /// First draw date.
    pub start_date: NaiveDate,
    /// Optional final date; must fall after the start date.
    pub end_date: Option<NaiveDate>,
    /// Optional cap on total draws.
    pub max_payments: Option<u32>,
}

/// Method-specific detail payload. Closed sum keyed by the method tag, so
/// adding a fifth rail is a compile-time-checked exercise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentDetails {
    /// BPAY biller code plus customer reference.
    #[serde(rename_all = "camelCase")]
    Bpay {
        /// Biller code, 3-10 digits.
        biller_code: String,
        /// Customer reference number, 6-20 characters.
        reference: String,
        /// Amount payable.
        amount: Decimal,
        /// When the BPAY advice expires.
        expires_at: DateTime<Utc>,
    },
    /// PayID target.
    #[serde(rename_all = "camelCase")]
    Payid {
        /// PayID identifier (phone, email, ABN or org id).
        identifier: String,
        /// Identifier scheme.
        payid_type: PayIdType,
        /// Amount payable.
        amount: Decimal,
        /// Free-text description shown to the payer, up to 280 characters.
        description: Option<String>,
    },
    /// Pre-authorised recurring withdrawal mandate.
    #[serde(rename_all = "camelCase")]
    DirectDebit {
        /// Account holder name.
        account_name: String,
        /// BSB in `NNN-NNN` form.
        bsb: String,
        /// Account number, 6-10 digits.
        account_number: String,
        /// Amount per draw.
        amount: Decimal,
        /// Optional recurrence schedule.
        recurrence: Option<RecurrenceSchedule>,
    },
    /// Manual bank transfer.
    #[serde(rename_all = "camelCase")]
    BankTransfer {
        /// Account holder name.
        account_name: String,
        /// BSB in `NNN-NNN` form.
        bsb: String,
        /// Account number, 6-10 digits.
        account_number: String,
        /// Amount payable.
        amount: Decimal,
        /// Transfer reference, 3-18 characters.
        reference: String,
    },
}

impl PaymentDetails {
    /// The method this payload belongs to.
    #[must_use]
    pub fn method(&self) -> PaymentMethod {
        match self {
            Self::Bpay { .. } => PaymentMethod::Bpay,
            Self::Payid { .. } => PaymentMethod::Payid,
            Self::DirectDebit { .. } => PaymentMethod::DirectDebit,
            Self::BankTransfer { .. } => PaymentMethod::BankTransfer,
        }
    }

    /// Amount carried inside the detail payload.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        match self {
            Self::Bpay { amount, .. }
            | Self::Payid { amount, .. }
            | Self::DirectDebit { amount, .. }
            | Self::BankTransfer { amount, .. } => *amount,
        }
    }
}

// ============================================================================
// PAYMENT
// ============================================================================

/// One recorded status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentHistoryEvent {
    /// Status before the transition.
    pub previous_status: PaymentStatus,
    /// Status after the transition.
    pub new_status: PaymentStatus,
    /// Path that drove the transition.
    pub source: StatusSource,
    /// When it was applied.
    pub occurred_at: DateTime<Utc>,
}

/// One attempt to settle an order via one of the four rails.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Payment ID.
    pub id: PaymentId,
    /// Owning customer.
    pub customer_id: CustomerId,
    /// Order this payment settles.
    pub order_id: OrderId,
    /// Amount; equals the order total at creation time.
    pub amount: Decimal,
    /// Currency code. AUD only.
    pub currency: String,
    /// Canonical status.
    pub status: PaymentStatus,
    /// Method tag.
    pub method: PaymentMethod,
    /// Method-specific details.
    pub details: PaymentDetails,
    /// Provider-assigned payment id.
    pub provider_payment_id: Option<String>,
    /// Provider-assigned reference.
    pub provider_reference: Option<String>,
    /// Free-form metadata (provider extras, acting users).
    pub metadata: HashMap<String, String>,
    /// Receipt number shown to the customer.
    pub receipt_number: String,
    /// Where to send the receipt.
    pub receipt_email: Option<String>,
    /// Why the payment was cancelled, if it was.
    pub cancellation_reason: Option<String>,
    /// Why the payment was refunded, if it was.
    pub refund_reason: Option<String>,
    /// Transition history.
    pub history: Vec<PaymentHistoryEvent>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Set when the payment completes.
    pub completed_at: Option<DateTime<Utc>>,
    /// Set when the payment is refunded.
    pub refunded_at: Option<DateTime<Utc>>,
    /// Optimistic-concurrency version; incremented by the store on update.
    pub version: u64,
}

impl Payment {
    /// Creates a pending payment for an order.
    #[must_use]
    pub fn new(
        order_id: OrderId,
        customer_id: CustomerId,
        amount: Decimal,
        currency: impl Into<String>,
        details: PaymentDetails,
        metadata: HashMap<String, String>,
        receipt_email: Option<String>,
    ) -> Self {
        let now = Utc::now();
        let id = PaymentId::generate();
        let receipt_number = format!("WP-{}", &id.0[4..12].to_uppercase());
        Self {
            method: details.method(),
            id,
            customer_id,
            order_id,
            amount,
            currency: currency.into(),
            status: PaymentStatus::Pending,
            details,
            provider_payment_id: None,
            provider_reference: None,
            metadata,
            receipt_number,
            receipt_email,
            cancellation_reason: None,
            refund_reason: None,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
            refunded_at: None,
            version: 0,
        }
    }

    /// Records a transition that has already been checked against the
    /// state machine: updates status, timestamps and the history trail.
    pub fn record_transition(
        &mut self,
        new_status: PaymentStatus,
        source: StatusSource,
        now: DateTime<Utc>,
    ) {
        self.history.push(PaymentHistoryEvent {
            previous_status: self.status,
            new_status,
            source,
            occurred_at: now,
        });
        self.status = new_status;
        self.updated_at = now;
        match new_status {
            PaymentStatus::Completed => self.completed_at = Some(now),
            PaymentStatus::Refunded => self.refunded_at = Some(now),
            _ => {}
        }
    }
}
