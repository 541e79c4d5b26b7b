//! Error types for the payments core.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::payment::{PaymentMethod, PaymentStatus};
use crate::validation::FieldError;

/// Result type used throughout the payments core.
pub type PaymentResult<T> = Result<T, PaymentError>;

/// Payment lifecycle errors.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// One or more payment detail fields failed structural validation.
    #[error("validation failed: {}", format_fields(.0))]
    Validation(Vec<FieldError>),
    /// Detail payload shape does not match the declared payment method.
    #[error("payment details do not match method {}: {reason}", method.display_name())]
    DetailMismatch {
        /// Declared method tag.
        method: PaymentMethod,
        /// Deserialization failure detail.
        reason: String,
    },
    /// Only the local currency is accepted.
    #[error("unsupported currency: {currency}")]
    UnsupportedCurrency {
        /// Currency code supplied by the caller.
        currency: String,
    },
    /// Payment amount does not equal the order total.
    #[error("amount mismatch: order total is {expected}, payment amount is {got}")]
    AmountMismatch {
        /// The order total.
        expected: Decimal,
        /// The amount supplied by the caller.
        got: Decimal,
    },
    /// Order does not exist.
    #[error("order not found: {0}")]
    OrderNotFound(String),
    /// Payment does not exist.
    #[error("payment not found: {0}")]
    PaymentNotFound(String),
    /// Caller does not own the resource.
    #[error("caller does not own this resource")]
    NotOwner,
    /// Operation requires an administrator.
    #[error("administrator access required")]
    AdminRequired,
    /// Requested operation is not valid for the payment's current status.
    #[error("invalid state transition: payment is {}", current.display_name())]
    InvalidStateTransition {
        /// Status at the time of the request.
        current: PaymentStatus,
    },
    /// The order already has a live payment attached.
    #[error("order {order_id} already has a {} payment", existing_status.display_name())]
    DuplicatePayment {
        /// Order in conflict.
        order_id: String,
        /// Status of the payment already attached.
        existing_status: PaymentStatus,
    },
    /// Provider-side failure.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Missing or malformed configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PaymentError {
    /// HTTP status class the route layer should answer with.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_)
            | Self::DetailMismatch { .. }
            | Self::UnsupportedCurrency { .. }
            | Self::AmountMismatch { .. }
            | Self::InvalidStateTransition { .. } => 400,
            Self::NotOwner | Self::AdminRequired => 403,
            Self::OrderNotFound(_) | Self::PaymentNotFound(_) => 404,
            Self::DuplicatePayment { .. } => 409,
            Self::Gateway(GatewayError::Timeout) => 504,
            Self::Gateway(_) => 502,
            Self::Store(e) => e.http_status(),
            Self::Config(_) => 500,
        }
    }
}

fn format_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Normalized provider failure. Every rail maps its own failure modes into
/// this shape so the orchestrator's handling stays method-agnostic.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Provider call exceeded the configured deadline.
    #[error("gateway call timed out")]
    Timeout,
    /// Provider rejected the request.
    #[error("gateway declined: {0}")]
    Declined(String),
    /// Provider unreachable or no rail configured for the method.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    /// Whether the caller may retry the same request.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Unavailable(_))
    }
}

/// Persistence failures.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A store lock was poisoned.
    #[error("failed to acquire store lock")]
    Lock,
    /// Version-checked update lost an optimistic-concurrency race.
    #[error("version conflict: expected {expected}, found {found}")]
    VersionConflict {
        /// Version the caller read.
        expected: u64,
        /// Version currently stored.
        found: u64,
    },
    /// Uniqueness violation: one non-terminal payment per order.
    #[error("order {order_id} already has an active payment")]
    DuplicateActivePayment {
        /// Order in conflict.
        order_id: String,
    },
    /// Uniqueness violation on the provider-assigned payment id.
    #[error("provider payment id already recorded: {0}")]
    DuplicateProviderId(String),
    /// Record to update does not exist.
    #[error("record not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// HTTP status class for this failure.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::VersionConflict { .. }
            | Self::DuplicateActivePayment { .. }
            | Self::DuplicateProviderId(_) => 409,
            Self::NotFound(_) => 404,
            Self::Lock => 500,
        }
    }
}

/// Startup configuration errors. These are fatal: the process must not serve
/// traffic with a missing webhook secret or vault key.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// No webhook shared secret configured for a provider.
    #[error("missing webhook secret: {0}")]
    MissingWebhookSecret(String),
    /// Webhook secret present but empty.
    #[error("webhook secret for {0} is empty")]
    EmptyWebhookSecret(String),
    /// No vault encryption key configured.
    #[error("missing vault encryption key")]
    MissingEncryptionKey,
    /// Vault key is not a 64-character hex string.
    #[error("invalid vault encryption key: {0}")]
    InvalidEncryptionKey(String),
}

/// Credential vault failures.
#[derive(Debug, Clone, Error)]
pub enum VaultError {
    /// Stored value is not valid vault output.
    #[error("stored ciphertext is malformed")]
    InvalidCiphertext,
    /// Authentication tag check failed; wrong key or tampered data.
    #[error("decryption failed")]
    DecryptionFailed,
    /// Cipher could not seal the payload.
    #[error("encryption failed")]
    EncryptionFailed,
}
