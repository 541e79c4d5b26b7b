//! # wattpay
//!
//! Payment transaction lifecycle and webhook verification for an Australian
//! home-battery storefront: payment creation across four local rails (BPAY,
//! PayID, direct-debit mandate, manual bank transfer), a monotonic payment
//! state machine with order cascades, cryptographically authenticated
//! webhook reconciliation, and an append-only delivery audit trail.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::uninlined_format_args)]

pub mod api;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod orchestrator;
pub mod reconciler;
pub mod security;
pub mod store;
pub mod types;
pub mod validation;

// Re-exports for the public API
pub use api::{PaymentsApi, Principal};
pub use config::{PaymentConfig, ProviderConfig};
pub use errors::{PaymentError, PaymentResult};
pub use orchestrator::PaymentOrchestrator;
pub use reconciler::WebhookReconciler;
pub use security::{CredentialVault, SignatureVerifier};
