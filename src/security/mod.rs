//! Webhook authentication and at-rest credential protection.

pub mod signature;
pub mod vault;

pub use signature::{timestamp_verdict, SignatureVerifier, TimestampVerdict};
pub use vault::CredentialVault;
