//! Persistence boundary.
//!
//! The orchestrator and reconciler talk to storage through these traits.
//! Updates to payments are version-checked so status races resolve by
//! optimistic concurrency rather than row locks, which keeps the design
//! portable to non-transactional stores.

pub mod memory;

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::types::order::{CustomerId, Order, OrderId};
use crate::types::payment::{Payment, PaymentId};
use crate::types::webhook::WebhookEventRecord;

pub use memory::{InMemoryOrderStore, InMemoryPaymentStore, InMemoryWebhookEventStore};

/// Order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts a new order.
    async fn insert(&self, order: Order) -> Result<(), StoreError>;
    /// Fetches an order by id.
    async fn get(&self, id: &OrderId) -> Result<Option<Order>, StoreError>;
    /// Replaces an existing order.
    async fn update(&self, order: Order) -> Result<(), StoreError>;
}

/// Payment persistence.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Inserts a new payment. Enforces one non-terminal payment per order
    /// and uniqueness of the provider payment id; a concurrent duplicate
    /// create fails with a conflict instead of silently doubling up.
    async fn insert(&self, payment: Payment) -> Result<(), StoreError>;
    /// Fetches a payment by id.
    async fn get(&self, id: &PaymentId) -> Result<Option<Payment>, StoreError>;
    /// All payments owned by a customer.
    async fn find_by_owner(&self, owner: &CustomerId) -> Result<Vec<Payment>, StoreError>;
    /// The order's non-terminal payment, if one exists.
    async fn find_active_for_order(&self, order_id: &OrderId)
        -> Result<Option<Payment>, StoreError>;
    /// Webhook matching: lookup by provider-assigned payment id.
    async fn find_by_provider_payment_id(&self, id: &str) -> Result<Option<Payment>, StoreError>;
    /// Webhook matching: lookup by provider reference.
    async fn find_by_provider_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, StoreError>;
    /// Version-checked update: succeeds only when the stored version equals
    /// `expected_version`, and returns the stored payment with its version
    /// bumped. A mismatch is [`StoreError::VersionConflict`].
    async fn update(&self, payment: Payment, expected_version: u64)
        -> Result<Payment, StoreError>;
}

/// Append-only webhook audit persistence. Records are never mutated or
/// deleted.
#[async_trait]
pub trait WebhookEventStore: Send + Sync {
    /// Appends an audit record.
    async fn append(&self, record: WebhookEventRecord) -> Result<(), StoreError>;
    /// All records, oldest first.
    async fn all(&self) -> Result<Vec<WebhookEventRecord>, StoreError>;
}
