//! In-memory store implementations backing tests and local development.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::types::order::{CustomerId, Order, OrderId};
use crate::types::payment::{Payment, PaymentId};
use crate::types::webhook::WebhookEventRecord;

use super::{OrderStore, PaymentStore, WebhookEventStore};

/// In-memory order store.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<Mutex<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<(), StoreError> {
        let mut orders = self.orders.lock().map_err(|_| StoreError::Lock)?;
        orders.insert(order.id.clone(), order);
        Ok(())
    }

    async fn get(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
        let orders = self.orders.lock().map_err(|_| StoreError::Lock)?;
        Ok(orders.get(id).cloned())
    }

    async fn update(&self, order: Order) -> Result<(), StoreError> {
        let mut orders = self.orders.lock().map_err(|_| StoreError::Lock)?;
        if !orders.contains_key(&order.id) {
            return Err(StoreError::NotFound(order.id.0.clone()));
        }
        orders.insert(order.id.clone(), order);
        Ok(())
    }
}

/// In-memory payment store with the secondary indexes webhook matching
/// needs, plus the one-active-payment-per-order uniqueness constraint.
#[derive(Debug, Default)]
pub struct InMemoryPaymentStore {
    payments: Arc<Mutex<PaymentTables>>,
}

#[derive(Debug, Default)]
struct PaymentTables {
    by_id: HashMap<PaymentId, Payment>,
    by_order: HashMap<OrderId, Vec<PaymentId>>,
    by_provider_id: HashMap<String, PaymentId>,
    by_provider_reference: HashMap<String, PaymentId>,
}

impl InMemoryPaymentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, payment: Payment) -> Result<(), StoreError> {
        let mut tables = self.payments.lock().map_err(|_| StoreError::Lock)?;

        let has_active = tables
            .by_order
            .get(&payment.order_id)
            .into_iter()
            .flatten()
            .filter_map(|id| tables.by_id.get(id))
            .any(|existing| !existing.status.is_terminal());
        if has_active {
            return Err(StoreError::DuplicateActivePayment {
                order_id: payment.order_id.0.clone(),
            });
        }

        if let Some(provider_id) = &payment.provider_payment_id {
            if tables.by_provider_id.contains_key(provider_id) {
                return Err(StoreError::DuplicateProviderId(provider_id.clone()));
            }
            tables.by_provider_id.insert(provider_id.clone(), payment.id.clone());
        }
        if let Some(reference) = &payment.provider_reference {
            tables.by_provider_reference.insert(reference.clone(), payment.id.clone());
        }
        tables
            .by_order
            .entry(payment.order_id.clone())
            .or_default()
            .push(payment.id.clone());
        tables.by_id.insert(payment.id.clone(), payment);
        Ok(())
    }

    async fn get(&self, id: &PaymentId) -> Result<Option<Payment>, StoreError> {
        let tables = self.payments.lock().map_err(|_| StoreError::Lock)?;
        Ok(tables.by_id.get(id).cloned())
    }

    async fn find_by_owner(&self, owner: &CustomerId) -> Result<Vec<Payment>, StoreError> {
        let tables = self.payments.lock().map_err(|_| StoreError::Lock)?;
        let mut payments: Vec<Payment> =
            tables.by_id.values().filter(|p| &p.customer_id == owner).cloned().collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }

    async fn find_active_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<Payment>, StoreError> {
        let tables = self.payments.lock().map_err(|_| StoreError::Lock)?;
        Ok(tables
            .by_order
            .get(order_id)
            .into_iter()
            .flatten()
            .filter_map(|id| tables.by_id.get(id))
            .find(|p| !p.status.is_terminal())
            .cloned())
    }

    async fn find_by_provider_payment_id(&self, id: &str) -> Result<Option<Payment>, StoreError> {
        let tables = self.payments.lock().map_err(|_| StoreError::Lock)?;
        Ok(tables.by_provider_id.get(id).and_then(|pid| tables.by_id.get(pid)).cloned())
    }

    async fn find_by_provider_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, StoreError> {
        let tables = self.payments.lock().map_err(|_| StoreError::Lock)?;
        Ok(tables
            .by_provider_reference
            .get(reference)
            .and_then(|pid| tables.by_id.get(pid))
            .cloned())
    }

    async fn update(
        &self,
        mut payment: Payment,
        expected_version: u64,
    ) -> Result<Payment, StoreError> {
        let mut tables = self.payments.lock().map_err(|_| StoreError::Lock)?;
        let stored = tables
            .by_id
            .get(&payment.id)
            .ok_or_else(|| StoreError::NotFound(payment.id.0.clone()))?;
        if stored.version != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                found: stored.version,
            });
        }
        payment.version = expected_version + 1;
        tables.by_id.insert(payment.id.clone(), payment.clone());
        Ok(payment)
    }
}

/// In-memory append-only webhook audit log.
#[derive(Debug, Default)]
pub struct InMemoryWebhookEventStore {
    records: Arc<Mutex<Vec<WebhookEventRecord>>>,
}

impl InMemoryWebhookEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WebhookEventStore for InMemoryWebhookEventStore {
    async fn append(&self, record: WebhookEventRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().map_err(|_| StoreError::Lock)?;
        records.push(record);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<WebhookEventRecord>, StoreError> {
        let records = self.records.lock().map_err(|_| StoreError::Lock)?;
        Ok(records.clone())
    }
}
