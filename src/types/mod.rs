//! Core entity types: orders, payments, webhook audit records.

pub mod order;
pub mod payment;
pub mod webhook;

pub use order::{Address, CustomerId, Order, OrderId, OrderLineItem, OrderStatus};
pub use payment::{
    Payment, PaymentDetails, PaymentId, PaymentMethod, PaymentStatus, PayIdType, RecurrenceSchedule,
    StatusSource,
};
pub use webhook::{MatchStrategy, WebhookEventId, WebhookEventRecord, WebhookResponse};
