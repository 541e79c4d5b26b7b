//! Order entity and lifecycle status.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::payment::PaymentId;

// ============================================================================
// IDENTIFIERS
// ============================================================================

/// Unique order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl OrderId {
    /// Creates an order ID from an existing value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a new unique order ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("ord_{}", Uuid::new_v4().simple()))
    }

    /// Underlying string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Customer identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl CustomerId {
    /// Creates a customer ID from an existing value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

// ============================================================================
// STATUS
// ============================================================================

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Cart resolved to a total, no payment yet.
    #[default]
    Draft,
    /// Awaiting payment.
    Pending,
    /// Payment completed.
    Paid,
    /// Being prepared for dispatch.
    Processing,
    /// Shipped.
    Shipped,
    /// Delivered.
    Delivered,
    /// Cancelled.
    Cancelled,
    /// Refunded.
    Refunded,
}

impl OrderStatus {
    /// Whether the order is in a final state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Refunded)
    }

    /// Display name.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Pending => "Pending",
            Self::Paid => "Paid",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
            Self::Refunded => "Refunded",
        }
    }
}

// ============================================================================
// ORDER
// ============================================================================

/// Australian postal address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Street line.
    pub line1: String,
    /// Optional second line.
    pub line2: Option<String>,
    /// Suburb.
    pub suburb: String,
    /// State or territory code.
    pub state: String,
    /// Postcode.
    pub postcode: String,
}

/// Line item in an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    /// Product reference.
    pub product_id: String,
    /// Product name at purchase time.
    pub name: String,
    /// Quantity ordered.
    pub quantity: u32,
    /// Unit price.
    pub unit_price: Decimal,
    /// Line total.
    pub total: Decimal,
}

/// A purchasable cart resolved to a total.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order ID.
    pub id: OrderId,
    /// Owning customer.
    pub customer_id: CustomerId,
    /// Line items.
    pub line_items: Vec<OrderLineItem>,
    /// Sum of line totals.
    pub subtotal: Decimal,
    /// GST.
    pub tax: Decimal,
    /// Discount applied.
    pub discount: Decimal,
    /// Grand total; immutable once a payment has been created.
    pub total: Decimal,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Shipping address.
    pub shipping_address: Address,
    /// Billing address, if different from shipping.
    pub billing_address: Option<Address>,
    /// Linked payment, set when one is created.
    pub payment_id: Option<PaymentId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a draft order. The total is derived from the parts so the
    /// totals invariant holds by construction.
    #[must_use]
    pub fn new(
        customer_id: CustomerId,
        line_items: Vec<OrderLineItem>,
        subtotal: Decimal,
        tax: Decimal,
        discount: Decimal,
        shipping_address: Address,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::generate(),
            customer_id,
            line_items,
            subtotal,
            tax,
            discount,
            total: subtotal + tax - discount,
            status: OrderStatus::Draft,
            shipping_address,
            billing_address: None,
            payment_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `total == subtotal + tax - discount`.
    #[must_use]
    pub fn totals_consistent(&self) -> bool {
        self.total == self.subtotal + self.tax - self.discount
    }

    /// Updates the modification timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
