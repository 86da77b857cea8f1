//! Order Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::pricing::{aggregate, LineItem};
use crate::domain::value_objects::{Money, Sku};
use crate::CatalogError;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Address {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "street is required"))]
    pub street1: String,
    #[serde(default)]
    pub street2: Option<String>,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip: String,
    #[validate(length(min = 1, message = "country is required"))]
    pub country: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus { #[default] Pending, Processing, Shipped, Delivered, Cancelled, Refunded }

impl OrderStatus {
    pub fn is_terminal(self) -> bool { matches!(self, Self::Cancelled | Self::Refunded) }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (Self::Delivered, Self::Cancelled) => false,
            _ => true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "Credit Card")]
    CreditCard,
    #[serde(rename = "PayPal")]
    PayPal,
    #[serde(rename = "Bank Transfer")]
    BankTransfer,
    #[serde(rename = "Cash")]
    Cash,
}

/// A placed order. Lines and totals are frozen at placement; only the status
/// moves afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    id: Uuid,
    order_date: DateTime<Utc>,
    status: OrderStatus,
    total_amount: Money,
    shipping_address: Address,
    billing_address: Address,
    payment_method: PaymentMethod,
    lines: BTreeMap<Sku, LineItem>,
    product_ids: Vec<Uuid>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl Order {
    /// Builds an order from lines that have all been resolved already.
    pub fn place(
        lines: Vec<LineItem>,
        shipping_address: Address,
        billing_address: Address,
        payment_method: PaymentMethod,
        currency: &str,
    ) -> crate::Result<Self> {
        if lines.is_empty() {
            return Err(CatalogError::invalid("items", "an order needs at least one line"));
        }
        let totals = aggregate(&lines, currency)?;
        let lines: BTreeMap<_, _> = lines.into_iter().map(|l| (l.sku.clone(), l)).collect();
        let now = Utc::now();
        let mut order = Self {
            id: Uuid::now_v7(), order_date: now, status: OrderStatus::Pending, total_amount: totals.total_amount,
            shipping_address, billing_address, payment_method, lines, product_ids: totals.product_ids,
            updated_at: now, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Placed {
            order_id: order.id, total: order.total_amount.amount(), lines: order.lines.len(),
        }));
        Ok(order)
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn order_date(&self) -> DateTime<Utc> { self.order_date }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn total_amount(&self) -> &Money { &self.total_amount }
    pub fn shipping_address(&self) -> &Address { &self.shipping_address }
    pub fn billing_address(&self) -> &Address { &self.billing_address }
    pub fn payment_method(&self) -> PaymentMethod { self.payment_method }
    pub fn lines(&self) -> &BTreeMap<Sku, LineItem> { &self.lines }
    pub fn product_ids(&self) -> &[Uuid] { &self.product_ids }

    pub fn set_status(&mut self, next: OrderStatus) -> crate::Result<()> {
        if next == self.status { return Ok(()); }
        if !self.status.can_transition_to(next) {
            return Err(CatalogError::InvalidStatusTransition { from: self.status, to: next });
        }
        let from = std::mem::replace(&mut self.status, next);
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id, from, to: next }));
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}
