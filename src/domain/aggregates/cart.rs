//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::events::{CartEvent, DomainEvent};
use crate::domain::pricing::{aggregate, LineItem};
use crate::domain::value_objects::{Money, Sku};

/// One cart per user identifier (signed-in user or anonymous session).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cart {
    user_identifier: String,
    lines: BTreeMap<Sku, LineItem>,
    total_amount: Money,
    product_ids: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl Cart {
    pub fn new(user_identifier: impl Into<String>, currency: &str) -> Self {
        let now = Utc::now();
        Self {
            user_identifier: user_identifier.into(), lines: BTreeMap::new(), total_amount: Money::zero(currency),
            product_ids: vec![], created_at: now, updated_at: now, events: vec![],
        }
    }

    pub fn user_identifier(&self) -> &str { &self.user_identifier }
    pub fn lines(&self) -> &BTreeMap<Sku, LineItem> { &self.lines }
    pub fn line(&self, sku: &Sku) -> Option<&LineItem> { self.lines.get(sku) }
    pub fn total_amount(&self) -> &Money { &self.total_amount }
    pub fn product_ids(&self) -> &[Uuid] { &self.product_ids }
    pub fn item_count(&self) -> usize { self.lines.len() }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Inserts or replaces the line for `line.sku`.
    pub fn upsert_line(&mut self, line: LineItem) -> crate::Result<()> {
        let (sku, quantity) = (line.sku.clone(), line.quantity.value());
        let mut lines = self.lines.clone();
        lines.insert(sku.clone(), line);
        self.commit(lines)?;
        self.raise_event(DomainEvent::Cart(CartEvent::LineUpserted { user_identifier: self.user_identifier.clone(), sku, quantity }));
        Ok(())
    }

    /// Removes the line for `sku`; returns whether it existed.
    pub fn remove_line(&mut self, sku: &Sku) -> crate::Result<bool> {
        let mut lines = self.lines.clone();
        if lines.remove(sku).is_none() {
            return Ok(false);
        }
        self.commit(lines)?;
        self.raise_event(DomainEvent::Cart(CartEvent::LineRemoved { user_identifier: self.user_identifier.clone(), sku: sku.clone() }));
        Ok(true)
    }

    /// Swaps in freshly resolved lines, keeping any line not in `fresh`.
    pub fn reprice(&mut self, fresh: Vec<LineItem>) -> crate::Result<()> {
        let mut lines = self.lines.clone();
        lines.extend(fresh.into_iter().map(|line| (line.sku.clone(), line)));
        self.commit(lines)?;
        self.raise_event(DomainEvent::Cart(CartEvent::Repriced {
            user_identifier: self.user_identifier.clone(), total: self.total_amount.amount(),
        }));
        Ok(())
    }

    pub fn clear(&mut self) -> crate::Result<()> { self.commit(BTreeMap::new()) }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }

    // Totals are computed before anything is replaced, so a failure leaves the cart as it was.
    fn commit(&mut self, lines: BTreeMap<Sku, LineItem>) -> crate::Result<()> {
        let totals = aggregate(lines.values(), self.total_amount.currency())?;
        self.lines = lines;
        self.total_amount = totals.total_amount;
        self.product_ids = totals.product_ids;
        self.updated_at = Utc::now();
        Ok(())
    }
}
