//! Domain events
use crate::domain::aggregates::OrderStatus;
use crate::domain::value_objects::Sku;
use crate::domain::variants::VariantLifecycle;
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    Product(ProductEvent),
    Cart(CartEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ProductEvent {
    Created { product_id: Uuid, sku: Sku, variant_count: usize },
    Edited { product_id: Uuid, sku: Sku },
    VariantsRegenerated { product_id: Uuid, lifecycle: VariantLifecycle, added: usize, removed: usize, preserved: usize },
}

#[derive(Clone, Debug, PartialEq)]
pub enum CartEvent {
    LineUpserted { user_identifier: String, sku: Sku, quantity: u32 },
    LineRemoved { user_identifier: String, sku: Sku },
    Repriced { user_identifier: String, total: Decimal },
}

#[derive(Clone, Debug, PartialEq)]
pub enum OrderEvent {
    Placed { order_id: Uuid, total: Decimal, lines: usize },
    StatusChanged { order_id: Uuid, from: OrderStatus, to: OrderStatus },
}

/// Logs drained events; the storefront has no event bus of its own.
pub fn log_events(events: &[DomainEvent]) {
    for event in events {
        match event {
            DomainEvent::Product(ProductEvent::Created { product_id, sku, variant_count }) => {
                tracing::info!(%product_id, %sku, variant_count, "product created");
            }
            DomainEvent::Product(ProductEvent::Edited { product_id, sku }) => {
                tracing::info!(%product_id, %sku, "product edited");
            }
            DomainEvent::Product(ProductEvent::VariantsRegenerated { product_id, lifecycle, added, removed, preserved }) => {
                tracing::info!(%product_id, %lifecycle, added, removed, preserved, "variants regenerated");
            }
            DomainEvent::Cart(CartEvent::LineUpserted { user_identifier, sku, quantity }) => {
                tracing::debug!(user = %user_identifier, %sku, quantity, "cart line upserted");
            }
            DomainEvent::Cart(CartEvent::LineRemoved { user_identifier, sku }) => {
                tracing::debug!(user = %user_identifier, %sku, "cart line removed");
            }
            DomainEvent::Cart(CartEvent::Repriced { user_identifier, total }) => {
                tracing::debug!(user = %user_identifier, %total, "cart repriced");
            }
            DomainEvent::Order(OrderEvent::Placed { order_id, total, lines }) => {
                tracing::info!(%order_id, %total, lines, "order placed");
            }
            DomainEvent::Order(OrderEvent::StatusChanged { order_id, from, to }) => {
                tracing::info!(%order_id, ?from, ?to, "order status changed");
            }
        }
    }
}
