//! Domain layer: value objects, option normalization, variant generation,
//! pricing and the product/cart/order aggregates.

pub mod aggregates;
pub mod events;
pub mod options;
pub mod pricing;
pub mod value_objects;
pub mod variants;
