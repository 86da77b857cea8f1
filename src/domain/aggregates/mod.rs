//! Aggregates module
pub mod cart;
pub mod order;
pub mod product;
pub mod taxonomy;

pub use cart::Cart;
pub use order::{Address, Order, OrderStatus, PaymentMethod};
pub use product::{Product, ProductDraft, ProductKind};
pub use taxonomy::{Category, Tag};
