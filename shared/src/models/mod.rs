//! Data models
//!
//! Shared between the order server and staff clients (via API).
//! Field names match the record store columns.

pub mod invoice;
pub mod menu_item;
pub mod order;
pub mod role;

// Re-exports
pub use invoice::*;
pub use menu_item::*;
pub use order::*;
pub use role::*;
