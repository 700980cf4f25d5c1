//! Atomic money movement between two cards.

pub mod engine;
pub mod store;

pub use engine::TransferEngine;
pub use store::TransferStore;
