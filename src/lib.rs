//! card_ledger - Bank-card ledger and transfer subsystem
//!
//! Manages card accounts and money movement between them for an
//! authenticated holder. HTTP routing, authentication and authorization are
//! external collaborators; they hand this crate an already-authenticated
//! [`cards::models::User`] and map the returned [`error::LedgerError`] kinds
//! to transport statuses.
//!
//! # Modules
//!
//! - [`crypto`] - Identity cipher: blind index + reversible at-rest encryption
//! - [`cards`] - Card models, store and lifecycle manager
//! - [`transfer`] - Atomic two-card transfer engine and transfer store
//! - [`users`] - Owner reference lookups
//! - [`db`] - PostgreSQL pool and migrations
//! - [`config`] / [`logging`] - Startup configuration and tracing setup

pub mod cards;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod logging;
pub mod transfer;
pub mod users;

// Convenient re-exports at crate root
pub use cards::{Card, CardFilter, CardService, CardStatus, CardStore, CardView, Page, PageRequest, Role, User};
pub use config::{load_config, AppConfig};
pub use crypto::{mask_card_number, CardIdentity, IdentityCipher};
pub use db::Database;
pub use error::LedgerError;
pub use transfer::{TransferEngine, TransferStore};
pub use users::UserStore;
