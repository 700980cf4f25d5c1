//! Card domain: models, persistence and lifecycle management.

pub mod models;
pub mod service;
pub mod store;

pub use models::{Card, CardFilter, CardStatus, CardView, Page, PageRequest, Role, SortDirection, Transfer, User};
pub use service::CardService;
pub use store::CardStore;
