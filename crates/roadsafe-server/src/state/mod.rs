//! Shared server state.

pub mod alerts;
pub mod hub;
pub mod store;

pub use alerts::AlertRegistry;
pub use hub::ConnectionHub;
pub use store::AppState;
