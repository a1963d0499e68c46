//! API trait definitions split by responsibility
//!
//! - [`AuthApi`] - Credential exchange
//! - [`CatalogApi`] - Read-only catalog endpoints
//!
//! [`MobdbClient`](super::MobdbClient) implements both; the cache wrapper
//! only needs [`CatalogApi`].

mod auth;
mod catalog;

pub use auth::AuthApi;
pub use catalog::CatalogApi;
