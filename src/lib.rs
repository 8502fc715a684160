//! Cached API access and paginated table state for right-to-left
//! administrative clients.
//!
//! [`infra::http::ApiClient`] serves repeated reads from a TTL-bounded
//! response cache and invalidates it on writes; [`application::table`] turns
//! user-driven query changes into debounced page fetches, or pages an
//! in-memory collection directly.

pub mod application;
pub mod cache;
pub mod config;
pub mod infra;
pub mod notify;

pub use sijil_api_types as api_types;
