//! Infrastructure adapters: HTTP access, telemetry and their errors.

pub mod error;
pub mod http;
pub mod telemetry;
