//! Application services built on the HTTP access layer.

pub mod error;
pub mod table;
