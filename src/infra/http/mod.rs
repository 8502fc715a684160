//! HTTP access layer: transport, cached client and error mapping.

mod client;
mod error;
mod form;
mod params;
mod transport;

pub use client::{ApiClient, SharedFetch};
pub use error::{ApiError, ErrorBody, ErrorKind, SILENT_ERROR_PATHS, is_silent};
pub use form::{FormData, FormValue};
pub use params::{QueryParams, RequestHeaders, pagination_params, sort_params};
pub use transport::{ApiRequest, HttpTransport, RequestBody, Transport};

pub use reqwest::Method;

pub const METRIC_HTTP_REQUEST_MS: &str = "sijil_http_request_ms";
pub const METRIC_HTTP_ERROR_TOTAL: &str = "sijil_http_error_total";
