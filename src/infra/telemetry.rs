use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::{
    METRIC_CACHE_EXPIRED_TOTAL, METRIC_CACHE_HIT_TOTAL, METRIC_CACHE_INVALIDATE_TOTAL,
    METRIC_CACHE_MISS_TOTAL,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;
use super::http::{METRIC_HTTP_ERROR_TOTAL, METRIC_HTTP_REQUEST_MS};

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register descriptions for every metric the crate emits. Idempotent.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CACHE_HIT_TOTAL,
            Unit::Count,
            "Total number of response-cache hits."
        );
        describe_counter!(
            METRIC_CACHE_MISS_TOTAL,
            Unit::Count,
            "Total number of response-cache misses."
        );
        describe_counter!(
            METRIC_CACHE_INVALIDATE_TOTAL,
            Unit::Count,
            "Total number of response-cache entries removed by writes or explicit clears."
        );
        describe_counter!(
            METRIC_CACHE_EXPIRED_TOTAL,
            Unit::Count,
            "Total number of response-cache entries swept after their TTL."
        );
        describe_counter!(
            METRIC_HTTP_ERROR_TOTAL,
            Unit::Count,
            "Total number of failed API requests."
        );
        describe_histogram!(
            METRIC_HTTP_REQUEST_MS,
            Unit::Milliseconds,
            "API request latency in milliseconds."
        );
    });
}
