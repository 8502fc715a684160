//! Configuration layer: typed settings with layered precedence (file → env).

use std::{num::NonZeroU32, path::Path, str::FromStr, time::Duration};

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "sijil";
const ENV_PREFIX: &str = "SIJIL";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CACHE_TTL_MS: u64 = 30_000;
const DEFAULT_TABLE_DEBOUNCE_MS: u64 = 300;
const DEFAULT_TABLE_PAGE_SIZE: u32 = sijil_api_types::DEFAULT_PAGE_SIZE;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub api: ApiSettings,
    pub cache: CacheSettings,
    pub table: TableSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Prefix for relative request paths. `None` means callers pass absolute URLs.
    pub base_url: Option<Url>,
    pub timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub ttl: Duration,
    pub verbose_logging: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_millis(DEFAULT_CACHE_TTL_MS),
            verbose_logging: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableSettings {
    pub debounce: Duration,
    pub default_page_size: NonZeroU32,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_TABLE_DEBOUNCE_MS),
            default_page_size: NonZeroU32::new(DEFAULT_TABLE_PAGE_SIZE).unwrap_or(NonZeroU32::MIN),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Compact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment).
///
/// `config/default.toml` and `sijil.toml` are optional; `config_file`, when
/// given, must exist. `SIJIL__SECTION__KEY` variables override every file.
pub fn load(config_file: Option<&Path>) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = config_file {
        builder = builder.add_source(File::from(path).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    let raw: RawSettings = builder.build()?.try_deserialize()?;
    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    environment: RawEnvironmentSettings,
    api: RawApiSettings,
    cache: RawCacheSettings,
    table: RawTableSettings,
    logging: RawLoggingSettings,
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            environment,
            api,
            cache,
            table,
            logging,
        } = raw;

        let production = environment.production.unwrap_or(false);

        Ok(Self {
            api: build_api_settings(api)?,
            cache: build_cache_settings(cache, production)?,
            table: build_table_settings(table)?,
            logging: build_logging_settings(logging)?,
        })
    }
}

fn build_api_settings(api: RawApiSettings) -> Result<ApiSettings, LoadError> {
    let base_url = match api.base_url.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(value) => Some(
            Url::parse(value)
                .map_err(|err| LoadError::invalid("api.base_url", format!("invalid url: {err}")))?,
        ),
    };

    let timeout_seconds = api
        .timeout_seconds
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
    if timeout_seconds == 0 {
        return Err(LoadError::invalid(
            "api.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ApiSettings {
        base_url,
        timeout: Duration::from_secs(timeout_seconds),
    })
}

fn build_cache_settings(
    cache: RawCacheSettings,
    production: bool,
) -> Result<CacheSettings, LoadError> {
    let ttl_ms = cache.ttl_ms.unwrap_or(DEFAULT_CACHE_TTL_MS);
    if ttl_ms == 0 {
        return Err(LoadError::invalid("cache.ttl_ms", "must be greater than zero"));
    }

    let disabled = cache.disable_cache.unwrap_or(false) || cache.no_cache.unwrap_or(false);

    Ok(CacheSettings {
        enabled: !disabled,
        ttl: Duration::from_millis(ttl_ms),
        verbose_logging: cache.verbose_logging.unwrap_or(!production),
    })
}

fn build_table_settings(table: RawTableSettings) -> Result<TableSettings, LoadError> {
    let debounce_ms = table.debounce_ms.unwrap_or(DEFAULT_TABLE_DEBOUNCE_MS);
    let page_size = table.default_page_size.unwrap_or(DEFAULT_TABLE_PAGE_SIZE);
    let default_page_size = NonZeroU32::new(page_size)
        .ok_or_else(|| LoadError::invalid("table.default_page_size", "must be greater than zero"))?;

    Ok(TableSettings {
        debounce: Duration::from_millis(debounce_ms),
        default_page_size,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level.as_deref() {
        Some(value) => LevelFilter::from_str(value).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawEnvironmentSettings {
    production: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiSettings {
    base_url: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    ttl_ms: Option<u64>,
    disable_cache: Option<bool>,
    no_cache: Option<bool>,
    verbose_logging: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawTableSettings {
    debounce_ms: Option<u64>,
    default_page_size: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}
