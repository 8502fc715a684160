//! Cache key construction.
//!
//! Keys are plain strings made of labelled segments joined by `::`. Maps are
//! serialized with sorted keys so logically equal requests always share a key.
//! Segments are not escaped: a value containing the separator can collide with
//! a differently shaped key.

use std::borrow::Borrow;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use sijil_api_types::{ParamValue, SortDirection};
use time::{OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description};

pub const KEY_SEPARATOR: &str = "::";
pub const DEFAULT_CACHE_KEY: &str = "default_cache_key";
const RESOURCE_PREFIX: &str = "resource_";
const HASH_WIDTH: usize = 16;

/// Bucket size for time-scoped keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeGranularity {
    Second,
    Minute,
    Hour,
    Day,
}

/// Fluent builder producing deterministic cache keys.
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    parts: Vec<String>,
    separator: String,
}

impl Default for CacheKeyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheKeyBuilder {
    pub fn new() -> Self {
        Self {
            parts: Vec::new(),
            separator: KEY_SEPARATOR.to_string(),
        }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Append the URL with a single trailing slash removed.
    pub fn add_url(mut self, url: &str) -> Self {
        if !url.is_empty() {
            let normalized = url.strip_suffix('/').unwrap_or(url);
            self.parts.push(normalized.to_string());
        }
        self
    }

    /// Append query parameters as a JSON object with sorted keys.
    pub fn add_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Borrow<ParamValue>,
    {
        let map = params
            .into_iter()
            .map(|(key, value)| (key.as_ref().to_string(), scalar(&value).to_json()))
            .collect::<Map<String, Value>>();
        if !map.is_empty() {
            self.parts.push(Value::Object(map).to_string());
        }
        self
    }

    /// Append headers as a JSON object with sorted names. No header is filtered out.
    pub fn add_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let map = headers
            .into_iter()
            .map(|(name, value)| {
                (
                    name.as_ref().to_string(),
                    Value::String(value.as_ref().to_string()),
                )
            })
            .collect::<Map<String, Value>>();
        if !map.is_empty() {
            self.parts.push(Value::Object(map).to_string());
        }
        self
    }

    pub fn add_resource(mut self, resource_type: &str, id: impl Into<ParamValue>) -> Self {
        if !resource_type.is_empty() {
            let id = id.into();
            let segment = if matches!(id, ParamValue::Null) {
                format!("{RESOURCE_PREFIX}{resource_type}")
            } else {
                format!("{RESOURCE_PREFIX}{resource_type}_{id}")
            };
            self.parts.push(segment);
        }
        self
    }

    pub fn add_user(mut self, user_id: impl Into<ParamValue>) -> Self {
        let user_id = user_id.into();
        if !matches!(user_id, ParamValue::Null) {
            self.parts.push(format!("user_{user_id}"));
        }
        self
    }

    pub fn add_timestamp(self, granularity: TimeGranularity) -> Self {
        self.add_timestamp_at(granularity, OffsetDateTime::now_utc())
    }

    /// Append a time bucket computed from `at` instead of the current clock.
    pub fn add_timestamp_at(mut self, granularity: TimeGranularity, at: OffsetDateTime) -> Self {
        let formatted = match granularity {
            TimeGranularity::Second => at.format(&Rfc3339),
            TimeGranularity::Minute => {
                at.format(format_description!("[year]-[month]-[day]-[hour]-[minute]"))
            }
            TimeGranularity::Hour => at.format(format_description!("[year]-[month]-[day]-[hour]")),
            TimeGranularity::Day => at.format(format_description!("[year]-[month]-[day]")),
        };
        if let Ok(bucket) = formatted {
            self.parts.push(format!("time_{bucket}"));
        }
        self
    }

    pub fn add_custom(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        let value = value.into();
        if !key.is_empty() && !matches!(value, ParamValue::Null) {
            self.parts.push(format!("{key}_{value}"));
        }
        self
    }

    /// Append filter criteria, dropping null and empty-string values first.
    pub fn add_filters<I, K, V>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Borrow<ParamValue>,
    {
        let map = filters
            .into_iter()
            .filter(|(_, value)| !scalar(value).is_empty())
            .map(|(key, value)| (key.as_ref().to_string(), scalar(&value).to_json()))
            .collect::<Map<String, Value>>();
        if !map.is_empty() {
            self.parts.push(format!("filters_{}", Value::Object(map)));
        }
        self
    }

    pub fn add_pagination(mut self, page: Option<u32>, page_size: Option<u32>) -> Self {
        if let Some(page) = page {
            self.parts.push(format!("page_{page}"));
        }
        if let Some(size) = page_size {
            self.parts.push(format!("size_{size}"));
        }
        self
    }

    pub fn add_sort(mut self, sort_by: &str, direction: Option<SortDirection>) -> Self {
        if !sort_by.is_empty() {
            let segment = match direction {
                Some(direction) => format!("sort_{sort_by}_{direction}"),
                None => format!("sort_{sort_by}"),
            };
            self.parts.push(segment);
        }
        self
    }

    pub fn add_search(mut self, query: &str) -> Self {
        let trimmed = query.trim();
        if !trimmed.is_empty() {
            self.parts.push(format!("search_{}", trimmed.to_lowercase()));
        }
        self
    }

    pub fn add_version(mut self, version: impl Into<ParamValue>) -> Self {
        let version = version.into();
        if !version.is_empty() {
            self.parts.push(format!("v_{version}"));
        }
        self
    }

    pub fn add_locale(mut self, locale: &str) -> Self {
        if !locale.is_empty() {
            self.parts.push(format!("locale_{locale}"));
        }
        self
    }

    /// Join every non-empty segment; [`DEFAULT_CACHE_KEY`] when nothing was added.
    pub fn build(&self) -> String {
        let valid = self
            .parts
            .iter()
            .filter(|part| !part.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>();
        if valid.is_empty() {
            return DEFAULT_CACHE_KEY.to_string();
        }
        valid.join(&self.separator)
    }

    /// Fixed-width hex digest of [`build`](Self::build).
    pub fn build_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.build().as_bytes());
        let mut digest = hex::encode(hasher.finalize());
        digest.truncate(HASH_WIDTH);
        digest
    }

    pub fn reset(mut self) -> Self {
        self.parts.clear();
        self
    }
}

fn scalar<V: Borrow<ParamValue>>(value: &V) -> &ParamValue {
    value.borrow()
}

/// A cache key split back into its leading segment and the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCacheKey<'a> {
    head: &'a str,
    rest: Vec<&'a str>,
}

impl<'a> ParsedCacheKey<'a> {
    pub fn parse(key: &'a str) -> Self {
        let mut segments = key.split(KEY_SEPARATOR);
        let head = segments.next().unwrap_or_default();
        Self {
            head,
            rest: segments.collect(),
        }
    }

    /// The URL segment, when the key was built from a request.
    pub fn url(&self) -> Option<&'a str> {
        (!self.head.starts_with(RESOURCE_PREFIX) && !self.head.is_empty()).then_some(self.head)
    }

    /// The `type[_id]` descriptor, when the key was built for a resource.
    pub fn resource(&self) -> Option<&'a str> {
        self.head.strip_prefix(RESOURCE_PREFIX)
    }

    pub fn segments(&self) -> &[&'a str] {
        &self.rest
    }

    /// True when the URL mentions `resource_type` or the resource descriptor names it.
    pub fn matches_resource(&self, resource_type: &str) -> bool {
        if resource_type.is_empty() {
            return false;
        }
        if let Some(url) = self.url() {
            return url.contains(resource_type);
        }
        self.resource().is_some_and(|descriptor| {
            descriptor == resource_type
                || descriptor
                    .strip_prefix(resource_type)
                    .is_some_and(|tail| tail.starts_with('_'))
        })
    }
}
