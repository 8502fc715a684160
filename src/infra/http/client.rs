//! Cached API access.
//!
//! Reads go through the [`ResponseCache`]: identical requests inside the TTL
//! share one in-flight fetch and its settled result. Writes bypass the cache
//! and invalidate every entry under the written path first.

use std::sync::{Arc, Weak};

use bytes::Bytes;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use metrics::counter;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::cache::{
    CacheConfig, CacheEvent, CacheStats, ResponseCache, format_cache_duration, patterns,
    record_event,
};
use crate::config::Settings;
use crate::infra::error::InfraError;
use crate::notify::ToastCenter;

use super::METRIC_HTTP_ERROR_TOTAL;
use super::error::{ApiError, is_silent};
use super::form::FormData;
use super::params::{QueryParams, RequestHeaders};
use super::transport::{ApiRequest, HttpTransport, RequestBody, Transport};

/// A response shared by every reader of one cache entry.
pub type SharedFetch = Shared<BoxFuture<'static, Result<Bytes, ApiError>>>;

#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    cache: Arc<ResponseCache<SharedFetch>>,
    config: CacheConfig,
    toasts: Option<Arc<ToastCenter>>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, config: CacheConfig) -> Self {
        Self {
            transport,
            cache: Arc::new(ResponseCache::new(&config)),
            config,
            toasts: None,
        }
    }

    /// Client over `reqwest` configured from `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self, InfraError> {
        let transport = HttpTransport::new(&settings.api)?;
        Ok(Self::new(
            Arc::new(transport),
            CacheConfig::from(&settings.cache),
        ))
    }

    /// Raise error toasts for failed requests on `toasts`.
    pub fn with_toasts(mut self, toasts: Arc<ToastCenter>) -> Self {
        self.toasts = Some(toasts);
        self
    }

    pub fn cache_config(&self) -> &CacheConfig {
        &self.config
    }

    /// Cached GET.
    ///
    /// A live entry for the same URL, parameters and headers is reused even
    /// while its fetch is still in flight. Failed fetches and bodies that do
    /// not decode are evicted so the next call retries.
    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: Option<&RequestHeaders>,
        params: Option<&QueryParams>,
    ) -> Result<T, ApiError> {
        if !self.config.enabled {
            return self.get_fresh(url, headers, params).await;
        }

        let key = patterns::for_api_call(url, params.into_iter().flatten(), headers.into_iter().flatten());
        let request = ApiRequest::new(Method::GET, url)
            .headers(headers)
            .params(params);

        let lookup = self.cache.get_or_insert_with(&key, |generation| {
            self.shared_fetch(key.clone(), generation, request)
        });

        let event = if lookup.is_hit() {
            CacheEvent::Hit
        } else {
            CacheEvent::Miss
        };
        record_event(self.config.verbose_logging, event, url);

        let generation = lookup.generation();
        let bytes = lookup.into_inner().await?;
        self.decode(url, &bytes).inspect_err(|_| {
            self.cache.evict_generation(&key, generation);
        })
    }

    fn shared_fetch(&self, key: String, generation: u64, request: ApiRequest) -> SharedFetch {
        let transport = Arc::clone(&self.transport);
        let cache: Weak<ResponseCache<SharedFetch>> = Arc::downgrade(&self.cache);
        let toasts = self.toasts.clone();
        let verbose = self.config.verbose_logging;

        async move {
            let url = request.url.clone();
            let result = transport.send(request).await;
            match &result {
                Ok(_) => record_event(verbose, CacheEvent::Store, &url),
                Err(err) => {
                    if let Some(cache) = cache.upgrade() {
                        cache.evict_generation(&key, generation);
                    }
                    report_failure(toasts.as_deref(), err);
                }
            }
            result
        }
        .boxed()
        .shared()
    }

    /// Uncached GET.
    pub async fn get_fresh<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: Option<&RequestHeaders>,
        params: Option<&QueryParams>,
    ) -> Result<T, ApiError> {
        record_event(self.config.verbose_logging, CacheEvent::Miss, url);
        let bytes = self
            .fetch(ApiRequest::new(Method::GET, url).headers(headers).params(params))
            .await?;
        self.decode(url, &bytes)
    }

    /// Uncached GET of a raw body, e.g. a file download.
    pub async fn get_blob(
        &self,
        url: &str,
        headers: Option<&RequestHeaders>,
        params: Option<&QueryParams>,
    ) -> Result<Bytes, ApiError> {
        self.fetch(ApiRequest::new(Method::GET, url).headers(headers).params(params))
            .await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        headers: Option<&RequestHeaders>,
        params: Option<&QueryParams>,
    ) -> Result<T, ApiError> {
        self.write(Method::POST, url, Some(encode(url, body)?), headers, params)
            .await
    }

    /// Multipart POST, e.g. a file upload. Invalidates like [`post`](Self::post).
    pub async fn post_form_data<T: DeserializeOwned>(
        &self,
        url: &str,
        form: FormData,
        headers: Option<&RequestHeaders>,
        params: Option<&QueryParams>,
    ) -> Result<T, ApiError> {
        self.write(Method::POST, url, Some(RequestBody::Form(form)), headers, params)
            .await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        headers: Option<&RequestHeaders>,
        params: Option<&QueryParams>,
    ) -> Result<T, ApiError> {
        self.write(Method::PUT, url, Some(encode(url, body)?), headers, params)
            .await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: Option<&RequestHeaders>,
        params: Option<&QueryParams>,
    ) -> Result<T, ApiError> {
        self.write(Method::DELETE, url, None, headers, params).await
    }

    async fn write<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<RequestBody>,
        headers: Option<&RequestHeaders>,
        params: Option<&QueryParams>,
    ) -> Result<T, ApiError> {
        self.cache.invalidate_prefix(url);

        let mut request = ApiRequest::new(method, url).headers(headers).params(params);
        request.body = body;
        let bytes = self.fetch(request).await?;
        self.decode(url, &bytes)
    }

    /// Decode a response body, reporting failures like any other request error.
    fn decode<T: DeserializeOwned>(&self, url: &str, bytes: &[u8]) -> Result<T, ApiError> {
        decode(url, bytes).inspect_err(|err| report_failure(self.toasts.as_deref(), err))
    }

    async fn fetch(&self, request: ApiRequest) -> Result<Bytes, ApiError> {
        let result = self.transport.send(request).await;
        if let Err(err) = &result {
            report_failure(self.toasts.as_deref(), err);
        }
        result
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn clear_cache_for_url(&self, url: &str) {
        self.cache.clear_for_url(url);
    }

    /// Drop every cached read of `resource_type`, e.g. `employees`.
    pub fn invalidate_cache_for_resource(&self, resource_type: &str) {
        self.cache.invalidate_resource(resource_type);
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cache_duration_info(&self) -> String {
        format_cache_duration(self.cache.ttl())
    }

    pub fn force_cleanup_expired_cache(&self) {
        self.cache.purge_expired();
    }
}

fn decode<T: DeserializeOwned>(url: &str, bytes: &[u8]) -> Result<T, ApiError> {
    let payload = if bytes.is_empty() { b"null".as_slice() } else { bytes };
    serde_json::from_slice(payload).map_err(|err| ApiError::decode(url, err.to_string()))
}

fn encode<B: Serialize + ?Sized>(url: &str, body: &B) -> Result<RequestBody, ApiError> {
    serde_json::to_value(body)
        .map(RequestBody::Json)
        .map_err(|err| ApiError::invalid_request(url, err.to_string()))
}

fn report_failure(toasts: Option<&ToastCenter>, err: &ApiError) {
    counter!(METRIC_HTTP_ERROR_TOTAL, "kind" => err.kind().as_str()).increment(1);
    warn!(
        target: "sijil::http",
        url = err.url(),
        status = err.status_code(),
        kind = err.kind().as_str(),
        error = %err,
        "api request failed"
    );

    if is_silent(err.url()) {
        return;
    }
    if let Some(toasts) = toasts {
        toasts.show_error(err.user_message(), Some(err.toast_duration()));
    }
}
