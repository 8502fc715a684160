use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use metrics::histogram;
use reqwest::{Client, Method, Url};
use tracing::debug;

use crate::config::ApiSettings;
use crate::infra::error::InfraError;

use super::METRIC_HTTP_REQUEST_MS;
use super::error::{ApiError, ErrorBody};
use super::form::FormData;
use super::params::{QueryParams, RequestHeaders};

/// Payload of a write request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Form(FormData),
}

/// A request as the client layer hands it to a transport.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: RequestHeaders,
    pub params: QueryParams,
    pub body: Option<RequestBody>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: RequestHeaders::default(),
            params: QueryParams::default(),
            body: None,
        }
    }

    pub fn headers(mut self, headers: Option<&RequestHeaders>) -> Self {
        self.headers = headers.cloned().unwrap_or_default();
        self
    }

    pub fn params(mut self, params: Option<&QueryParams>) -> Self {
        self.params = params.cloned().unwrap_or_default();
        self
    }

    pub fn body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn form(mut self, form: FormData) -> Self {
        self.body = Some(RequestBody::Form(form));
        self
    }
}

/// Sends requests and returns raw response bodies.
///
/// Non-success statuses are returned as [`ApiError::Status`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<Bytes, ApiError>;
}

/// [`Transport`] over `reqwest`, resolving paths against one base URL.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    base: Option<Url>,
}

impl HttpTransport {
    pub fn new(settings: &ApiSettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(settings.timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self {
            client,
            base: settings.base_url.clone(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("sijil/", env!("CARGO_PKG_VERSION"))
    }

    /// Base URL and path are concatenated, so a base with a path prefix keeps it.
    pub fn url(&self, path: &str, params: &QueryParams) -> Result<Url, ApiError> {
        let joined = match &self.base {
            Some(base) if !path.starts_with("http://") && !path.starts_with("https://") => {
                format!(
                    "{}/{}",
                    base.as_str().trim_end_matches('/'),
                    path.trim_start_matches('/')
                )
            }
            _ => path.to_string(),
        };
        let mut url =
            Url::parse(&joined).map_err(|err| ApiError::invalid_request(path, err.to_string()))?;

        let pairs = params.to_pairs();
        if !pairs.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &pairs {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<Bytes, ApiError> {
        let ApiRequest {
            method,
            url: path,
            headers,
            params,
            body,
        } = request;
        let url = self.url(&path, &params)?;

        let mut builder = self.client.request(method.clone(), url);
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        match &body {
            Some(RequestBody::Json(json)) => builder = builder.json(json),
            Some(RequestBody::Form(form)) => {
                let form = form
                    .to_multipart()
                    .map_err(|err| ApiError::invalid_request(&path, err.to_string()))?;
                builder = builder.multipart(form);
            }
            None => {}
        }

        let started = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|err| ApiError::connectivity(&path, err.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ApiError::connectivity(&path, err.to_string()))?;
        histogram!(METRIC_HTTP_REQUEST_MS).record(started.elapsed().as_secs_f64() * 1000.0);

        debug!(
            target: "sijil::http",
            method = %method,
            path = %path,
            status = status.as_u16(),
            bytes = bytes.len(),
            "api response"
        );

        if !status.is_success() {
            return Err(ApiError::status(
                path,
                status.as_u16(),
                ErrorBody::from_slice(&bytes),
            ));
        }
        Ok(bytes)
    }
}
