//! In-process transport for exercising the client and table layers.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Value, json};
use sijil::infra::http::{ApiError, ApiRequest, Transport};
use tokio::sync::Notify;

pub struct Reply {
    pub delay: Duration,
    pub gate: Option<Arc<Notify>>,
    pub result: Result<Value, ApiError>,
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Self {
            delay: Duration::ZERO,
            gate: None,
            result: Ok(body),
        }
    }

    pub fn err(error: ApiError) -> Self {
        Self {
            delay: Duration::ZERO,
            gate: None,
            result: Err(error),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Hold the reply until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

type Responder = dyn Fn(&ApiRequest, usize) -> Reply + Send + Sync;

/// Records every request and answers through a closure that also receives
/// the zero-based call number.
pub struct FakeTransport {
    requests: Mutex<Vec<ApiRequest>>,
    responder: Box<Responder>,
}

impl FakeTransport {
    pub fn new(responder: impl Fn(&ApiRequest, usize) -> Reply + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        })
    }

    /// Always answers `body`.
    pub fn fixed(body: Value) -> Arc<Self> {
        Self::new(move |_, _| Reply::ok(body.clone()))
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    pub fn calls_to(&self, method: &str, url: &str) -> usize {
        self.requests
            .lock()
            .expect("requests lock")
            .iter()
            .filter(|request| request.method.as_str() == method && request.url == url)
            .count()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> Result<Bytes, ApiError> {
        let call = {
            let mut requests = self.requests.lock().expect("requests lock");
            requests.push(request.clone());
            requests.len() - 1
        };
        let reply = (self.responder)(&request, call);
        if let Some(gate) = &reply.gate {
            gate.notified().await;
        }
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        reply
            .result
            .map(|body| Bytes::from(serde_json::to_vec(&body).expect("encode reply")))
    }
}

/// A page of `{id, name}` records derived from the request's `page` and `pageSize`.
pub fn employee_page(request: &ApiRequest, total: u64) -> Value {
    let number = |key: &str, default: u64| {
        request
            .params
            .get(key)
            .and_then(|value| value.to_string().parse::<u64>().ok())
            .unwrap_or(default)
    };
    let page = number("page", 1);
    let size = number("pageSize", 10);
    let start = (page - 1) * size;
    let data: Vec<Value> = (start..(start + size).min(total))
        .map(|id| json!({"id": id + 1, "name": format!("employee-{}", id + 1)}))
        .collect();
    json!({
        "data": data,
        "totalItems": total,
        "currentPage": page,
        "pageSize": size,
        "totalPages": total.div_ceil(size.max(1)),
    })
}
