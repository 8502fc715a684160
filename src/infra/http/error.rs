//! API failure taxonomy and the localized messages shown to users.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

const MSG_UNEXPECTED: &str = "حدث خطأ غير متوقع";
const MSG_CONNECTIVITY: &str = "لا يمكن الاتصال بالسيرفر. يرجى التحقق من اتصالك بالإنترنت";
const MSG_BAD_INPUT: &str = "البيانات المدخلة غير صحيحة";
const MSG_SESSION_EXPIRED: &str = "انتهت صلاحية الجلسة. يرجى تسجيل الدخول مرة أخرى";
const MSG_FORBIDDEN: &str = "ليس لديك صلاحية للوصول إلى هذا المحتوى";
const MSG_NOT_FOUND: &str = "المورد المطلوب غير موجود";
const MSG_CONFLICT: &str = "يوجد تعارض في البيانات";
const MSG_UNPROCESSABLE: &str = "لا يمكن معالجة الطلب";
const MSG_RATE_LIMITED: &str = "تم تجاوز عدد المحاولات المسموح. يرجى المحاولة لاحقاً";
const MSG_SERVER: &str = "حدث خطأ في الخادم. يرجى المحاولة لاحقاً";
const MSG_UNAVAILABLE: &str = "الخدمة غير متاحة حالياً. يرجى المحاولة لاحقاً";

const TABLE_MSG_CONNECTIVITY: &str = "لا يمكن الاتصال بالخادم";
const TABLE_MSG_NOT_FOUND: &str = "البيانات المطلوبة غير موجودة";
const TABLE_MSG_SERVER: &str = "خطأ في الخادم";
const TABLE_MSG_DEFAULT: &str = "حدث خطأ في تحميل البيانات";

const SESSION_TOAST_DURATION: Duration = Duration::from_secs(10);
const ERROR_TOAST_DURATION: Duration = Duration::from_secs(5);

/// Request paths whose failures are returned to the caller without a toast.
pub const SILENT_ERROR_PATHS: [&str; 3] = ["/api/auth/login", "/api/auth/register", "/api/auth/check"];

/// Error payload returned by the API alongside a failing status.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorBody {
    pub ar_message: Option<String>,
    pub message: Option<String>,
    pub details: Option<Value>,
}

impl ErrorBody {
    /// Decode a response body, falling back to an empty payload.
    pub fn from_slice(bytes: &[u8]) -> Self {
        serde_json::from_slice(bytes).unwrap_or_default()
    }

    fn ar_message(&self) -> Option<&str> {
        self.ar_message.as_deref().filter(|text| !text.is_empty())
    }

    fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|text| !text.is_empty())
    }

    /// Validation messages from `details`, one per line.
    fn validation_errors(&self) -> Option<String> {
        let mut lines = Vec::new();
        if let Some(details) = &self.details {
            collect_messages(details, &mut lines);
        }
        (!lines.is_empty()).then(|| lines.join("\n"))
    }
}

fn collect_messages(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(text) if !text.is_empty() => out.push(text.clone()),
        Value::Array(items) => items.iter().for_each(|item| collect_messages(item, out)),
        Value::Object(fields) => match fields.get("arMessage").or_else(|| fields.get("message")) {
            Some(message) => collect_messages(message, out),
            None => fields.values().for_each(|field| collect_messages(field, out)),
        },
        _ => {}
    }
}

/// Coarse classification of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connectivity,
    Validation,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    RateLimited,
    Server,
    Unavailable,
    Status,
    Decode,
    InvalidRequest,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Connectivity => "connectivity",
            ErrorKind::Validation => "validation",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Server => "server",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Status => "status",
            ErrorKind::Decode => "decode",
            ErrorKind::InvalidRequest => "invalid_request",
        }
    }
}

/// Failure of a single API request.
///
/// Cloneable so one failed shared fetch can be handed to every waiter.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("cannot reach {url}: {message}")]
    Connectivity { url: String, message: String },
    #[error("{url} responded with status {status}")]
    Status {
        url: String,
        status: u16,
        body: ErrorBody,
    },
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
    #[error("invalid request for {url}: {message}")]
    InvalidRequest { url: String, message: String },
}

impl ApiError {
    pub fn connectivity(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connectivity {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn status(url: impl Into<String>, status: u16, body: ErrorBody) -> Self {
        Self::Status {
            url: url.into(),
            status,
            body,
        }
    }

    pub fn decode(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn invalid_request(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn url(&self) -> &str {
        match self {
            ApiError::Connectivity { url, .. }
            | ApiError::Status { url, .. }
            | ApiError::Decode { url, .. }
            | ApiError::InvalidRequest { url, .. } => url,
        }
    }

    /// HTTP status of the failure; `0` when no response arrived.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Status { status, .. } => *status,
            _ => 0,
        }
    }

    pub fn body(&self) -> Option<&ErrorBody> {
        match self {
            ApiError::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Connectivity { .. } => ErrorKind::Connectivity,
            ApiError::Decode { .. } => ErrorKind::Decode,
            ApiError::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            ApiError::Status { status, .. } => match status {
                400 | 422 => ErrorKind::Validation,
                401 => ErrorKind::Unauthorized,
                403 => ErrorKind::Forbidden,
                404 => ErrorKind::NotFound,
                409 => ErrorKind::Conflict,
                429 => ErrorKind::RateLimited,
                500 => ErrorKind::Server,
                502..=504 => ErrorKind::Unavailable,
                _ => ErrorKind::Status,
            },
        }
    }

    /// Localized message for a notification, preferring what the server sent
    /// where the status allows it.
    pub fn user_message(&self) -> String {
        let body = self.body();
        let ar_message = body.and_then(ErrorBody::ar_message);
        let message = body.and_then(ErrorBody::message);

        let text = match self {
            ApiError::Connectivity { .. } => MSG_CONNECTIVITY,
            ApiError::Decode { .. } | ApiError::InvalidRequest { .. } => MSG_UNEXPECTED,
            ApiError::Status { status, body, .. } => match status {
                400 => {
                    if let Some(details) = body.validation_errors() {
                        return details;
                    }
                    ar_message.or(message).unwrap_or(MSG_BAD_INPUT)
                }
                401 => MSG_SESSION_EXPIRED,
                403 => MSG_FORBIDDEN,
                404 => MSG_NOT_FOUND,
                409 => ar_message.unwrap_or(MSG_CONFLICT),
                422 => ar_message.or(message).unwrap_or(MSG_UNPROCESSABLE),
                429 => MSG_RATE_LIMITED,
                500 => MSG_SERVER,
                502..=504 => MSG_UNAVAILABLE,
                _ => ar_message.or(message).unwrap_or(MSG_UNEXPECTED),
            },
        };
        text.to_string()
    }

    /// Message shown inline by a table that failed to load.
    pub fn table_message(&self) -> String {
        if let Some(message) = self.body().and_then(ErrorBody::message) {
            return message.to_string();
        }
        match self.status_code() {
            0 if matches!(self, ApiError::Connectivity { .. }) => TABLE_MSG_CONNECTIVITY,
            404 => TABLE_MSG_NOT_FOUND,
            500 => TABLE_MSG_SERVER,
            _ => TABLE_MSG_DEFAULT,
        }
        .to_string()
    }

    /// How long the error notification stays visible.
    pub fn toast_duration(&self) -> Duration {
        if self.status_code() == 401 {
            SESSION_TOAST_DURATION
        } else {
            ERROR_TOAST_DURATION
        }
    }
}

/// True when failures of `url` must not raise a notification.
pub fn is_silent(url: &str) -> bool {
    SILENT_ERROR_PATHS.iter().any(|path| url.contains(path))
}
