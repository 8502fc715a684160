//! Transient user notifications.
//!
//! Toasts expire on their own; [`ToastCenter::active`] only returns the ones
//! whose display time has not elapsed.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use crate::cache::mutex_lock;

const SOURCE: &str = "notify";

pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub message: String,
}

#[derive(Debug)]
struct Posted {
    toast: Toast,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct ToastCenter {
    next_id: AtomicU64,
    toasts: Mutex<Vec<Posted>>,
}

impl Default for ToastCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl ToastCenter {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            toasts: Mutex::new(Vec::new()),
        }
    }

    /// Post a toast and return its id.
    pub fn show(&self, message: impl Into<String>, kind: ToastKind, duration: Duration) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let toast = Toast {
            id,
            kind,
            message: message.into(),
        };
        debug!(target: "sijil::notify", id, kind = ?kind, message = %toast.message, "toast posted");
        mutex_lock(&self.toasts, SOURCE, "show").push(Posted {
            toast,
            expires_at: Instant::now() + duration,
        });
        id
    }

    pub fn show_success(&self, message: impl Into<String>, duration: Option<Duration>) -> u64 {
        self.show(
            message,
            ToastKind::Success,
            duration.unwrap_or(DEFAULT_TOAST_DURATION),
        )
    }

    pub fn show_error(&self, message: impl Into<String>, duration: Option<Duration>) -> u64 {
        self.show(
            message,
            ToastKind::Error,
            duration.unwrap_or(DEFAULT_TOAST_DURATION),
        )
    }

    /// Visible toasts, oldest first. Expired ones are dropped.
    pub fn active(&self) -> Vec<Toast> {
        let now = Instant::now();
        let mut toasts = mutex_lock(&self.toasts, SOURCE, "active");
        toasts.retain(|posted| posted.expires_at > now);
        toasts.iter().map(|posted| posted.toast.clone()).collect()
    }

    pub fn dismiss(&self, id: u64) {
        mutex_lock(&self.toasts, SOURCE, "dismiss").retain(|posted| posted.toast.id != id);
    }

    pub fn clear_all(&self) {
        mutex_lock(&self.toasts, SOURCE, "clear_all").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn toasts_expire_after_their_duration() {
        let center = ToastCenter::new();
        let short = center.show_success("تم الحفظ", None);
        let long = center.show_error("خطأ", Some(Duration::from_secs(10)));
        assert!(long > short);
        assert_eq!(center.active().len(), 2);

        tokio::time::advance(Duration::from_secs(3)).await;
        let active = center.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, long);
        assert_eq!(active[0].kind, ToastKind::Error);
    }

    #[test]
    fn dismiss_and_clear() {
        let center = ToastCenter::new();
        let first = center.show_success("a", None);
        center.show_success("b", None);
        center.dismiss(first);
        assert_eq!(center.active().len(), 1);
        center.clear_all();
        assert!(center.active().is_empty());
    }
}
