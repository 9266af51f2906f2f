use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub title: String,
    pub detail: Option<String>,
}

/// User-facing error channel. Fire and forget: nothing is acknowledged,
/// the page drains the queue when it next polls `/alerts`.
#[derive(Clone, Default)]
pub struct Alerts {
    queue: Arc<Mutex<Vec<Alert>>>,
}

impl Alerts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&self, title: impl Into<String>, detail: Option<String>) {
        let alert = Alert {
            title: title.into(),
            detail,
        };
        tracing::warn!(title = %alert.title, detail = alert.detail.as_deref().unwrap_or(""), "alert raised");

        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(alert);
    }

    pub fn drain(&self) -> Vec<Alert> {
        std::mem::take(&mut *self.queue.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn list(&self) -> Vec<Alert> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}
