use std::future::Future;

use tokio::task::AbortHandle;

/// Owns a background task. Cancelling aborts it; doing so twice is a no-op,
/// and dropping the handle cancels too.
#[derive(Debug)]
pub struct Subscription {
    name: &'static str,
    handle: Option<AbortHandle>,
}

impl Subscription {
    pub fn spawn<F>(name: &'static str, task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task).abort_handle();
        Self {
            name,
            handle: Some(handle),
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!(subscription = self.name, "cancelled");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
