//! Cooperative stop signal shared by the poll loop, `FeedLoop::stop` and
//! listener handlers.

use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable stop flag. Requesting a stop never interrupts an in-flight
/// read; the loop checks the flag between iterations and while waiting
/// out a retry backoff.
#[derive(Clone, Debug)]
pub struct StopHandle {
    flag: Arc<watch::Sender<bool>>,
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl StopHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { flag: Arc::new(tx) }
    }

    /// Idempotent.
    pub fn request(&self) {
        self.flag.send_replace(true);
    }

    pub fn is_requested(&self) -> bool {
        *self.flag.borrow()
    }

    pub(crate) fn reset(&self) {
        self.flag.send_replace(false);
    }

    /// Resolves once a stop has been requested (immediately if it already was).
    pub async fn requested(&self) {
        let mut rx = self.flag.subscribe();
        let _ = rx.wait_for(|stop| *stop).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn request_is_shared_between_clones() {
        let a = StopHandle::new();
        let b = a.clone();
        assert!(!b.is_requested());
        a.request();
        a.request();
        assert!(b.is_requested());
        b.reset();
        assert!(!a.is_requested());
    }

    #[tokio::test]
    async fn requested_wakes_waiter() {
        let stop = StopHandle::new();
        let waiter = tokio::spawn({
            let stop = stop.clone();
            async move { stop.requested().await }
        });
        tokio::time::sleep(Duration::from_millis(5)).await;
        stop.request();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter woke up")
            .unwrap();
    }
}
