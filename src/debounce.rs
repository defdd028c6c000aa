/// Keyed debouncing: bursts of calls for one key collapse into the last one.
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex as TokioMutex, watch};
use tracing::debug;

#[derive(Default)]
pub struct Debouncer {
    timers: TokioMutex<HashMap<String, (u64, watch::Sender<()>)>>,
    next_id: AtomicU64,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` after `delay` unless another call for `key` arrives first.
    ///
    /// Returns `Some(output)` for the call whose timer fired and `None` for
    /// every call that was superseded. `work` is only invoked when the timer
    /// fires.
    pub async fn schedule<F, Fut, T>(&self, key: &str, delay: Duration, work: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let (cancel_tx, mut cancel_rx) = watch::channel(());
        {
            let mut timers = self.timers.lock().await;
            if let Some((_, old_tx)) = timers.insert(key.to_string(), (id, cancel_tx)) {
                debug!("debounced {key}");
                let _ = old_tx.send(());
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel_rx.changed() => return None,
        }

        {
            let mut timers = self.timers.lock().await;
            if timers.get(key).is_some_and(|(current, _)| *current == id) {
                timers.remove(key);
            }
        }
        Some(work().await)
    }

    /// Number of keys with an armed timer.
    pub async fn pending(&self) -> usize {
        self.timers.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    const DELAY: Duration = Duration::from_millis(40);

    #[tokio::test]
    async fn test_burst_runs_last_call_once() {
        let debouncer = Debouncer::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let call = |arg: u32| {
            let runs = Arc::clone(&runs);
            let debouncer = &debouncer;
            async move {
                debouncer
                    .schedule("A.java", DELAY, move || async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        arg
                    })
                    .await
            }
        };

        let (a, b, c) = tokio::join!(call(1), call(2), call(3));
        assert_eq!((a, b, c), (None, None, Some(3)));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(debouncer.pending().await, 0);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let debouncer = Debouncer::new();
        let (a, b) = tokio::join!(
            debouncer.schedule("A.java", DELAY, || async { "a" }),
            debouncer.schedule("B.java", DELAY, || async { "b" }),
        );
        assert_eq!(a, Some("a"));
        assert_eq!(b, Some("b"));
    }

    #[tokio::test]
    async fn test_calls_after_window_both_run() {
        let debouncer = Debouncer::new();
        let first = debouncer.schedule("A.java", DELAY, || async { 1 }).await;
        let second = debouncer.schedule("A.java", DELAY, || async { 2 }).await;
        assert_eq!(first, Some(1));
        assert_eq!(second, Some(2));
    }
}
