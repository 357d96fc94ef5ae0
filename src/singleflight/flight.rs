use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::watch;

/// Collapses concurrent loads of the same key into one execution.
///
/// The first caller for a key runs the work; callers arriving while it is in
/// flight wait on a `watch` channel and receive a clone of the same result.
/// The record is dropped as soon as the work finishes, so results are never
/// memoized here.
pub struct SingleFlight<T> {
    calls: Mutex<HashMap<String, watch::Receiver<Option<T>>>>,
}

/// Removes the leader's record when it finishes or is cancelled.
struct CallGuard<'a, T> {
    calls: &'a Mutex<HashMap<String, watch::Receiver<Option<T>>>>,
    key: &'a str,
}

impl<T> Drop for CallGuard<'_, T> {
    fn drop(&mut self) {
        self.calls.lock().remove(self.key);
    }
}

impl<T: Clone> SingleFlight<T> {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `work` for `key` unless a call for the same key is already running,
    /// in which case that call's result is awaited and returned instead.
    ///
    /// The registry lock is only held to look up or insert the record, never
    /// while `work` runs. If the leading call is dropped before finishing, its
    /// waiters compete to run the work themselves.
    pub async fn work<F, Fut>(&self, key: &str, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let tx = loop {
            let mut rx = {
                let mut calls = self.calls.lock();
                match calls.get(key) {
                    Some(rx) => rx.clone(),
                    None => {
                        let (tx, rx) = watch::channel(None);
                        calls.insert(key.to_string(), rx);
                        break tx;
                    }
                }
            };

            if let Ok(done) = rx.wait_for(Option::is_some).await
                && let Some(value) = (*done).clone()
            {
                tracing::trace!("singleflight: shared result for {}", key);
                return value;
            }
            tracing::debug!("singleflight: leader for {} went away, retrying", key);
        };

        let guard = CallGuard {
            calls: &self.calls,
            key,
        };
        let value = work().await;
        tx.send_replace(Some(value.clone()));
        drop(guard);
        value
    }

    /// Number of keys currently being loaded.
    pub fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}
