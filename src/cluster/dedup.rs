//! Operation deduplication (spec §4.6.4): a second caller for an `op_id`
//! already in flight registers as a waiter instead of issuing its own RPC;
//! every waiter observes the same result as the one underlying operation.

use std::collections::HashMap;
use std::future::Future;

use tokio::sync::{oneshot, Mutex};

use crate::error::{Error, Result};

pub struct Dedup<T: Clone> {
    inflight: Mutex<HashMap<String, Vec<oneshot::Sender<Result<T>>>>>,
}

impl<T: Clone> Default for Dedup<T> {
    fn default() -> Self {
        Self { inflight: Mutex::new(HashMap::new()) }
    }
}

impl<T: Clone> Dedup<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// If `op_id` is already in flight, waits for that operation's result
    /// instead of running `op`. Otherwise runs `op` and fans its result out
    /// to every waiter that arrived meanwhile (spec §4.6.4).
    pub async fn perform<F, Fut>(&self, op_id: &str, op: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        {
            let mut inflight = self.inflight.lock().await;
            if let Some(waiters) = inflight.get_mut(op_id) {
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                drop(inflight);
                return rx.await.map_err(|_| Error::network_closed())?;
            }
            inflight.insert(op_id.to_string(), Vec::new());
        }

        let result = op().await;

        let waiters = {
            let mut inflight = self.inflight.lock().await;
            inflight.remove(op_id).unwrap_or_default()
        };
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn concurrent_callers_share_one_underlying_call() {
        let dedup: Arc<Dedup<i32>> = Arc::new(Dedup::new());
        let calls = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let dedup = dedup.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                dedup
                    .perform("metadata", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Ok(99)
                    })
                    .await
            }));
        }

        for h in handles {
            assert_eq!(h.await.unwrap().unwrap(), 99);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_op_ids_run_independently() {
        let dedup: Dedup<i32> = Dedup::new();
        let a = dedup.perform("a", || async { Ok(1) }).await.unwrap();
        let b = dedup.perform("b", || async { Ok(2) }).await.unwrap();
        assert_eq!((a, b), (1, 2));
    }
}
