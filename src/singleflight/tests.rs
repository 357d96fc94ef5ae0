//! Request Coalescing Module Tests
//!
//! ## Test Scopes
//! - **Deduplication**: Concurrent calls on one key run the work once and share the result.
//! - **No memoization**: Sequential calls each run the work.
//! - **Cancellation**: Waiters recover when the leading call is dropped.

#[cfg(test)]
mod tests {
    use crate::singleflight::SingleFlight;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Barrier;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_calls_run_work_once() {
        // ARRANGE
        let flight = Arc::new(SingleFlight::<Result<String, String>>::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(10));

        // ACT: ten callers miss the same key at the same time
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let flight = flight.clone();
                let calls = calls.clone();
                let barrier = barrier.clone();
                tokio::spawn(async move {
                    barrier.wait().await;
                    flight
                        .work("hot-key", || async {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(200)).await;
                            Ok::<_, String>("bar".to_string())
                        })
                        .await
                })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        // ASSERT
        assert_eq!(calls.load(Ordering::SeqCst), 1, "work should run exactly once");
        assert!(results.iter().all(|r| r == &Ok("bar".to_string())));
        assert_eq!(flight.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_errors_are_shared_too() {
        let flight = Arc::new(SingleFlight::<Result<u32, String>>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let leader = {
            let flight = flight.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                flight
                    .work("k", || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Err("boom".to_string())
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let follower = flight
            .work("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            })
            .await;

        assert_eq!(follower, Err("boom".to_string()));
        assert_eq!(leader.await.unwrap(), Err("boom".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sequential_calls_each_run_work() {
        let flight = SingleFlight::<usize>::new();
        let calls = AtomicUsize::new(0);

        let first = flight
            .work("k", || async { calls.fetch_add(1, Ordering::SeqCst) + 1 })
            .await;
        let second = flight
            .work("k", || async { calls.fetch_add(1, Ordering::SeqCst) + 1 })
            .await;

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(flight.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_different_keys_load_in_parallel() {
        let flight = Arc::new(SingleFlight::<usize>::new());
        let started = std::time::Instant::now();

        let handles: Vec<_> = (0..5)
            .map(|i| {
                let flight = flight.clone();
                tokio::spawn(async move {
                    flight
                        .work(&format!("key-{}", i), || async move {
                            tokio::time::sleep(Duration::from_millis(200)).await;
                            i
                        })
                        .await
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), i);
        }
        assert!(started.elapsed() < Duration::from_millis(900));
    }

    #[tokio::test]
    async fn test_waiter_takes_over_when_leader_is_cancelled() {
        let flight = Arc::new(SingleFlight::<u32>::new());

        let leader = {
            let flight = flight.clone();
            tokio::spawn(async move {
                flight
                    .work("k", || async {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        1
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(flight.in_flight(), 1);

        let follower = {
            let flight = flight.clone();
            tokio::spawn(async move { flight.work("k", || async { 7 }).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        leader.abort();

        let value = tokio::time::timeout(Duration::from_secs(5), follower)
            .await
            .expect("follower should not hang")
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(flight.in_flight(), 0);
    }
}
