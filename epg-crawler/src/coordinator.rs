//! Single-flight coordination of crawls.
//!
//! At most one crawl runs per [`CrawlKey`]. The first caller for a key
//! becomes the leader and runs the work; callers arriving while it is in
//! flight become followers and wait for the leader to finish. Followers are
//! never handed the leader's result. They are told the flight has landed and
//! read the outcome back from the store themselves, so a leader failure
//! leaves them with whatever the store holds (usually nothing).
//!
//! Cancelling a follower only drops that follower's wait. Cancelling the
//! leader lands the flight, releasing its followers.
//!
//! Per key the state is `absent -> in flight -> absent`. Nothing is
//! remembered once a flight lands, so the next caller for the same key
//! starts a fresh flight.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::debug;

use crate::domain::CrawlKey;

/// How a caller took part in a flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flight<T> {
    /// The caller ran the work and got its result.
    Led(T),
    /// Another caller ran the work; it has finished, successfully or not.
    Joined,
}

/// Deduplicates concurrent work per [`CrawlKey`].
///
/// The map lock is only held to register or remove a key, never while the
/// work runs, so flights for unrelated keys proceed independently.
#[derive(Debug, Default)]
pub struct SingleFlight {
    /// Completion signal per in-flight key; flips to `true` when the leader is done.
    in_flight: Mutex<HashMap<CrawlKey, watch::Sender<bool>>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` for `key` unless a run for it is already in flight.
    ///
    /// The leader gets `Ok(Flight::Led(result))` or its work's error.
    /// Followers get `Ok(Flight::Joined)` once the leader's work has
    /// returned, whatever its outcome; they never see the leader's error. The completion signal fires after
    /// `work` resolves, so anything the work persisted before returning is
    /// visible to followers when they wake.
    pub async fn run<F, Fut, T, E>(
        &self,
        key: CrawlKey,
        work: F,
    ) -> Result<Flight<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let waiter = {
            let mut map = self.lock();
            match map.get(&key) {
                Some(done) => Some(done.subscribe()),
                None => {
                    let (done, _) = watch::channel(false);
                    map.insert(key.clone(), done);
                    None
                }
            }
        };

        if let Some(mut done) = waiter {
            debug!(key = %key, "Waiting for in-flight crawl");
            // The sender is only dropped after sending `true`, so either
            // outcome means the flight has landed
            let _ = done.wait_for(|landed| *landed).await;
            debug!(key = %key, "In-flight crawl finished");
            return Ok(Flight::Joined);
        }

        debug!(key = %key, "Leading crawl");
        // Dropped on every exit path, including cancellation and panics.
        let _landing = Landing { flight: self, key };
        work().await.map(Flight::Led)
    }

    /// Number of keys currently in flight.
    #[cfg(test)]
    fn in_flight(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    fn is_in_flight(&self, key: &CrawlKey) -> bool {
        self.lock().contains_key(key)
    }

    /// Number of followers waiting on `key`.
    #[cfg(test)]
    fn waiting(&self, key: &CrawlKey) -> usize {
        self.lock().get(key).map_or(0, |done| done.receiver_count())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CrawlKey, watch::Sender<bool>>> {
        // The map is consistent after every statement, so a poisoned lock is still usable
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Deregisters the leader's key and wakes its followers when dropped.
struct Landing<'a> {
    flight: &'a SingleFlight,
    key: CrawlKey,
}

impl Drop for Landing<'_> {
    fn drop(&mut self) {
        let done = self.flight.lock().remove(&self.key);
        if let Some(done) = done {
            let followers = done.receiver_count();
            done.send_replace(true);
            debug!(key = %self.key, followers, "Crawl landed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use chrono::NaiveDate;
    use tokio::sync::oneshot;

    fn key(station: &str) -> CrawlKey {
        CrawlKey::new(station, NaiveDate::from_ymd_opt(2026, 10, 20).unwrap())
    }

    /// Poll until `cond` holds, failing the test after a second.
    async fn until(cond: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(1), async {
            while !cond() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("condition not reached");
    }

    #[tokio::test]
    async fn lone_caller_leads() {
        let flight = SingleFlight::new();
        let result: Result<_, ()> = flight.run(key("CCTV-1"), || async { Ok(7) }).await;
        assert_eq!(result.unwrap(), Flight::Led(7));
        assert_eq!(flight.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_one_run() {
        let flight = Arc::new(SingleFlight::new());
        let runs = Arc::new(AtomicUsize::new(0));
        let (release, gate) = oneshot::channel::<()>();

        let leader = {
            let flight = flight.clone();
            let runs = runs.clone();
            tokio::spawn(async move {
                flight
                    .run(key("CCTV-1"), || async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        gate.await.ok();
                        Ok::<_, ()>("led")
                    })
                    .await
            })
        };
        until(|| flight.is_in_flight(&key("CCTV-1"))).await;

        let followers: Vec<_> = (0..5)
            .map(|_| {
                let flight = flight.clone();
                let runs = runs.clone();
                tokio::spawn(async move {
                    flight
                        .run(key("CCTV-1"), || async move {
                            runs.fetch_add(1, Ordering::SeqCst);
                            Ok::<_, ()>("follower ran")
                        })
                        .await
                })
            })
            .collect();
        until(|| flight.waiting(&key("CCTV-1")) == 5).await;

        release.send(()).unwrap();

        assert_eq!(leader.await.unwrap().unwrap(), Flight::Led("led"));
        for follower in followers {
            assert_eq!(follower.await.unwrap().unwrap(), Flight::Joined);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(flight.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn leader_failure_releases_followers() {
        let flight = Arc::new(SingleFlight::new());
        let (release, gate) = oneshot::channel::<()>();

        let leader = {
            let flight = flight.clone();
            tokio::spawn(async move {
                flight
                    .run(key("CCTV-1"), || async move {
                        gate.await.ok();
                        Err::<(), _>("network down")
                    })
                    .await
            })
        };
        until(|| flight.is_in_flight(&key("CCTV-1"))).await;

        let follower = {
            let flight = flight.clone();
            tokio::spawn(async move {
                flight
                    .run(key("CCTV-1"), || async { Ok::<(), &str>(()) })
                    .await
            })
        };
        until(|| flight.waiting(&key("CCTV-1")) == 1).await;
        release.send(()).unwrap();

        let follower = tokio::time::timeout(Duration::from_secs(1), follower)
            .await
            .expect("follower deadlocked")
            .unwrap();
        assert_eq!(follower.unwrap(), Flight::Joined);

        match leader.await.unwrap() {
            Err(msg) => assert_eq!(msg, "network down"),
            other => panic!("expected leader error, got {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancelled_leader_releases_followers() {
        let flight = Arc::new(SingleFlight::new());

        let leader = {
            let flight = flight.clone();
            tokio::spawn(async move {
                flight
                    .run(key("CCTV-1"), || std::future::pending::<Result<(), ()>>())
                    .await
            })
        };
        until(|| flight.is_in_flight(&key("CCTV-1"))).await;

        let follower = {
            let flight = flight.clone();
            tokio::spawn(async move { flight.run(key("CCTV-1"), || async { Ok::<(), ()>(()) }).await })
        };
        until(|| flight.waiting(&key("CCTV-1")) == 1).await;

        leader.abort();
        let follower = tokio::time::timeout(Duration::from_secs(1), follower)
            .await
            .expect("follower deadlocked")
            .unwrap();
        assert_eq!(follower.unwrap(), Flight::Joined);
        assert_eq!(flight.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancelled_follower_leaves_others_waiting() {
        let flight = Arc::new(SingleFlight::new());
        let (release, gate) = oneshot::channel::<()>();

        let leader = {
            let flight = flight.clone();
            tokio::spawn(async move {
                flight
                    .run(key("CCTV-1"), || async move {
                        gate.await.ok();
                        Ok::<_, ()>("led")
                    })
                    .await
            })
        };
        until(|| flight.is_in_flight(&key("CCTV-1"))).await;

        let follower = || {
            let flight = flight.clone();
            tokio::spawn(async move { flight.run(key("CCTV-1"), || async { Ok::<_, ()>("ran") }).await })
        };
        let (cancelled, kept) = (follower(), follower());
        until(|| flight.waiting(&key("CCTV-1")) == 2).await;

        cancelled.abort();
        until(|| flight.waiting(&key("CCTV-1")) == 1).await;
        assert!(flight.is_in_flight(&key("CCTV-1")));

        release.send(()).unwrap();
        assert_eq!(leader.await.unwrap().unwrap(), Flight::Led("led"));
        let kept = tokio::time::timeout(Duration::from_secs(1), kept)
            .await
            .expect("follower deadlocked")
            .unwrap();
        assert_eq!(kept.unwrap(), Flight::Joined);
        assert!(cancelled.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn nothing_is_remembered_after_landing() {
        let flight = SingleFlight::new();
        let first: Result<Flight<()>, _> = flight.run(key("CCTV-1"), || async { Err("fail") }).await;
        assert_eq!(first, Err("fail"));

        let second: Result<_, &str> =
            flight.run(key("CCTV-1"), || async { Ok("retried") }).await;
        assert_eq!(second.unwrap(), Flight::Led("retried"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn unrelated_keys_run_in_parallel() {
        let flight = Arc::new(SingleFlight::new());
        let barrier = Arc::new(tokio::sync::Barrier::new(2));

        let run = |station: &'static str| {
            let flight = flight.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                flight
                    .run(key(station), || async move {
                        // Both flights must be running at once to pass the barrier
                        barrier.wait().await;
                        Ok::<_, ()>(station)
                    })
                    .await
            })
        };
        let (a, b) = (run("CCTV-1"), run("CCTV-2"));

        let (a, b) = tokio::time::timeout(Duration::from_secs(1), async {
            (a.await.unwrap(), b.await.unwrap())
        })
        .await
        .expect("flights for different keys blocked each other");
        assert_eq!(a.unwrap(), Flight::Led("CCTV-1"));
        assert_eq!(b.unwrap(), Flight::Led("CCTV-2"));
    }

    #[tokio::test]
    async fn map_lock_is_free_during_work() {
        let flight = SingleFlight::new();
        let result: Result<_, ()> = flight
            .run(key("CCTV-1"), || async {
                // Would deadlock if the map lock were held across the work
                Ok(flight.in_flight())
            })
            .await;
        assert_eq!(result.unwrap(), Flight::Led(1));
    }
}
