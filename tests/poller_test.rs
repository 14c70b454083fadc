//! Poller scheduling tests on a paused tokio clock.
//!
//! Each fake fetcher records the virtual time of every call, so backoff
//! delays can be asserted exactly.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pulse::PulseError;
use pulse::core::poller::{PollOptions, PollPhase, Poller, Visibility};
use tokio::time::{Instant, sleep};

/// Fake fetch operation: fails while `failing` is set, otherwise returns a
/// sequence number.
struct Script {
    start: Instant,
    calls: Mutex<Vec<u128>>,
    failing: AtomicBool,
    served: AtomicU32,
    latency: Duration,
}

impl Script {
    fn new(failing: bool) -> Arc<Self> {
        Self::with_latency(failing, Duration::ZERO)
    }

    fn with_latency(failing: bool, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            start: Instant::now(),
            calls: Mutex::new(Vec::new()),
            failing: AtomicBool::new(failing),
            served: AtomicU32::new(0),
            latency,
        })
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Call times in milliseconds since the script was created.
    fn calls(&self) -> Vec<u128> {
        self.calls.lock().unwrap().clone()
    }

    fn spawn(self: &Arc<Self>, interval_ms: u64, max_retries: u32) -> Poller<u32> {
        let script = Arc::clone(self);
        Poller::spawn(
            PollOptions::new(Duration::from_millis(interval_ms), max_retries),
            move || {
                let script = Arc::clone(&script);
                script
                    .calls
                    .lock()
                    .unwrap()
                    .push(script.start.elapsed().as_millis());
                let failing = script.failing.load(Ordering::SeqCst);
                async move {
                    if !script.latency.is_zero() {
                        sleep(script.latency).await;
                    }
                    if failing {
                        Err(PulseError::Network("connection reset".to_string()))
                    } else {
                        Ok(script.served.fetch_add(1, Ordering::SeqCst) + 1)
                    }
                }
            },
        )
    }
}

#[tokio::test(start_paused = true)]
async fn backoff_doubles_then_pauses() {
    let script = Script::new(true);
    let poller = script.spawn(1000, 3);

    sleep(Duration::from_secs(60)).await;

    // Initial fetch, then interval x 2, x 4, x 8; the fourth failure exceeds
    // the retry budget.
    assert_eq!(script.calls(), vec![0, 2000, 6000, 14000]);
    let snapshot = poller.snapshot();
    assert!(snapshot.is_polling_paused);
    assert_eq!(snapshot.phase, PollPhase::Paused);
    assert_eq!(snapshot.consecutive_failures, 4);
    assert_eq!(snapshot.error.as_deref(), Some("network error: connection reset"));
}

#[tokio::test(start_paused = true)]
async fn success_resets_backoff() {
    let script = Script::new(true);
    let poller = script.spawn(1000, 3);
    let mut rx = poller.subscribe();

    rx.wait_for(|s| s.consecutive_failures == 2).await.unwrap();
    script.set_failing(false);

    sleep(Duration::from_millis(7500)).await;

    assert_eq!(script.calls(), vec![0, 2000, 6000, 7000]);
    let snapshot = poller.snapshot();
    assert_eq!(snapshot.consecutive_failures, 0);
    assert_eq!(snapshot.phase, PollPhase::Active);
    assert!(snapshot.error.is_none());
    assert_eq!(snapshot.data.as_deref(), Some(&2));
}

#[tokio::test(start_paused = true)]
async fn manual_success_resets_failures_but_stays_paused() {
    let script = Script::new(true);
    let poller = script.spawn(1000, 0);
    let mut rx = poller.subscribe();
    rx.wait_for(|s| s.is_polling_paused).await.unwrap();

    script.set_failing(false);
    assert!(poller.refetch().await);

    let snapshot = poller.snapshot();
    assert!(snapshot.is_polling_paused);
    assert_eq!(snapshot.consecutive_failures, 0);
    assert!(snapshot.error.is_none());
    assert_eq!(snapshot.data.as_deref(), Some(&1));

    sleep(Duration::from_secs(30)).await;
    assert_eq!(script.calls().len(), 2, "paused poller must not fetch on its own");
}

#[tokio::test(start_paused = true)]
async fn manual_failures_count_toward_budget() {
    let script = Script::new(false);
    let poller = script.spawn(1000, 1);
    let mut rx = poller.subscribe();
    rx.wait_for(|s| s.data.is_some()).await.unwrap();

    script.set_failing(true);
    assert!(!poller.refetch().await);
    assert_eq!(poller.snapshot().consecutive_failures, 1);
    assert!(!poller.is_polling_paused());

    assert!(!poller.refetch().await);
    assert!(poller.is_polling_paused());

    sleep(Duration::from_secs(30)).await;
    // One automatic fetch plus two manual ones; the pending timer was dropped.
    assert_eq!(script.calls(), vec![0, 0, 0]);
}

#[tokio::test(start_paused = true)]
async fn resume_restarts_with_fresh_budget() {
    let script = Script::new(true);
    let poller = script.spawn(1000, 1);
    let mut rx = poller.subscribe();
    rx.wait_for(|s| s.is_polling_paused).await.unwrap();
    assert_eq!(script.calls(), vec![0, 2000]);

    sleep_until_ms(&script, 10_000).await;
    poller.resume_polling().await;
    rx.wait_for(|s| s.consecutive_failures == 1 && !s.is_polling_paused)
        .await
        .unwrap();
    assert_eq!(poller.snapshot().phase, PollPhase::BackingOff);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(script.calls(), vec![0, 2000, 10_000, 12_000]);
    assert!(poller.is_polling_paused());
}

#[tokio::test(start_paused = true)]
async fn resume_is_noop_when_not_paused() {
    let script = Script::new(false);
    let poller = script.spawn(1000, 3);
    let mut rx = poller.subscribe();
    rx.wait_for(|s| s.data.is_some()).await.unwrap();

    poller.resume_polling().await;
    sleep(Duration::from_millis(1500)).await;

    assert_eq!(script.calls(), vec![0, 1000]);
}

#[tokio::test(start_paused = true)]
async fn hidden_host_suspends_without_counting_failures() {
    let script = Script::new(false);
    let poller = script.spawn(1000, 3);

    sleep(Duration::from_millis(500)).await;
    poller.set_visibility(Visibility::Hidden).await;
    assert_eq!(poller.snapshot().phase, PollPhase::Suspended);

    sleep_until_ms(&script, 5000).await;
    assert_eq!(script.calls(), vec![0]);
    assert_eq!(poller.snapshot().consecutive_failures, 0);

    poller.set_visibility(Visibility::Visible).await;
    sleep(Duration::from_millis(1500)).await;

    assert_eq!(script.calls(), vec![0, 5000, 6000]);
    assert_eq!(poller.snapshot().phase, PollPhase::Active);
}

#[tokio::test(start_paused = true)]
async fn becoming_visible_while_paused_does_not_fetch() {
    let script = Script::new(true);
    let poller = script.spawn(1000, 0);
    let mut rx = poller.subscribe();
    rx.wait_for(|s| s.is_polling_paused).await.unwrap();

    poller.set_visibility(Visibility::Hidden).await;
    poller.set_visibility(Visibility::Visible).await;
    sleep(Duration::from_secs(10)).await;

    assert_eq!(script.calls(), vec![0]);
    assert_eq!(poller.snapshot().phase, PollPhase::Paused);
}

#[tokio::test(start_paused = true)]
async fn loading_only_until_first_success() {
    let script = Script::with_latency(false, Duration::from_millis(100));
    let poller = script.spawn(1000, 3);
    let mut rx = poller.subscribe();

    rx.wait_for(|s| s.is_loading).await.unwrap();
    rx.wait_for(|s| s.data.is_some()).await.unwrap();
    assert!(!poller.is_loading());

    // Second fetch starts at 1100 and is in flight until 1200.
    sleep_until_ms(&script, 1150).await;
    assert_eq!(script.calls(), vec![0, 1100]);
    let snapshot = poller.snapshot();
    assert!(!snapshot.is_loading);
    assert_eq!(snapshot.data.as_deref(), Some(&1));
}

#[tokio::test(start_paused = true)]
async fn zero_interval_never_pauses() {
    let script = Script::new(true);
    let poller = script.spawn(0, 0);
    let mut rx = poller.subscribe();
    rx.wait_for(|s| s.error.is_some()).await.unwrap();

    sleep(Duration::from_secs(60)).await;
    assert_eq!(script.calls(), vec![0]);
    assert!(!poller.is_polling_paused());
}

async fn sleep_until_ms(script: &Script, ms: u64) {
    tokio::time::sleep_until(script.start + Duration::from_millis(ms)).await;
}
