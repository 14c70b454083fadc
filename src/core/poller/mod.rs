//! Polling data subscription with exponential backoff.
//!
//! A [`Poller`] wraps one fetch operation and keeps calling it: on the base
//! interval while it succeeds, on a doubling delay while it fails, and not at
//! all once the failure budget is spent (until [`Poller::resume_polling`]).
//! Hiding the host drops the timer; showing it fetches right away.
//!
//! Each poller is one tokio task owning the single timer. The handle talks
//! to it over a command channel and observes it through a `watch` channel.
//! Dropping the handle aborts the task, so a response arriving afterwards is
//! never applied.

pub mod machine;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Sleep;

pub use machine::{Directive, PollMachine, PollPhase};

use crate::error::Result;

/// Default base interval between successful fetches.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Default number of retries after the first failure.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Host visibility, the input that suspends and resumes scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Polling configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Base interval. Zero disables polling: one fetch, nothing scheduled.
    pub interval: Duration,
    pub max_retries: u32,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl PollOptions {
    #[must_use]
    pub const fn new(interval: Duration, max_retries: u32) -> Self {
        Self {
            interval,
            max_retries,
        }
    }
}

/// Observable state of a subscription.
#[derive(Debug)]
pub struct PollSnapshot<T> {
    pub data: Option<Arc<T>>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub is_polling_paused: bool,
    pub consecutive_failures: u32,
    pub phase: PollPhase,
}

impl<T> Clone for PollSnapshot<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            is_loading: self.is_loading,
            error: self.error.clone(),
            last_updated: self.last_updated,
            is_polling_paused: self.is_polling_paused,
            consecutive_failures: self.consecutive_failures,
            phase: self.phase,
        }
    }
}

impl<T> Default for PollSnapshot<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
            last_updated: None,
            is_polling_paused: false,
            consecutive_failures: 0,
            phase: PollPhase::Active,
        }
    }
}

type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;

enum Command {
    Refetch(oneshot::Sender<bool>),
    Resume(oneshot::Sender<()>),
    Visibility(Visibility, oneshot::Sender<()>),
}

/// Handle to a running poll subscription.
pub struct Poller<T> {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<PollSnapshot<T>>,
    task: JoinHandle<()>,
}

impl<T> std::fmt::Debug for Poller<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshots.borrow();
        f.debug_struct("Poller")
            .field("phase", &snapshot.phase)
            .field("consecutive_failures", &snapshot.consecutive_failures)
            .field("is_loading", &snapshot.is_loading)
            .finish_non_exhaustive()
    }
}

impl<T: Send + Sync + 'static> Poller<T> {
    /// Start polling. The first fetch is issued immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F, Fut>(options: PollOptions, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let fetcher: Fetcher<T> = Arc::new(move || fetch().boxed());
        let (commands, rx) = mpsc::unbounded_channel();
        let (tx, snapshots) = watch::channel(PollSnapshot::default());

        let driver = Driver {
            fetcher,
            machine: PollMachine::new(options.interval, options.max_retries),
            snapshot: tx,
            view: View::default(),
            timer: None,
            automatic: None,
        };
        let task = tokio::spawn(driver.run(rx));

        Self {
            commands,
            snapshots,
            task,
        }
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> PollSnapshot<T> {
        self.snapshots.borrow().clone()
    }

    #[must_use]
    pub fn data(&self) -> Option<Arc<T>> {
        self.snapshots.borrow().data.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.snapshots.borrow().is_loading
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.snapshots.borrow().error.clone()
    }

    #[must_use]
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.snapshots.borrow().last_updated
    }

    #[must_use]
    pub fn is_polling_paused(&self) -> bool {
        self.snapshots.borrow().is_polling_paused
    }

    /// Change notifications for renderers.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PollSnapshot<T>> {
        self.snapshots.clone()
    }

    /// Fetch now, outside the automatic schedule.
    ///
    /// Returns whether the fetch succeeded. Runs concurrently with any
    /// automatic fetch; whichever finishes last sets the data.
    pub async fn refetch(&self) -> bool {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Refetch(tx)).is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Leave the paused state and fetch immediately. No-op when not paused.
    pub async fn resume_polling(&self) {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Resume(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Report host visibility.
    pub async fn set_visibility(&self, visibility: Visibility) {
        let (tx, rx) = oneshot::channel();
        if self
            .commands
            .send(Command::Visibility(visibility, tx))
            .is_ok()
        {
            let _ = rx.await;
        }
    }
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct View<T> {
    data: Option<Arc<T>>,
    error: Option<String>,
    last_updated: Option<DateTime<Utc>>,
    in_flight: usize,
    has_succeeded: bool,
}

impl<T> Default for View<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            last_updated: None,
            in_flight: 0,
            has_succeeded: false,
        }
    }
}

struct Driver<T> {
    fetcher: Fetcher<T>,
    machine: PollMachine,
    snapshot: watch::Sender<PollSnapshot<T>>,
    view: View<T>,
    timer: Option<Pin<Box<Sleep>>>,
    automatic: Option<BoxFuture<'static, Result<T>>>,
}

type ManualFetch<T> = BoxFuture<'static, (Result<T>, oneshot::Sender<bool>)>;

impl<T: Send + Sync + 'static> Driver<T> {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut manual: FuturesUnordered<ManualFetch<T>> = FuturesUnordered::new();

        let directive = self.machine.start();
        self.apply(directive);
        self.publish();

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    match command {
                        Command::Refetch(reply) => {
                            self.begin_fetch();
                            let fetch = (self.fetcher)();
                            manual.push(fetch.map(move |result| (result, reply)).boxed());
                        }
                        Command::Resume(ack) => {
                            let directive = self.machine.resume();
                            tracing::debug!(?directive, "Polling resumed");
                            self.apply(directive);
                            let _ = ack.send(());
                        }
                        Command::Visibility(visibility, ack) => {
                            let directive = self
                                .machine
                                .set_visible(visibility == Visibility::Visible);
                            tracing::debug!(?visibility, ?directive, "Visibility changed");
                            self.apply(directive);
                            let _ = ack.send(());
                        }
                    }
                }
                () = wait_timer(&mut self.timer) => {
                    self.timer = None;
                    let directive = self.machine.on_timer();
                    self.apply(directive);
                }
                result = wait_fetch(&mut self.automatic) => {
                    self.automatic = None;
                    let success = self.finish_fetch(result);
                    let directive = self.machine.on_automatic_complete(success);
                    if self.machine.is_paused() {
                        tracing::warn!(
                            failures = self.machine.consecutive_failures(),
                            "Polling paused after repeated failures"
                        );
                    }
                    self.apply(directive);
                }
                Some((result, reply)) = manual.next(), if !manual.is_empty() => {
                    let success = self.finish_fetch(result);
                    let directive = self.machine.on_manual_complete(success);
                    self.apply(directive);
                    let _ = reply.send(success);
                }
            }
            self.publish();
        }
    }

    fn apply(&mut self, directive: Directive) {
        match directive {
            Directive::FetchNow => {
                self.begin_fetch();
                self.automatic = Some((self.fetcher)());
            }
            Directive::Arm(delay) => {
                tracing::debug!(delay_ms = delay.as_millis(), "Next fetch scheduled");
                self.timer = Some(Box::pin(tokio::time::sleep(delay)));
            }
            Directive::Disarm => self.timer = None,
            Directive::Idle => {}
        }
    }

    fn begin_fetch(&mut self) {
        self.view.in_flight += 1;
        self.view.error = None;
    }

    fn finish_fetch(&mut self, result: Result<T>) -> bool {
        self.view.in_flight = self.view.in_flight.saturating_sub(1);
        match result {
            Ok(data) => {
                self.view.data = Some(Arc::new(data));
                self.view.error = None;
                self.view.last_updated = Some(Utc::now());
                self.view.has_succeeded = true;
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "Fetch failed");
                self.view.error = Some(e.user_message());
                false
            }
        }
    }

    fn publish(&self) {
        let snapshot = PollSnapshot {
            data: self.view.data.clone(),
            is_loading: self.view.in_flight > 0 && !self.view.has_succeeded,
            error: self.view.error.clone(),
            last_updated: self.view.last_updated,
            is_polling_paused: self.machine.is_paused(),
            consecutive_failures: self.machine.consecutive_failures(),
            phase: self.machine.phase(),
        };
        self.snapshot.send_replace(snapshot);
    }
}

async fn wait_timer(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

async fn wait_fetch<T>(fetch: &mut Option<BoxFuture<'static, Result<T>>>) -> Result<T> {
    match fetch {
        Some(fetch) => fetch.await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PulseError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_test::traced_test;

    #[tokio::test(start_paused = true)]
    async fn first_fetch_populates_data() {
        let poller = Poller::spawn(PollOptions::new(Duration::from_secs(1), 3), || async {
            Ok::<_, PulseError>(7_u32)
        });
        let mut rx = poller.subscribe();
        rx.wait_for(|s| s.data.is_some()).await.unwrap();

        let snapshot = poller.snapshot();
        assert_eq!(snapshot.data.as_deref(), Some(&7));
        assert!(!snapshot.is_loading);
        assert!(snapshot.last_updated.is_some());
        assert_eq!(snapshot.phase, PollPhase::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_fetches_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let poller = Poller::spawn(PollOptions::new(Duration::ZERO, 3), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, PulseError>(()) }
        });

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!poller.is_polling_paused());
    }

    #[tokio::test(start_paused = true)]
    async fn error_surfaces_api_message() {
        let poller = Poller::spawn(PollOptions::new(Duration::from_secs(1), 3), || async {
            Err::<(), _>(PulseError::Api {
                code: "INTERNAL".to_string(),
                message: "Database unavailable".to_string(),
                status: Some(500),
            })
        });
        let mut rx = poller.subscribe();
        rx.wait_for(|s| s.error.is_some()).await.unwrap();

        assert_eq!(poller.error().as_deref(), Some("Database unavailable"));
        assert_eq!(poller.snapshot().consecutive_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_stops_fetching() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let poller = Poller::spawn(PollOptions::new(Duration::from_secs(1), 3), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, PulseError>(()) }
        });
        let mut rx = poller.subscribe();
        rx.wait_for(|s| s.last_updated.is_some()).await.unwrap();
        drop(poller);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn pausing_is_logged() {
        let poller = Poller::spawn(PollOptions::new(Duration::from_secs(1), 0), || async {
            Err::<(), _>(PulseError::Timeout(5))
        });
        let mut rx = poller.subscribe();
        rx.wait_for(|s| s.is_polling_paused).await.unwrap();

        assert!(logs_contain("Polling paused after repeated failures"));
    }
}
