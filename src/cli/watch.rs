//! `pulse watch`: live polling in line mode or the TUI dashboard.
//!
//! Line mode prints a frame whenever the visible state changes and exits on
//! Ctrl+C, or after the single fetch when the interval is zero. On a terminal
//! it also reads commands from stdin: Enter resumes paused polling and `r`
//! refetches.

use std::io::BufRead;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;

use crate::cli::args::{OutputFormat, WatchArgs};
use crate::cli::auth::{build_session, ensure_logged_in};
use crate::core::api::{self, MetricsQuery};
use crate::core::models::CategoryWithMetrics;
use crate::core::poller::{PollOptions, PollPhase, PollSnapshot, Poller};
use crate::core::session::SessionEvent;
use crate::error::{PulseError, Result};
use crate::render::{human, robot};
use crate::storage::config::ResolvedConfig;

/// Poll options from flags, falling back to the config file.
#[must_use]
pub fn poll_options(args: &WatchArgs, defaults: PollOptions) -> PollOptions {
    PollOptions::new(
        args.interval
            .map_or(defaults.interval, Duration::from_secs),
        args.max_retries.unwrap_or(defaults.max_retries),
    )
}

/// Execute the watch command.
///
/// # Errors
///
/// `SessionExpired` when renewal fails while watching, configuration
/// errors, or terminal I/O errors.
pub async fn execute(args: &WatchArgs, config: &ResolvedConfig) -> Result<()> {
    let query = args.query.resolve(config.polling.query)?;
    let options = poll_options(args, config.polling.options);

    let session = build_session(config)?;
    ensure_logged_in(&session, &args.session).await?;

    let session_events = session.subscribe();
    let poller = api::poll_metrics(&session, query, options);

    if args.tui {
        return crate::tui::run_dashboard(poller, session_events, query).await;
    }

    let interactive = config.format != OutputFormat::Json && crate::util::env::stdin_is_tty();
    let renderer =
        LineRenderer::new(query, config.format, config.no_color).with_resume_hint(interactive);
    let commands = interactive.then(spawn_stdin_commands);
    run_lines(poller, session_events, renderer, commands, options.interval.is_zero()).await
}

/// A command typed into line-mode watch, one per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineCommand {
    Resume,
    Refetch,
}

impl LineCommand {
    fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "" | "p" => Some(Self::Resume),
            "r" => Some(Self::Refetch),
            _ => None,
        }
    }
}

/// Forward stdin commands from a plain thread so a pending read never holds
/// up runtime shutdown.
fn spawn_stdin_commands() -> mpsc::Receiver<LineCommand> {
    let (tx, rx) = mpsc::channel(8);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            match LineCommand::parse(&line) {
                Some(command) => {
                    if tx.blocking_send(command).is_err() {
                        break;
                    }
                }
                None => tracing::debug!(%line, "Ignoring unknown watch command"),
            }
        }
    });
    rx
}

async fn next_command(commands: &mut Option<mpsc::Receiver<LineCommand>>) -> Option<LineCommand> {
    match commands {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn run_lines(
    poller: Poller<CategoryWithMetrics>,
    mut session_events: tokio::sync::broadcast::Receiver<SessionEvent>,
    mut renderer: LineRenderer,
    mut commands: Option<mpsc::Receiver<LineCommand>>,
    single_fetch: bool,
) -> Result<()> {
    let mut snapshots = poller.subscribe();

    // Ctrl+C handler for clean shutdown.
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = shutdown_tx.send(());
    });

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if let Some(frame) = renderer.frame(&snapshot)? {
                    println!("{frame}");
                }
                if single_fetch && is_settled(&snapshot) {
                    break;
                }
            }
            event = session_events.recv() => match event {
                Ok(SessionEvent::Expired { reason }) => {
                    return Err(PulseError::SessionExpired { reason });
                }
                Ok(other) => tracing::debug!(?other, "Session event"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Session events lagged");
                }
                Err(RecvError::Closed) => break,
            },
            // Stdin closing disables this branch for the iteration.
            Some(command) = next_command(&mut commands) => match command {
                LineCommand::Resume => {
                    if poller.is_polling_paused() {
                        tracing::info!("Resuming polling from stdin");
                        poller.resume_polling().await;
                    }
                }
                LineCommand::Refetch => {
                    let ok = poller.refetch().await;
                    tracing::debug!(ok, "Manual refetch from stdin");
                }
            },
            _ = &mut shutdown_rx => break,
        }
    }

    Ok(())
}

fn is_settled<T>(snapshot: &PollSnapshot<T>) -> bool {
    !snapshot.is_loading && (snapshot.last_updated.is_some() || snapshot.error.is_some())
}

/// Turns snapshots into printable frames, skipping ones that changed
/// nothing a reader would see.
#[derive(Debug)]
pub struct LineRenderer {
    query: MetricsQuery,
    format: OutputFormat,
    no_color: bool,
    resume_hint: bool,
    last_shown: Option<FrameKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FrameKey {
    last_updated: Option<DateTime<Utc>>,
    error: Option<String>,
    phase: PollPhase,
    failures: u32,
}

impl LineRenderer {
    #[must_use]
    pub const fn new(query: MetricsQuery, format: OutputFormat, no_color: bool) -> Self {
        Self {
            query,
            format,
            no_color,
            resume_hint: false,
            last_shown: None,
        }
    }

    /// Tell the reader how to resume when polling is paused.
    #[must_use]
    pub fn with_resume_hint(mut self, resume_hint: bool) -> Self {
        self.resume_hint = resume_hint;
        self
    }

    /// Render `snapshot` if it differs from the last frame shown.
    ///
    /// JSON mode emits every loading transition too, one line per update.
    ///
    /// # Errors
    ///
    /// Returns `Json` if serialization fails.
    pub fn frame(&mut self, snapshot: &PollSnapshot<CategoryWithMetrics>) -> Result<Option<String>> {
        if self.format == OutputFormat::Json {
            return robot::render_watch_tick(snapshot).map(Some);
        }

        if snapshot.is_loading {
            return Ok(None);
        }
        let key = FrameKey {
            last_updated: snapshot.last_updated,
            error: snapshot.error.clone(),
            phase: snapshot.phase,
            failures: snapshot.consecutive_failures,
        };
        if self.last_shown.as_ref() == Some(&key) {
            return Ok(None);
        }
        self.last_shown = Some(key);
        let mut frame = human::render_watch_frame(snapshot, self.query, self.no_color);
        if self.resume_hint && snapshot.is_polling_paused {
            if !frame.ends_with('\n') {
                frame.push('\n');
            }
            frame.push_str("Press Enter to resume polling, or type r and Enter to refetch.");
        }
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::Category;
    use std::sync::Arc;

    fn loaded() -> PollSnapshot<CategoryWithMetrics> {
        PollSnapshot {
            data: Some(Arc::new(crate::test_utils::make_metrics(
                Category::Overview,
                &[("users", 3)],
            ))),
            last_updated: Some(Utc::now()),
            ..PollSnapshot::default()
        }
    }

    #[test]
    fn human_frames_skip_loading_and_duplicates() {
        let mut renderer = LineRenderer::new(MetricsQuery::default(), OutputFormat::Human, true);

        let loading = PollSnapshot::<CategoryWithMetrics> {
            is_loading: true,
            ..PollSnapshot::default()
        };
        assert!(renderer.frame(&loading).unwrap().is_none());

        let snapshot = loaded();
        let frame = renderer.frame(&snapshot).unwrap().unwrap();
        assert!(frame.contains("users"));
        assert!(renderer.frame(&snapshot).unwrap().is_none());

        let failed = PollSnapshot {
            error: Some("Server unavailable".to_string()),
            consecutive_failures: 1,
            phase: PollPhase::BackingOff,
            ..snapshot
        };
        let frame = renderer.frame(&failed).unwrap().unwrap();
        assert!(frame.contains("Server unavailable"));
    }

    #[test]
    fn json_frames_every_update() {
        let mut renderer = LineRenderer::new(MetricsQuery::default(), OutputFormat::Json, true);
        let snapshot = loaded();
        assert!(renderer.frame(&snapshot).unwrap().is_some());
        let line = renderer.frame(&snapshot).unwrap().unwrap();
        assert!(!line.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["command"], "watch");
        assert_eq!(value["data"]["phase"], "active");
    }

    #[test]
    fn paused_frame_explains_how_to_resume() {
        let paused = PollSnapshot::<CategoryWithMetrics> {
            error: Some("Server unavailable".to_string()),
            is_polling_paused: true,
            consecutive_failures: 4,
            phase: PollPhase::Paused,
            ..PollSnapshot::default()
        };

        let mut interactive = LineRenderer::new(MetricsQuery::default(), OutputFormat::Human, true)
            .with_resume_hint(true);
        let frame = interactive.frame(&paused).unwrap().unwrap();
        assert!(frame.contains("Press Enter to resume"), "{frame}");

        let mut piped = LineRenderer::new(MetricsQuery::default(), OutputFormat::Human, true);
        let frame = piped.frame(&paused).unwrap().unwrap();
        assert!(!frame.contains("Press Enter"), "{frame}");
    }

    #[test]
    fn stdin_commands_parse() {
        assert_eq!(LineCommand::parse(""), Some(LineCommand::Resume));
        assert_eq!(LineCommand::parse("p\n"), Some(LineCommand::Resume));
        assert_eq!(LineCommand::parse(" r "), Some(LineCommand::Refetch));
        assert_eq!(LineCommand::parse("quit"), None);
    }

    #[test]
    fn settled_after_first_outcome() {
        assert!(!is_settled(&PollSnapshot::<()>::default()));
        assert!(is_settled(&PollSnapshot::<()> {
            error: Some("x".to_string()),
            ..PollSnapshot::default()
        }));
    }

    #[test]
    fn flags_override_config_defaults() {
        use clap::Parser;
        let cli = crate::cli::Cli::try_parse_from(["pulse", "watch", "--interval", "0"]).unwrap();
        let Some(crate::cli::Commands::Watch(args)) = cli.command else {
            panic!("expected watch");
        };
        let options = poll_options(&args, PollOptions::default());
        assert!(options.interval.is_zero());
        assert_eq!(options.max_retries, 3);
    }
}
