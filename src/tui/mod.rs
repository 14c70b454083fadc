//! TUI dashboard module using ratatui.
//!
//! Full-screen view of one polled metrics category.

mod app;
mod dashboard;
mod event;
mod metrics_panel;

pub use app::App;
pub use dashboard::Dashboard;
pub use event::{Event, EventHandler, KeyAction};

use std::io;

use crossterm::{
    event::{DisableFocusChange, EnableFocusChange},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;

use crate::core::api::MetricsQuery;
use crate::core::models::CategoryWithMetrics;
use crate::core::poller::Poller;
use crate::core::session::SessionEvent;
use crate::error::Result;

/// Terminal type alias for the TUI backend.
pub type Tui = Terminal<CrosstermBackend<io::Stdout>>;

/// Initialize the terminal for TUI mode.
///
/// Focus reporting is enabled so losing focus can suspend polling.
///
/// # Errors
///
/// Returns an error if terminal initialization fails.
pub fn init_terminal() -> io::Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

/// Restore the terminal to normal mode.
///
/// # Errors
///
/// Returns an error if terminal restoration fails.
pub fn restore_terminal(terminal: &mut Tui) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableFocusChange
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the dashboard until the user quits or the session expires.
///
/// # Errors
///
/// Returns `SessionExpired` when renewal fails while the dashboard is open,
/// or `Io` if the terminal cannot be driven.
pub async fn run_dashboard(
    poller: Poller<CategoryWithMetrics>,
    session_events: tokio::sync::broadcast::Receiver<SessionEvent>,
    query: MetricsQuery,
) -> Result<()> {
    let mut terminal = init_terminal()?;

    let app_result = App::new(poller, session_events, query)
        .run(&mut terminal)
        .await;

    // Always try to restore terminal, even if app failed
    if let Err(e) = restore_terminal(&mut terminal) {
        eprintln!("Failed to restore terminal: {e}");
    }

    app_result
}
