//! Application state and main event loop for the TUI dashboard.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::core::api::MetricsQuery;
use crate::core::models::CategoryWithMetrics;
use crate::core::poller::{Poller, Visibility};
use crate::core::session::SessionEvent;
use crate::error::{PulseError, Result};

use super::Tui;
use super::dashboard::Dashboard;
use super::event::{Event, EventHandler, KeyAction};

/// Application state for the TUI dashboard.
pub struct App {
    poller: Arc<Poller<CategoryWithMetrics>>,
    session_events: broadcast::Receiver<SessionEvent>,
    query: MetricsQuery,
    /// Whether the terminal currently has focus.
    focused: bool,
    show_help: bool,
    should_quit: bool,
    /// Set when the session ends underneath the dashboard.
    exit_error: Option<PulseError>,
}

impl App {
    #[must_use]
    pub fn new(
        poller: Poller<CategoryWithMetrics>,
        session_events: broadcast::Receiver<SessionEvent>,
        query: MetricsQuery,
    ) -> Self {
        Self {
            poller: Arc::new(poller),
            session_events,
            query,
            focused: true,
            show_help: false,
            should_quit: false,
            exit_error: None,
        }
    }

    /// Run the application event loop.
    ///
    /// # Errors
    ///
    /// Returns `SessionExpired` if the session could not be renewed, or an
    /// I/O error if drawing fails.
    pub async fn run(mut self, terminal: &mut Tui) -> Result<()> {
        let event_handler = EventHandler::new(100);

        while !self.should_quit {
            let snapshot = self.poller.snapshot();
            terminal.draw(|frame| {
                let dashboard = Dashboard::new(&snapshot, self.query, self.focused, self.show_help);
                frame.render_widget(dashboard, frame.area());
            })?;

            match event_handler.next() {
                Ok(Event::Key(key)) => {
                    self.handle_action(KeyAction::from_key_event(key)).await;
                }
                Ok(Event::FocusGained) => self.set_focus(true).await,
                Ok(Event::FocusLost) => self.set_focus(false).await,
                Ok(Event::Tick | Event::Resize(_, _)) => {}
                Err(e) => {
                    tracing::warn!("Event error: {e}");
                }
            }

            self.drain_session_events();
        }

        self.exit_error.map_or(Ok(()), Err)
    }

    async fn handle_action(&mut self, action: KeyAction) {
        // If help is shown, any key dismisses it
        if self.show_help && action != KeyAction::None {
            self.show_help = false;
            return;
        }

        match action {
            KeyAction::Quit => self.should_quit = true,
            KeyAction::Refresh => {
                // Manual fetches run in the background so the UI keeps drawing.
                let poller = Arc::clone(&self.poller);
                tokio::spawn(async move {
                    poller.refetch().await;
                });
            }
            KeyAction::Resume => self.poller.resume_polling().await,
            KeyAction::Help => self.show_help = !self.show_help,
            KeyAction::None => {}
        }
    }

    async fn set_focus(&mut self, focused: bool) {
        if self.focused == focused {
            return;
        }
        self.focused = focused;
        let visibility = if focused {
            Visibility::Visible
        } else {
            Visibility::Hidden
        };
        self.poller.set_visibility(visibility).await;
    }

    fn drain_session_events(&mut self) {
        loop {
            match self.session_events.try_recv() {
                Ok(SessionEvent::Expired { reason }) => {
                    self.exit_error = Some(PulseError::SessionExpired { reason });
                    self.should_quit = true;
                }
                Ok(SessionEvent::LoggedOut) => {
                    self.exit_error = Some(PulseError::NotAuthenticated {
                        hint: "the session was closed".to_string(),
                    });
                    self.should_quit = true;
                }
                Ok(SessionEvent::LoggedIn | SessionEvent::Renewed)
                | Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }
}
