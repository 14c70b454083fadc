//! `login`, `register` and `logout`, plus session setup shared by the
//! commands that talk to the backend.

use std::io::{BufRead, Write};
use std::sync::Arc;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;

use crate::cli::args::{LoginArgs, RegisterArgs, SessionArgs};
use crate::core::api;
use crate::core::refresh_store::{
    KeyringRefreshStore, MemoryRefreshStore, RefreshMode, RefreshStore,
};
use crate::core::session::{SessionClient, SessionOptions};
use crate::error::{PulseError, Result};
use crate::render;
use crate::storage::config::ResolvedConfig;

/// Password source for non-interactive use.
pub const ENV_PASSWORD: &str = "PULSE_PASSWORD";

/// Build the session client for the resolved configuration.
///
/// Body mode keeps the refresh token in the OS keyring so a later run can
/// renew without logging in again.
///
/// # Errors
///
/// `ConfigMissing` without a base URL in cookie mode, or an HTTP client
/// construction error.
pub fn build_session(config: &ResolvedConfig) -> Result<SessionClient> {
    let base_url = config.require_base_url()?;
    let store: Arc<dyn RefreshStore> = match config.refresh_mode {
        RefreshMode::Body => Arc::new(KeyringRefreshStore::new(base_url)),
        RefreshMode::Cookie => Arc::new(MemoryRefreshStore::new()),
    };
    tracing::debug!(
        base_url,
        mode = %config.refresh_mode,
        timeout_secs = config.timeout.as_secs(),
        "Building session"
    );
    SessionClient::new(
        SessionOptions::new(base_url)
            .mode(config.refresh_mode)
            .timeout(config.timeout)
            .refresh_store(store),
    )
}

/// Log in first when `--email` was given.
///
/// # Errors
///
/// Propagates password and login failures.
pub async fn ensure_logged_in(session: &SessionClient, args: &SessionArgs) -> Result<()> {
    if let Some(email) = &args.email {
        let password = read_password(email)?;
        api::login(session, email, &password).await?;
    } else {
        tracing::debug!(mode = %session.mode(), "No --email given; relying on 401 renewal");
    }
    Ok(())
}

/// Password from `PULSE_PASSWORD`, else a hidden prompt on a terminal, else
/// one line from stdin.
///
/// # Errors
///
/// `NotAuthenticated` when no password is available or the prompt was
/// cancelled.
pub fn read_password(email: &str) -> Result<String> {
    if let Some(password) = std::env::var(ENV_PASSWORD).ok().filter(|p| !p.is_empty()) {
        return Ok(password);
    }

    let password = if crate::util::env::stdin_is_tty() {
        eprint!("Password for {email}: ");
        std::io::stderr().flush()?;
        let typed = read_hidden_line();
        eprintln!();
        typed?
    } else {
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        line.trim_end_matches(['\r', '\n']).to_string()
    };
    if password.is_empty() {
        return Err(PulseError::NotAuthenticated {
            hint: format!("no password given; set {ENV_PASSWORD} or pipe it on stdin"),
        });
    }
    Ok(password)
}

/// What one key press does to a hidden prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptStep {
    Continue,
    Submit,
    Cancel,
}

fn apply_prompt_key(buffer: &mut String, key: KeyEvent) -> PromptStep {
    match key.code {
        KeyCode::Enter => PromptStep::Submit,
        KeyCode::Esc => PromptStep::Cancel,
        KeyCode::Char('c' | 'd') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            PromptStep::Cancel
        }
        KeyCode::Backspace => {
            buffer.pop();
            PromptStep::Continue
        }
        KeyCode::Char(c) => {
            buffer.push(c);
            PromptStep::Continue
        }
        _ => PromptStep::Continue,
    }
}

/// Leaves raw mode when dropped, so an error mid-prompt restores echo.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Read a line from the terminal with echo off.
fn read_hidden_line() -> Result<String> {
    let _raw = RawModeGuard::enable()?;
    let mut buffer = String::new();
    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match apply_prompt_key(&mut buffer, key) {
            PromptStep::Continue => {}
            PromptStep::Submit => return Ok(buffer),
            PromptStep::Cancel => {
                return Err(PulseError::NotAuthenticated {
                    hint: "password prompt cancelled".to_string(),
                });
            }
        }
    }
}

/// Execute `pulse login`.
///
/// # Errors
///
/// `LoginRejected`, transport or configuration errors.
pub async fn login(args: &LoginArgs, config: &ResolvedConfig) -> Result<()> {
    let session = build_session(config)?;
    let password = read_password(&args.email)?;
    let user = api::login(&session, &args.email, &password).await?;
    println!(
        "{}",
        render::render_user("login", &user, config.format, config.pretty, config.no_color)?
    );
    Ok(())
}

/// Execute `pulse register`.
///
/// # Errors
///
/// `LoginRejected`, transport or configuration errors.
pub async fn register(args: &RegisterArgs, config: &ResolvedConfig) -> Result<()> {
    let session = build_session(config)?;
    let password = read_password(&args.email)?;
    let user = api::register(&session, &args.name, &args.email, &password).await?;
    println!(
        "{}",
        render::render_user("register", &user, config.format, config.pretty, config.no_color)?
    );
    Ok(())
}

/// Execute `pulse logout`. Always succeeds once configuration resolves.
///
/// # Errors
///
/// Configuration errors only.
pub async fn logout(config: &ResolvedConfig) -> Result<()> {
    let session = build_session(config)?;
    api::logout(&session).await;
    if config.format == crate::cli::args::OutputFormat::Human {
        println!("Logged out");
    } else {
        println!(
            "{}",
            render::robot::render_json(
                &render::robot::RobotOutput::new("logout", serde_json::json!({ "loggedOut": true })),
                config.pretty,
            )?
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn prompt_collects_and_edits_characters() {
        let mut buffer = String::new();
        for c in "hunter3".chars() {
            assert_eq!(apply_prompt_key(&mut buffer, press(KeyCode::Char(c))), PromptStep::Continue);
        }
        apply_prompt_key(&mut buffer, press(KeyCode::Backspace));
        apply_prompt_key(&mut buffer, press(KeyCode::Char('2')));

        assert_eq!(apply_prompt_key(&mut buffer, press(KeyCode::Enter)), PromptStep::Submit);
        assert_eq!(buffer, "hunter2");
    }

    #[test]
    fn prompt_cancels_on_ctrl_c_and_escape() {
        let mut buffer = String::from("partial");
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(apply_prompt_key(&mut buffer, ctrl_c), PromptStep::Cancel);
        assert_eq!(apply_prompt_key(&mut buffer, press(KeyCode::Esc)), PromptStep::Cancel);
        assert_eq!(buffer, "partial");
    }

    #[test]
    fn backspace_on_empty_prompt_is_harmless() {
        let mut buffer = String::new();
        assert_eq!(apply_prompt_key(&mut buffer, press(KeyCode::Backspace)), PromptStep::Continue);
        assert!(buffer.is_empty());
    }
}
