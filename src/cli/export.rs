//! `pulse export`: download a CSV or PDF export.

use std::path::PathBuf;

use crate::cli::args::ExportArgs;
use crate::cli::auth::{build_session, ensure_logged_in};
use crate::core::api;
use crate::error::Result;
use crate::render;
use crate::storage::config::ResolvedConfig;

/// Execute the export command.
///
/// # Errors
///
/// `DownloadFailed`, `SessionExpired` or configuration errors.
pub async fn execute(args: &ExportArgs, config: &ResolvedConfig) -> Result<()> {
    let query = args.query.resolve(config.polling.query)?;
    let out_dir = match &args.output {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };

    let session = build_session(config)?;
    ensure_logged_in(&session, &args.session).await?;

    let path = api::export(&session, args.format.into(), query, &out_dir).await?;
    println!(
        "{}",
        render::render_export(&path, config.format, config.pretty, config.no_color)?
    );
    Ok(())
}
