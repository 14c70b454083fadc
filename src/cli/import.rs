//! `pulse import`: upload a CSV file.

use crate::cli::args::ImportArgs;
use crate::cli::auth::{build_session, ensure_logged_in};
use crate::core::api;
use crate::error::Result;
use crate::render;
use crate::storage::config::ResolvedConfig;

/// Execute the import command.
///
/// # Errors
///
/// `ConfigInvalid` for a non-CSV path, `Io` if the file cannot be read,
/// `Api` if the backend rejects it.
pub async fn execute(args: &ImportArgs, config: &ResolvedConfig) -> Result<()> {
    args.validate()?;
    let session = build_session(config)?;
    ensure_logged_in(&session, &args.session).await?;

    let summary = api::import_csv(&session, &args.file).await?;
    println!(
        "{}",
        render::render_import(&summary, config.format, config.pretty, config.no_color)?
    );
    Ok(())
}
