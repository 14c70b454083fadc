//! `pulse metrics`: one fetch, rendered.

use crate::cli::args::MetricsArgs;
use crate::cli::auth::{build_session, ensure_logged_in};
use crate::core::api;
use crate::error::Result;
use crate::render;
use crate::storage::config::ResolvedConfig;

/// Execute the metrics command.
///
/// # Errors
///
/// Configuration, session or API errors.
pub async fn execute(args: &MetricsArgs, config: &ResolvedConfig) -> Result<()> {
    let query = args.query.resolve(config.polling.query)?;
    let session = build_session(config)?;
    ensure_logged_in(&session, &args.session).await?;

    let metrics = api::fetch_metrics(&session, query).await?;
    println!(
        "{}",
        render::render_metrics(&metrics, query, config.format, config.pretty, config.no_color)?
    );
    Ok(())
}
