//! Map validated CLI matches to an action.

use crate::cli::{
    actions::{server::Args, Action},
    commands::{
        github, ARG_DEBUG_URL, ARG_DSN, ARG_FRONTEND_URL, ARG_PORT, ARG_SESSION_TTL_SECONDS,
        ARG_STATIC_DIR, ARG_SWEEP_INTERVAL_SECONDS,
    },
};
use anyhow::{Context, Result};
use std::{path::PathBuf, time::Duration};
use url::Url;

/// # Errors
/// Returns an error if required arguments are missing or a URL is invalid.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .filter(|v| !v.trim().is_empty());

    let frontend_url = matches
        .get_one::<String>(ARG_FRONTEND_URL)
        .cloned()
        .context("missing required argument: --frontend-url")?;
    Url::parse(&frontend_url).context("invalid DASHGATE_FRONTEND_URL")?;

    let debug_url = matches
        .get_one::<String>(ARG_DEBUG_URL)
        .context("missing required argument: --debug-url")?;
    let debug_url = base_url(debug_url).context("invalid DASHGATE_DEBUG_URL")?;

    let static_dir = matches
        .get_one::<String>(ARG_STATIC_DIR)
        .map_or_else(|| PathBuf::from("./app/dist/micro"), PathBuf::from);

    let session_ttl = Duration::from_secs(
        matches
            .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
            .copied()
            .unwrap_or(2_592_000),
    );
    let sweep_interval = Duration::from_secs(
        matches
            .get_one::<u64>(ARG_SWEEP_INTERVAL_SECONDS)
            .copied()
            .unwrap_or(300),
    );

    let github_opts = github::Options::parse(matches)?;
    let github_api_url =
        base_url(&github_opts.api_url).context("invalid DASHGATE_GITHUB_API_URL")?;
    let github_oauth_url =
        base_url(&github_opts.oauth_url).context("invalid DASHGATE_GITHUB_OAUTH_URL")?;

    Ok(Action::Server(Args {
        port,
        dsn,
        frontend_url,
        static_dir,
        debug_url,
        session_ttl,
        sweep_interval,
        github_client_id: github_opts.client_id,
        github_client_secret: github_opts.client_secret,
        github_redirect_url: github_opts.redirect_url,
        github_team_id: github_opts.team_id,
        github_api_url,
        github_oauth_url,
    }))
}

/// Parse a base URL so that relative joins keep its path.
fn base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
