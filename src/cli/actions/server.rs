use crate::{
    api::{
        self,
        state::{AppConfig, AppState},
    },
    debug::HttpDebugService,
    github::{GithubClient, GithubConfig},
    session::{memory::spawn_sweeper, MemoryStore, PgSessionStore, SessionStore},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub frontend_url: String,
    pub static_dir: PathBuf,
    pub debug_url: Url,
    pub session_ttl: Duration,
    pub sweep_interval: Duration,
    pub github_client_id: String,
    pub github_client_secret: SecretString,
    pub github_redirect_url: Option<String>,
    pub github_team_id: u64,
    pub github_api_url: Url,
    pub github_oauth_url: Url,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the session store, the HTTP clients or the server fail to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let store: Arc<dyn SessionStore> = match &args.dsn {
        Some(dsn) => Arc::new(PgSessionStore::connect(dsn).await?),
        None => {
            info!("Using in-memory session store");
            Arc::new(MemoryStore::new())
        }
    };
    let sweeper = spawn_sweeper(store.clone(), args.sweep_interval);

    let github = Arc::new(
        GithubClient::new(GithubConfig {
            client_id: args.github_client_id,
            client_secret: args.github_client_secret,
            redirect_url: args.github_redirect_url,
            team_id: args.github_team_id,
            oauth_url: args.github_oauth_url,
            api_url: args.github_api_url,
        })
        .context("Failed to build GitHub client")?,
    );

    let debug = Arc::new(
        HttpDebugService::new(args.debug_url).context("Failed to build debug service client")?,
    );

    let config = AppConfig::new(args.frontend_url)
        .with_static_dir(args.static_dir)
        .with_session_ttl(args.session_ttl);

    let state = Arc::new(AppState::new(
        config,
        store,
        github.clone(),
        github,
        debug,
    ));

    let result = api::new(args.port, state).await;
    sweeper.abort();
    result
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        (
            "session_store",
            args.dsn
                .as_deref()
                .map_or_else(|| "memory".to_string(), redact_dsn),
        ),
        ("frontend_url", args.frontend_url.clone()),
        ("static_dir", args.static_dir.display().to_string()),
        ("debug_url", args.debug_url.to_string()),
        ("session_ttl_seconds", args.session_ttl.as_secs().to_string()),
        (
            "sweep_interval_seconds",
            args.sweep_interval.as_secs().to_string(),
        ),
        ("github_client_id", args.github_client_id.clone()),
        ("github_team_id", args.github_team_id.to_string()),
        (
            "github_redirect_url",
            args.github_redirect_url
                .clone()
                .unwrap_or_else(|| "default".to_string()),
        ),
        ("github_api_url", args.github_api_url.to_string()),
        ("github_oauth_url", args.github_oauth_url.to_string()),
    ];
    info!("{}", format_entries("Startup configuration", &entries));
}

fn format_entries(title: &str, entries: &[(&str, String)]) -> String {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\n{title}:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    message
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_dsn_hides_password() {
        assert_eq!(
            redact_dsn("postgres://dash:hunter2@db:5432/dashgate"),
            "postgres://dash:REDACTED@db:5432/dashgate"
        );
        assert_eq!(
            redact_dsn("postgres://db:5432/dashgate"),
            "postgres://db:5432/dashgate"
        );
        assert_eq!(redact_dsn("::nope::"), "invalid-dsn");
    }

    #[test]
    fn short_commit_truncates() {
        assert_eq!(short_commit("0123456789abcdef"), "0123456");
        assert_eq!(short_commit("abc"), "abc");
    }

    #[test]
    fn format_entries_aligns_keys() {
        let message = format_entries(
            "Startup configuration",
            &[("port", "8080".to_string()), ("debug_url", "x".to_string())],
        );
        assert!(message.contains("\n  port:      8080"));
        assert!(message.contains("\n  debug_url: x"));
    }
}
