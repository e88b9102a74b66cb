use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

use crate::github::{DEFAULT_API_URL, DEFAULT_OAUTH_URL};

pub const ARG_GITHUB_CLIENT_ID: &str = "github-client-id";
pub const ARG_GITHUB_CLIENT_SECRET: &str = "github-client-secret";
pub const ARG_GITHUB_REDIRECT_URL: &str = "github-redirect-url";
pub const ARG_GITHUB_TEAM_ID: &str = "github-team-id";
pub const ARG_GITHUB_API_URL: &str = "github-api-url";
pub const ARG_GITHUB_OAUTH_URL: &str = "github-oauth-url";

#[derive(Debug)]
pub struct Options {
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_url: Option<String>,
    pub team_id: u64,
    pub api_url: String,
    pub oauth_url: String,
}

impl Options {
    /// Parse GitHub arguments from matches.
    ///
    /// # Errors
    /// Returns an error if required arguments are missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let read_required = |id: &str| -> anyhow::Result<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };

        let team_id = matches
            .get_one::<u64>(ARG_GITHUB_TEAM_ID)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_GITHUB_TEAM_ID}"))?;

        Ok(Self {
            client_id: read_required(ARG_GITHUB_CLIENT_ID)?,
            client_secret: SecretString::from(read_required(ARG_GITHUB_CLIENT_SECRET)?),
            redirect_url: matches
                .get_one::<String>(ARG_GITHUB_REDIRECT_URL)
                .cloned()
                .filter(|v| !v.trim().is_empty()),
            team_id,
            api_url: read_required(ARG_GITHUB_API_URL)?,
            oauth_url: read_required(ARG_GITHUB_OAUTH_URL)?,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_GITHUB_CLIENT_ID)
                .long(ARG_GITHUB_CLIENT_ID)
                .help("GitHub OAuth application client id")
                .env("DASHGATE_GITHUB_CLIENT_ID")
                .required(true),
        )
        .arg(
            Arg::new(ARG_GITHUB_CLIENT_SECRET)
                .long(ARG_GITHUB_CLIENT_SECRET)
                .help("GitHub OAuth application client secret")
                .env("DASHGATE_GITHUB_CLIENT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_GITHUB_REDIRECT_URL)
                .long(ARG_GITHUB_REDIRECT_URL)
                .help("OAuth callback URL, defaults to the one registered with the GitHub app")
                .env("DASHGATE_GITHUB_REDIRECT_URL"),
        )
        .arg(
            Arg::new(ARG_GITHUB_TEAM_ID)
                .long(ARG_GITHUB_TEAM_ID)
                .help("Numeric id of the team whose active members may log in")
                .env("DASHGATE_GITHUB_TEAM_ID")
                .required(true)
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_GITHUB_API_URL)
                .long(ARG_GITHUB_API_URL)
                .help("GitHub REST API base URL")
                .env("DASHGATE_GITHUB_API_URL")
                .default_value(DEFAULT_API_URL),
        )
        .arg(
            Arg::new(ARG_GITHUB_OAUTH_URL)
                .long(ARG_GITHUB_OAUTH_URL)
                .help("GitHub OAuth base URL")
                .env("DASHGATE_GITHUB_OAUTH_URL")
                .default_value(DEFAULT_OAUTH_URL),
        )
}
