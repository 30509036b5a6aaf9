//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the action the binary executes.

use crate::cli::{
    actions::{Action, server::Args},
    commands::{ARG_DSN, ARG_MAX_CONNECTIONS, ARG_PORT},
};
use anyhow::{Context, Result, anyhow};
use secrecy::SecretString;
use url::Url;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if the DSN is not a `postgres://` or `postgresql://` URL.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let max_connections = matches
        .get_one::<u32>(ARG_MAX_CONNECTIONS)
        .copied()
        .unwrap_or(5);

    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .map(|dsn| validate_dsn(dsn))
        .transpose()?;

    Ok(Action::Server(Args {
        port,
        dsn,
        max_connections,
    }))
}

fn validate_dsn(dsn: &str) -> Result<SecretString> {
    let url = Url::parse(dsn).context("invalid --dsn, expected a postgres:// URL")?;

    match url.scheme() {
        "postgres" | "postgresql" => Ok(SecretString::from(dsn)),
        scheme => Err(anyhow!(
            "unsupported --dsn scheme '{scheme}', expected postgres or postgresql"
        )),
    }
}
