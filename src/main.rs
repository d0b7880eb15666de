// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Command-line interface for the releasegen binary.
//!
//! The binary loads the team configuration, queries every configured source
//! and prints the aggregated release report as JSON on stdout. Progress and
//! recoverable failures are logged to stderr.

use std::{io, path::PathBuf, process, time::Duration};

use clap::Parser;
use releasegen::{
    Aggregator, ClientOptions, Clients, DEFAULT_CONCURRENCY, Endpoints, Error, ReportBuilder,
    load_config, locate_config, write_report,
};
use tracing_subscriber::EnvFilter;

const LONG_ABOUT: &str = "\
Enumerates releases of the repositories owned by each configured team, across
GitHub organisations, Launchpad project groups and Gitea organisations.

Without --config the first existing file among ./releasegen.yaml,
$HOME/.config/releasegen.yaml and /etc/releasegen/releasegen.yaml is used.

A GitHub personal access token with read access to the configured orgs must be
supplied through RELEASEGEN_TOKEN or --token.";

/// Command line options.
#[derive(Debug, Parser,)]
#[command(name = "releasegen", version, about = "Enumerate team releases", long_about = LONG_ABOUT)]
struct Cli
{
    /// Path to the YAML configuration file.
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf,>,

    /// GitHub personal access token.
    #[arg(long = "token", env = "RELEASEGEN_TOKEN", hide_env_values = true)]
    token: Option<String,>,

    /// Timeout applied to each upstream request, in seconds.
    #[arg(long = "request-timeout", value_name = "SECS", default_value_t = 30)]
    request_timeout: u64,

    /// Repositories processed at once per source.
    #[arg(long = "concurrency", value_name = "N", default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,
}

/// Entry point that reports errors and sets the appropriate exit status.
#[tokio::main]
async fn main()
{
    init_tracing();

    if let Err(error,) = run(Cli::parse(),).await {
        eprintln!("{}", error.to_display_string());
        process::exit(1,);
    }
}

fn init_tracing()
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info",),);
    tracing_subscriber::fmt().with_env_filter(filter,).with_writer(io::stderr,).init();
}

/// Builds the report described by the CLI options and prints it.
///
/// # Errors
///
/// Returns an [`Error`] when the token is missing, the configuration cannot
/// be located, read or validated, or the report cannot be written.
async fn run(cli: Cli,) -> Result<(), Error,>
{
    let token = require_token(cli.token.as_deref(),)?;
    let path = locate_config(cli.config.as_deref(),)?;
    let config = load_config(&path,)?;
    tracing::debug!(path = %path.display(), teams = config.teams.len(), "loaded configuration");

    let options = ClientOptions {
        request_timeout: Duration::from_secs(cli.request_timeout,),
        ..ClientOptions::default()
    };
    let clients = Clients::new(token, Endpoints::default(), options,)?;
    let builder = ReportBuilder::new(clients, Aggregator::new(cli.concurrency,),);

    let reports = builder.build(&config,).await;

    let stdout = io::stdout();
    write_report(&reports, stdout.lock(),)
}

fn require_token(token: Option<&str,>,) -> Result<&str, Error,>
{
    token
        .map(str::trim,)
        .filter(|value| !value.is_empty(),)
        .ok_or_else(|| Error::validation("environment variable RELEASEGEN_TOKEN not set",),)
}
