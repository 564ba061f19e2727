mod cli;
mod errors;
mod shutdown;
mod tracing;

use brewbump_github::{GitHubHost, Publisher, prepare_edit};
use clap::Parser;
use std::process::ExitCode;
use ::tracing::{info, warn};

use crate::cli::{Cli, Credentials};
use crate::errors::CliError;

#[tokio::main]
#[allow(clippy::print_stdout, clippy::print_stderr)]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(error) = crate::tracing::init_tracing(&cli.tracing_config()) {
        eprintln!("{:?}", miette::Report::new(error));
        return ExitCode::from(errors::EXIT_FAILURE);
    }

    match run(&cli).await {
        Ok(url) => {
            println!("{url}");
            ExitCode::SUCCESS
        }
        Err(error) if error.is_skip() => {
            warn!("Skipping: {error}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            let code = error.exit_code();
            eprintln!("{:?}", miette::Report::new(error));
            ExitCode::from(code)
        }
    }
}

async fn run(cli: &Cli) -> Result<String, CliError> {
    let config = cli.to_config()?;
    let credentials = Credentials::from_env();
    let cancel = shutdown::install_signal_handlers();

    let source = GitHubHost::new(credentials.source)?;
    let target = GitHubHost::new(credentials.target)?;

    let prepared = prepare_edit(&config, &source).await?;
    info!(
        formula = %prepared.formula_name,
        version = %prepared.version,
        tap = %prepared.request.repo,
        "Updating formula"
    );

    let url = Publisher::new(&target)
        .with_cancellation(cancel)
        .edit(&prepared.request, &|old: &str| prepared.rewrite(old))
        .await?;
    info!(url = %url, "Formula updated");

    Ok(url)
}
