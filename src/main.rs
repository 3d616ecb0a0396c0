use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pim_rdf::cli::App;

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;

    let app = App::parse();

    // Logs go to stderr so stdout carries only the report
    let default = if app.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    app.run().await
}
