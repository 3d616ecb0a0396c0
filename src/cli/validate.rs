//! Validate subcommand - run the full pipeline.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::debug;

use crate::config::Config;
use crate::context::Context;
use crate::pipeline::Pipeline;

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// Machine-readable JSON
    Json,
}

/// Run the validation pipeline over a root directory.
#[derive(Parser)]
pub struct ValidateCommand {
    /// Root directory holding the domain files and `pim.toml`.
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Report format written to stdout.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl ValidateCommand {
    /// Run the validate command. Exit status is 0 iff the run succeeded.
    pub async fn run(self) -> color_eyre::Result<ExitCode> {
        let config = Config::load(&self.root)?;
        debug!(
            domains = config.domains.len(),
            constraints = config.constraints.len(),
            format = ?config.pipeline.format,
            "Loaded configuration"
        );

        let pipeline = Pipeline::new(Context::new(&self.root, config));
        let report = pipeline.run().await;

        match self.format {
            OutputFormat::Text => println!("{report}"),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        }

        Ok(ExitCode::from(report.exit_code()))
    }
}
