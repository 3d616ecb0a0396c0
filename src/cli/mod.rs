//! CLI module for pim-rdf.
//!
//! Subcommands:
//! - `validate`: Run the validation pipeline and print the report
//! - `query`: Run one SPARQL file against a data file
//! - `domains`: Show the effective domain list and constraint mappings

mod domains;
mod query;
mod validate;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

pub use query::QueryCommand;
pub use validate::{OutputFormat, ValidateCommand};

/// pim-rdf - Validate, merge and query per-domain RDF files
#[derive(Parser)]
#[command(name = "pim-rdf")]
#[command(about = "Validation, merge and query pipeline for a file-based personal knowledge store")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate every domain file, merge them, run smoke-test queries and shape checks
    Validate(ValidateCommand),

    /// Run a SPARQL query file against a data file
    Query(QueryCommand),

    /// List the configured domains and constraint mappings
    Domains {
        /// Root directory holding the domain files
        #[arg(default_value = ".")]
        root: std::path::PathBuf,
    },
}

impl App {
    /// Run the CLI application.
    pub async fn run(self) -> color_eyre::Result<ExitCode> {
        match self.command {
            Command::Validate(cmd) => cmd.run().await,
            Command::Query(cmd) => cmd.run().await,
            Command::Domains { ref root } => self.run_domains(root),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        App::command().debug_assert();
    }

    #[test]
    fn test_validate_defaults() {
        let app = App::try_parse_from(["pim-rdf", "validate"]).unwrap();
        match app.command {
            Command::Validate(cmd) => {
                assert_eq!(cmd.root, std::path::PathBuf::from("."));
                assert_eq!(cmd.format, OutputFormat::Text);
            }
            _ => panic!("expected validate"),
        }
    }

    #[test]
    fn test_global_verbose_after_subcommand() {
        let app = App::try_parse_from(["pim-rdf", "domains", "data", "-v"]).unwrap();
        assert!(app.verbose);
        assert!(matches!(app.command, Command::Domains { ref root } if root.ends_with("data")));
    }

    #[test]
    fn test_query_arguments() {
        let args = ["pim-rdf", "query", "q.sparql", "-d", "build/merged.trig"];
        let app = App::try_parse_from(args).unwrap();
        match app.command {
            Command::Query(cmd) => {
                assert_eq!(cmd.query, std::path::PathBuf::from("q.sparql"));
                assert_eq!(cmd.data, Some(std::path::PathBuf::from("build/merged.trig")));
            }
            _ => panic!("expected query"),
        }
    }
}
