//! Domains command handler.

use std::path::Path;
use std::process::ExitCode;

use color_eyre::Result;

use crate::config::Config;

use super::App;

fn presence(path: &Path) -> &'static str {
    if path.is_file() {
        "present"
    } else {
        "missing"
    }
}

impl App {
    /// Print the effective domains and constraint mappings for `root`.
    pub fn run_domains(&self, root: &Path) -> Result<ExitCode> {
        let config = Config::load(root)?;

        println!("Domains (merge order):");
        for domain in &config.domains {
            let path = domain.path(root);
            println!(
                "  {:<12} {:<20} {:<9} {:<8} {}",
                domain.name,
                domain.filename.display(),
                if domain.required { "required" } else { "optional" },
                presence(&path),
                domain.description
            );
        }

        println!("\nConstraint mappings:");
        for mapping in &config.constraints {
            println!(
                "  {} ({}) -> {} ({})",
                mapping.data_file.display(),
                presence(&root.join(&mapping.data_file)),
                mapping.shape_file.display(),
                presence(&root.join(&mapping.shape_file)),
            );
        }

        println!(
            "\nArtifact: {}",
            config.artifact_path(root).display()
        );
        Ok(ExitCode::SUCCESS)
    }
}
