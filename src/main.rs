//! nwrfc_exporter binary
//!
//! Parses the command line and dispatches to the `web`, `pw` or `config` subcommand.

use clap::Parser;
use nwrfc_exporter::cli::{Cli, Command};
use nwrfc_exporter::commands;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config_path = Path::new(&cli.config);

    match cli.command {
        None => commands::web(config_path, None, None).await?,
        Some(Command::Web { timeout, port }) => commands::web(config_path, timeout, port).await?,
        Some(Command::Pw { systems }) => {
            let password = commands::password_from_stdin()?;
            commands::pw(config_path, &systems, &password).await?;
        }
        Some(Command::Config { output }) => {
            commands::write_config_template(output.as_deref().map(Path::new))?
        }
    }

    Ok(())
}
