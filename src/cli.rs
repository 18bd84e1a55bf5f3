//! CLI argument parsing for the mail-assist-worker binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mail-assist-worker", about = "Mail Assist templated email worker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the worker server (default if no subcommand given)
    Serve,
    /// Run database migrations and exit
    Migrate,
    /// Render a template file to stdout without touching the database
    Render {
        /// JSON file holding the template's block list
        #[arg(long)]
        template: PathBuf,
        /// CSV file of recipients; renders one document per row
        #[arg(long)]
        rows: Option<PathBuf>,
        /// Keep unfilled placeholders visible instead of removing them
        #[arg(long)]
        preview: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_migrate_command_parses() {
        let cli = Cli::parse_from(["mail-assist-worker", "migrate"]);
        assert!(matches!(cli.command, Some(Command::Migrate)));
    }

    #[test]
    fn test_cli_no_command_defaults_to_none() {
        let cli = Cli::parse_from(["mail-assist-worker"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_render_command_parses() {
        let cli = Cli::parse_from([
            "mail-assist-worker",
            "render",
            "--template",
            "welcome.json",
            "--rows",
            "people.csv",
            "--preview",
        ]);
        match cli.command {
            Some(Command::Render { template, rows, preview }) => {
                assert_eq!(template, PathBuf::from("welcome.json"));
                assert_eq!(rows, Some(PathBuf::from("people.csv")));
                assert!(preview);
            }
            _ => panic!("expected render command"),
        }
    }

    #[test]
    fn test_cli_render_requires_template() {
        assert!(Cli::try_parse_from(["mail-assist-worker", "render"]).is_err());
    }
}
