//! PQR CLI
//!
//! Command-line interface for PQR - filing and following up claim records.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pqr_core::{open_storage, Config, RecordStore, StorageError, StoreError};

mod commands;
mod output;

use commands::create::CreateArgs;
use commands::record::EditArgs;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "pqr")]
#[command(about = "PQR - File and follow up claim/complaint records")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use a specific config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// File a new record
    #[command(alias = "new")]
    Create(CreateArgs),
    /// List all records
    #[command(alias = "ls")]
    List,
    /// Search records by id, order, carrier or purchase order
    Search {
        /// Search term (case-insensitive substring)
        term: String,
    },
    /// Show record details (including comments)
    Show {
        /// Record ID (PQR-0007, pqr-0007 or 7)
        id: String,
    },
    /// Update workflow fields of a record
    Edit {
        /// Record ID (PQR-0007, pqr-0007 or 7)
        id: String,
        #[command(flatten)]
        changes: EditArgs,
    },
    /// Add a comment to a record
    Comment {
        /// Record ID (PQR-0007, pqr-0007 or 7)
        id: String,
        /// Comment text
        text: String,
        /// Author email (defaults to user_email from config)
        #[arg(short, long)]
        author: Option<String>,
    },
    /// Export records to a spreadsheet
    Export {
        /// Only export records matching this term
        #[arg(short, long)]
        search: Option<String>,
        /// Output file
        #[arg(short, long, default_value = pqr_core::export::DEFAULT_EXPORT_FILE)]
        output: PathBuf,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show status (storage, record counts)
    Status,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, backend, user_email, notify_email, notify_enabled, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands work without opening storage
    if let Commands::Config { command } = &cli.command {
        return match command.clone() {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, &output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key, value, config_path, &output)
            }
        };
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config);

    let result = run(cli.command, &config, &output);
    if let Err(ref e) = result {
        if let Some(hint) = recovery_hint(e) {
            eprintln!("Hint: {}", hint);
        }
    }
    result
}

fn run(command: Commands, config: &Config, output: &Output) -> Result<()> {
    let storage = open_storage(config)?;
    let mut store = RecordStore::new(storage);
    info!("Running command with {} storage", config.backend);

    match command {
        Commands::Create(args) => commands::create::create(&mut store, config, args, output),
        Commands::List => commands::record::list(&store, output),
        Commands::Search { term } => commands::record::search(&store, term, output),
        Commands::Show { id } => commands::record::show(&store, id, output),
        Commands::Edit { id, changes } => commands::record::edit(&mut store, id, changes, output),
        Commands::Comment { id, text, author } => {
            commands::comment::add(&mut store, config, id, text, author, output)
        }
        Commands::Export { search, output: path } => {
            commands::export::export(&store, search, path, output)
        }
        Commands::Status => commands::status::show(&store, config, output),
        Commands::Config { .. } => unreachable!(), // Handled in main
    }
}

/// Recovery advice for the first storage failure in the error chain
fn recovery_hint(err: &anyhow::Error) -> Option<&'static str> {
    err.chain().find_map(|cause| {
        let storage = cause.downcast_ref::<StorageError>().or_else(|| {
            match cause.downcast_ref::<StoreError>() {
                Some(StoreError::Storage(e)) => Some(e),
                _ => None,
            }
        })?;
        storage.recovery_suggestion()
    })
}

/// Initialize file-based logging
///
/// Logging is off unless PQR_LOG is set (e.g. `PQR_LOG=debug`).
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("PQR_LOG") else {
        return;
    };

    let log_path = config.log_path();

    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!("pqr_core={},pqr_cli={}", log_level, log_level));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("Logging initialized to {:?}", log_path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_edit_flags() {
        let cli = Cli::try_parse_from([
            "pqr",
            "edit",
            "7",
            "--status",
            "Autorizado",
            "--authorized-by",
            "jdoe",
            "--authorization-date",
            "2024-05-02",
        ])
        .unwrap();

        match cli.command {
            Commands::Edit { id, changes } => {
                assert_eq!(id, "7");
                assert_eq!(changes.authorized_by.as_deref(), Some("jdoe"));
                assert!(changes.status.is_some());
            }
            _ => panic!("expected edit"),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["pqr", "list", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::List));
    }

    #[test]
    fn test_recovery_hint_found_through_context() {
        let disk_full = StorageError::DiskFull {
            path: PathBuf::from("/data/pqrs.json"),
            source: std::io::Error::other("No space left on device"),
        };
        let err = Err::<(), _>(StoreError::from(disk_full))
            .context("Failed to create record")
            .unwrap_err();
        assert_eq!(recovery_hint(&err), Some("Free up disk space and try again."));

        let not_found = anyhow::Error::from(StoreError::NotFound("PQR-0009".to_string()));
        assert!(recovery_hint(&not_found).is_none());
    }

    #[test]
    fn test_export_default_output() {
        let cli = Cli::try_parse_from(["pqr", "export"]).unwrap();
        match cli.command {
            Commands::Export { search, output } => {
                assert!(search.is_none());
                assert_eq!(output, PathBuf::from("reporte-pqrs.xlsx"));
            }
            _ => panic!("expected export"),
        }
    }
}
