use blz_import::app::{bank_get, import_bank_file, import_history, registry_stats, ImportReport};
use blz_import::config::Config;
use blz_import::error::AppError;
use blz_import::infra::{init_db, ImportLock};
use blz_import::logging::init_logging;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "blz-import", version, about = "Bank routing code registry importer")]
struct Cli {
    /// SQLite database file (overrides BLZ_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replace the registry with the contents of a Bundesbank-style CSV file
    Import {
        /// Source file (overrides BLZ_SOURCE_PATH)
        path: Option<PathBuf>,
        /// Record errors to log in detail (overrides BLZ_VERBOSE_ERROR_LIMIT)
        #[arg(long)]
        verbose_errors: Option<usize>,
    },
    /// Show registry statistics
    Stats,
    /// Look up one bank by routing code
    Lookup { routing_code: String },
    /// List recent imports
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error [{}]: {}", e.code(), e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.log_filter);

    let json = cli.json;
    match run(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                print_json(&e);
            } else {
                eprintln!("error [{}]: {}", e.code(), e);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, mut config: Config) -> Result<(), AppError> {
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    let command = cli.command.unwrap_or(Command::Import {
        path: None,
        verbose_errors: None,
    });

    match command {
        Command::Import {
            path,
            verbose_errors,
        } => {
            if let Some(path) = path {
                config.source_path = path;
            }
            if let Some(limit) = verbose_errors {
                config.verbose_error_limit = limit;
            }
            // Held until the end of this arm, across open, import and stats
            let lock = ImportLock::acquire(&ImportLock::path_for(&config.db_path))?;
            log::debug!("Holding {}", lock.path().display());
            let pool = init_db(&config.db_path)?;
            let report = import_bank_file(&pool, &config.source_path, &config.import_options())?;
            if cli.json {
                print_json(&report);
            } else {
                print_summary(&report);
            }
        }
        Command::Stats => {
            let pool = init_db(&config.db_path)?;
            let stats = registry_stats(&pool)?;
            if cli.json {
                print_json(&stats);
            } else {
                println!(
                    "{} banks, {} unique BICs, {} with BIC",
                    stats.total_banks, stats.unique_bics, stats.banks_with_bic
                );
            }
        }
        Command::Lookup { routing_code } => {
            let pool = init_db(&config.db_path)?;
            let bank = bank_get(&pool, &routing_code)?;
            if cli.json {
                print_json(&bank);
            } else {
                let r = &bank.record;
                println!("{} {} ({} {})", r.routing_code, r.name, r.postal_code, r.city);
                println!("  BIC: {}", if r.bic.is_empty() { "-" } else { r.bic.as_str() });
                println!("  short name: {}, PAN: {}", r.short_name, r.pan);
                println!("  updated: {}", bank.updated_at);
            }
        }
        Command::History { limit } => {
            let pool = init_db(&config.db_path)?;
            let runs = import_history(&pool, limit)?;
            if cli.json {
                print_json(&runs);
            } else if runs.is_empty() {
                println!("no imports yet");
            } else {
                for run in runs {
                    println!(
                        "{}  {} imported, {} errors  {}",
                        run.started_at, run.imported, run.errors, run.source
                    );
                }
            }
        }
    }
    Ok(())
}

fn print_summary(report: &ImportReport) {
    println!(
        "Imported {} banks ({} errors) from {}",
        report.imported, report.errors, report.source
    );
    match &report.stats_error {
        None => println!(
            "Registry: {} banks, {} unique BICs, {} with BIC",
            report.stats.total_banks, report.stats.unique_bics, report.stats.banks_with_bic
        ),
        Some(e) => println!("Registry statistics unavailable: {}", e),
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("JSON serialization failed: {}", e),
    }
}
