use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use atmra_core::analytics::{AnalyticsEngine, ReportKind};
use atmra_core::config::AppConfig;
use atmra_core::db;
use atmra_core::demo::seed_demo_dataset;
use atmra_core::domain::Repair;
use atmra_core::ingest::repair_csv::{import_repair_csv, preview_repair_csv};
use atmra_core::repo::{delete_all_repairs, list_repairs, update_repair};
use atmra_core::report::{render_markdown, snapshot_digest};
use atmra_core::validate::validate_all_repairs;

#[derive(Parser)]
#[command(
    name = "atmra",
    about = "ATM repair analytics: common causes, long repairs, recurring failures",
    version,
    long_about = None
)]
struct Cli {
    /// SQLite database file (overrides `db_path` from the config file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// TOML configuration file; missing file means defaults
    #[arg(long, global = true, default_value = "atmra.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bulk import a repair export (CSV, header row first)
    Import {
        /// Path to the CSV file
        file: PathBuf,
    },

    /// Show the header and first rows of a CSV without importing it
    Preview {
        file: PathBuf,

        /// Rows to show
        #[arg(long, default_value = "10")]
        rows: usize,
    },

    /// Run a report: allData, mostCommonCauses, longestRepairTimes, causeFailureRecurred
    Report {
        kind: String,

        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Replace one stored record with the JSON object in the given file
    Update { file: PathBuf },

    /// Remove every stored record
    DeleteAll,

    /// Load the built-in demo dataset
    SeedDemo,

    /// List stored records that fail validation
    Validate,

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Markdown,
}

fn resolve_db_path(cli_db: Option<PathBuf>, config: &AppConfig) -> PathBuf {
    cli_db.unwrap_or_else(|| PathBuf::from(&config.db_path))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("invalid configuration in {}", cli.config.display()))?;
    let db_path = resolve_db_path(cli.db, &config);

    match cli.command {
        Commands::Import { file } => {
            let csv_text = read_text(&file)?;
            let mut conn = db::open_and_migrate(&db_path)?;
            let summary = import_repair_csv(&mut conn, &csv_text)?;
            print_json(&summary)?;
        }
        Commands::Preview { file, rows } => {
            let csv_text = read_text(&file)?;
            print_json(&preview_repair_csv(&csv_text, rows)?)?;
        }
        Commands::Report { kind, format } => {
            let kind: ReportKind = kind.parse()?;
            let conn = db::open_and_migrate(&db_path)?;
            let repairs = list_repairs(&conn)?;
            let engine = AnalyticsEngine::new(config.analytics.clone());
            let report = engine.run(kind, &repairs);
            tracing::info!(
                %kind,
                records = repairs.len(),
                items = report.items.len(),
                "report built"
            );

            match format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "kind": kind,
                    "title": engine.report_title(kind),
                    "snapshot_digest": snapshot_digest(&repairs)?,
                    "items": report.items,
                }))?,
                OutputFormat::Markdown => print!("{}", render_markdown(&engine, &report, &repairs)?),
            }
        }
        Commands::Update { file } => {
            let text = read_text(&file)?;
            let repair: Repair = serde_json::from_str(&text)
                .with_context(|| format!("{} is not a repair record", file.display()))?;
            let conn = db::open_and_migrate(&db_path)?;
            print_json(&update_repair(&conn, &repair)?)?;
        }
        Commands::DeleteAll => {
            let conn = db::open_and_migrate(&db_path)?;
            let deleted = delete_all_repairs(&conn)?;
            print_json(&serde_json::json!({ "deleted": deleted }))?;
        }
        Commands::SeedDemo => {
            let mut conn = db::open_and_migrate(&db_path)?;
            print_json(&seed_demo_dataset(&mut conn)?)?;
        }
        Commands::Validate => {
            let conn = db::open_and_migrate(&db_path)?;
            print_json(&validate_all_repairs(&conn)?)?;
        }
        Commands::Config => {
            let effective = AppConfig {
                db_path: db_path.display().to_string(),
                ..config
            };
            print!("{}", effective.to_toml_string()?);
        }
    }

    Ok(())
}
