//! health-ingest CLI - load hospital, physician and patient files into the database
//!
//! Reads database settings from the environment (and `.env`), scratch
//! directories from an optional YAML file.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use health_ingest::convert::{convert_format, SourceFormat};
use health_ingest::normalize::normalize;
use health_ingest::processing::build_statements_for;
use health_ingest::sql::{split_statements, validate, SqlDiagnostics};
use health_ingest::{
    Database, DieselStore, EntityKind, IngestConfig, MemoryStore, MigrationExecutor, Store,
    UploadService,
};

#[derive(Parser)]
#[command(name = "health-ingest")]
#[command(version, about = "Healthcare record ingestion with safe SQL generation", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Resources directory for snapshots and pending SQL (overrides the config file)
    #[arg(long, global = true)]
    resources: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a file and print the normalized records as JSON
    Convert {
        /// Input file (.json, .fhir, .xml, .csv, .xlsx, .hl7)
        file: PathBuf,
    },

    /// Insert every record of a file through the direct insert path
    Ingest {
        /// Entity kind: hospital, medico or paciente
        #[arg(short, long)]
        entity: EntityKind,

        /// Input file
        file: PathBuf,

        /// Print the statements instead of sending them to the database
        #[arg(long)]
        dry_run: bool,
    },

    /// Write the insert statements for a file to the pending SQL directory
    GenerateSql {
        /// Entity kind: hospital, medico or paciente
        #[arg(short, long)]
        entity: EntityKind,

        /// Input file
        file: PathBuf,
    },

    /// Run the SQL validator over a file and print its findings
    ValidateSql {
        /// SQL file
        file: PathBuf,
    },

    /// Print the statements of a SQL script, one per line
    Split {
        /// SQL file
        file: PathBuf,
    },

    /// Execute and delete every pending SQL file
    Migrate,

    /// Remove leftover snapshots and generated SQL files
    Cleanup,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let result = load_config(cli.config.as_deref(), cli.resources).and_then(|config| match cli.command {
        Commands::Convert { file } => convert_file(&file),
        Commands::Ingest {
            entity,
            file,
            dry_run,
        } => ingest_file(&config, entity, &file, dry_run),
        Commands::GenerateSql { entity, file } => generate_sql(&config, entity, &file),
        Commands::ValidateSql { file } => validate_sql(&file),
        Commands::Split { file } => split_sql(&file),
        Commands::Migrate => migrate(&config),
        Commands::Cleanup => cleanup(&config),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn load_config(path: Option<&Path>, resources: Option<PathBuf>) -> Result<IngestConfig, String> {
    let config = IngestConfig::load(path).map_err(|e| e.to_string())?;
    Ok(match resources {
        Some(dir) => config.with_resources_dir(dir),
        None => config,
    })
}

fn read_file(path: &Path) -> Result<Vec<u8>, String> {
    fs::read(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))
}

fn read_text(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))
}

fn connect_store(config: &IngestConfig) -> Result<DieselStore, String> {
    let url = config.database_url().map_err(|e| e.to_string())?;
    let database = Database::new_with_config(&url, config.pool.clone()).map_err(|e| e.to_string())?;
    Ok(DieselStore::new(database))
}

/// Convert a file and print the normalized records
fn convert_file(file: &Path) -> Result<(), String> {
    let format = SourceFormat::from_path(file).map_err(|e| e.to_string())?;
    let parsed = convert_format(&read_file(file)?, format).map_err(|e| e.to_string())?;
    let records = normalize(parsed).map_err(|e| e.to_string())?;

    let json = serde_json::to_string_pretty(&records)
        .map_err(|e| format!("Failed to serialize records: {}", e))?;
    println!("{}", json);
    Ok(())
}

/// Run the upload pipeline against the configured database or a dry-run store
fn ingest_file(config: &IngestConfig, entity: EntityKind, file: &Path, dry_run: bool) -> Result<(), String> {
    let filename = file
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| format!("Invalid file name: {}", file.display()))?;
    let bytes = read_file(file)?;

    if dry_run {
        // Leaves snapshots and pending SQL files alone
        let executor = MigrationExecutor::new(MemoryStore::new(), &config.sql_dir);
        let store = run_upload(UploadService::without_scratch(executor), entity, filename, &bytes)?;
        for statement in store.executed() {
            println!("{}", statement);
        }
        Ok(())
    } else {
        let executor = MigrationExecutor::new(connect_store(config)?, &config.sql_dir);
        run_upload(UploadService::new(executor, config.scratch()), entity, filename, &bytes).map(|_| ())
    }
}

fn run_upload<S: Store>(
    mut service: UploadService<S>,
    entity: EntityKind,
    filename: &str,
    bytes: &[u8],
) -> Result<S, String> {
    let summary = service
        .upload(entity, filename, bytes)
        .map_err(|e| e.to_string())?;

    let json = serde_json::to_string_pretty(&summary)
        .map_err(|e| format!("Failed to serialize summary: {}", e))?;
    eprintln!("{}", json);
    Ok(service.into_executor().into_store())
}

/// Build statements for a file and write them as a pending migration
fn generate_sql(config: &IngestConfig, entity: EntityKind, file: &Path) -> Result<(), String> {
    let format = SourceFormat::from_path(file).map_err(|e| e.to_string())?;
    let parsed = convert_format(&read_file(file)?, format).map_err(|e| e.to_string())?;
    let records = normalize(parsed).map_err(|e| e.to_string())?;

    let (statements, summary) = build_statements_for(entity, &records);
    for error in &summary.errors {
        eprintln!("  ⚠ {}", error);
    }
    if statements.is_empty() {
        return Err(format!("No valid {} records in {}", entity, file.display()));
    }

    let path = config
        .scratch()
        .write_sql_file(entity.name(), &statements)
        .map_err(|e| e.to_string())?;
    println!(
        "✓ Wrote {} statement(s) to {} ({} skipped)",
        statements.len(),
        path.display(),
        summary.error_count
    );
    Ok(())
}

/// Validate a SQL file; exits non-zero when it would be rejected by `migrate`
fn validate_sql(file: &Path) -> Result<(), String> {
    let sql = read_text(file)?;
    let result = validate(&sql);
    if result.is_valid {
        println!("✓ {} passed validation", file.display());
        return Ok(());
    }

    for message in result.messages() {
        println!("  ✗ {}", message);
    }
    println!("{}", SqlDiagnostics::analyze(&sql));
    Err(format!("{} failed validation", file.display()))
}

/// Print each statement of a script on its own line
fn split_sql(file: &Path) -> Result<(), String> {
    let sql = read_text(file)?;
    for statement in split_statements(&sql) {
        println!("{};", statement);
    }
    Ok(())
}

/// Execute every pending SQL file
fn migrate(config: &IngestConfig) -> Result<(), String> {
    let mut executor = MigrationExecutor::new(connect_store(config)?, &config.sql_dir);
    let report = executor.run_migration().map_err(|e| e.to_string())?;
    println!(
        "✓ Migration complete: {} file(s), {} statement(s)",
        report.files_consumed.len(),
        report.statements_executed
    );
    Ok(())
}

/// Remove temporary snapshots and SQL files
fn cleanup(config: &IngestConfig) -> Result<(), String> {
    let removed = config.scratch().cleanup_temporary_files();
    println!("✓ Removed {} temporary file(s)", removed);
    Ok(())
}
