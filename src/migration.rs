//! Migration executor.
//!
//! Two paths share one store session:
//!
//! - the file batch ([`MigrationExecutor::run_migration`]) consumes every
//!   pending `.sql` file in the SQL directory, validating, splitting and
//!   executing each one and deleting it afterwards. The first invalid file
//!   or failed statement aborts the batch.
//! - the direct insert path ([`MigrationExecutor::insert_entity`]) turns a
//!   single record into one statement and executes it immediately. Its
//!   failures belong to that record only.

use std::fs;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::db::Store;
use crate::entity::{Entity, EntityKind, Hospital, Medico, Paciente};
use crate::error::{MigrationError, RecordError, StoreError};
use crate::sql::{build_insert, split_statements, validate, SqlDiagnostics, SqlStatement, ValidationResult};
use crate::value::RawRecord;

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrationError>;

const PREVIEW_CHARS: usize = 50;

/// What a completed batch did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Files executed and deleted, in processing order.
    pub files_consumed: Vec<PathBuf>,
    pub statements_executed: usize,
}

/// SQL a record would produce, and what the validator thinks of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DryRun {
    pub statement: SqlStatement,
    pub validation: ValidationResult,
}

/// Executes SQL against an injected [`Store`].
pub struct MigrationExecutor<S: Store> {
    store: S,
    sql_dir: PathBuf,
}

impl<S: Store> MigrationExecutor<S> {
    /// Create an executor reading pending files from `sql_dir`.
    pub fn new(store: S, sql_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            sql_dir: sql_dir.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn connect(&mut self) -> std::result::Result<(), StoreError> {
        self.store.connect()
    }

    pub fn disconnect(&mut self) -> std::result::Result<(), StoreError> {
        self.store.disconnect()
    }

    /// Validate and execute a SQL text on the open session.
    ///
    /// A text that starts with `INSERT` and holds exactly one `;` is run as
    /// is; anything else goes through the quote-aware splitter first.
    /// Returns the number of statements executed.
    ///
    /// # Errors
    /// [`MigrationError::SqlValidation`] before anything runs if the text
    /// fails validation, or [`MigrationError::Store`] from the first
    /// rejected statement. Statements already executed are not rolled back.
    pub fn execute_script(&mut self, sql: &str, origin: &str) -> Result<usize> {
        let validation = validate(sql);
        if !validation.is_valid {
            let diagnostics = SqlDiagnostics::analyze(sql);
            error!(
                origin,
                errors = ?validation.messages(),
                "SQL validation failed\n{}",
                diagnostics
            );
            return Err(MigrationError::SqlValidation {
                origin: origin.to_string(),
                issues: validation.errors,
                diagnostics,
            });
        }

        let statements = if is_single_insert(sql) {
            vec![SqlStatement::new(sql.trim())]
        } else {
            split_statements(sql)
        };

        for statement in &statements {
            debug!("executing: {}", preview(statement.as_str()));
            self.store.execute(statement.as_str())?;
        }
        Ok(statements.len())
    }

    /// `.sql` files waiting in the SQL directory, in directory-listing order.
    ///
    /// A missing directory means nothing is pending.
    pub fn pending_sql_files(&self) -> Result<Vec<PathBuf>> {
        if !self.sql_dir.exists() {
            info!(dir = %self.sql_dir.display(), "SQL directory does not exist, nothing to migrate");
            return Ok(Vec::new());
        }

        let io_error = |source| MigrationError::Io {
            path: self.sql_dir.clone(),
            source,
        };
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.sql_dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
                files.push(path);
            }
        }
        Ok(files)
    }

    /// Run every pending SQL file, deleting each one after it succeeds.
    ///
    /// The session is always closed on the way out. A failure to close is
    /// logged and never replaces the batch result.
    pub fn run_migration(&mut self) -> Result<MigrationReport> {
        self.store.connect()?;
        info!(dir = %self.sql_dir.display(), "starting migration");

        let result = self.run_pending();

        if let Err(e) = self.store.disconnect() {
            error!("error while disconnecting after migration: {}", e);
        }
        result
    }

    fn run_pending(&mut self) -> Result<MigrationReport> {
        let mut report = MigrationReport::default();

        for path in self.pending_sql_files()? {
            let origin = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            info!(file = %origin, "processing SQL file");

            let sql = fs::read_to_string(&path).map_err(|source| MigrationError::Io {
                path: path.clone(),
                source,
            })?;
            report.statements_executed += self.execute_script(&sql, &origin)?;

            fs::remove_file(&path).map_err(|source| MigrationError::Io {
                path: path.clone(),
                source,
            })?;
            debug!(file = %origin, "removed consumed SQL file");
            report.files_consumed.push(path);
        }

        info!(
            files = report.files_consumed.len(),
            statements = report.statements_executed,
            "migration finished"
        );
        Ok(report)
    }

    /// Validate, sanitize, build and execute one record.
    ///
    /// Requires an open session. Returns the statement that was executed.
    pub fn insert_entity<E: Entity>(&mut self, record: &RawRecord) -> std::result::Result<SqlStatement, RecordError> {
        let missing = E::missing_fields(record);
        if !missing.is_empty() {
            return Err(RecordError::MissingRequiredFields {
                entity: E::NAME,
                fields: missing,
            });
        }

        let fields = E::sanitize(record);
        let statement = build_insert(E::TABLE, &fields)?;
        self.execute_script(statement.as_str(), E::NAME)?;
        Ok(statement)
    }

    pub fn insert_hospital(&mut self, record: &RawRecord) -> std::result::Result<SqlStatement, RecordError> {
        self.insert_entity::<Hospital>(record)
    }

    pub fn insert_medico(&mut self, record: &RawRecord) -> std::result::Result<SqlStatement, RecordError> {
        self.insert_entity::<Medico>(record)
    }

    pub fn insert_paciente(&mut self, record: &RawRecord) -> std::result::Result<SqlStatement, RecordError> {
        self.insert_entity::<Paciente>(record)
    }

    pub fn insert_kind(&mut self, kind: EntityKind, record: &RawRecord) -> std::result::Result<SqlStatement, RecordError> {
        match kind {
            EntityKind::Hospital => self.insert_hospital(record),
            EntityKind::Medico => self.insert_medico(record),
            EntityKind::Paciente => self.insert_paciente(record),
        }
    }
}

/// Build and validate the statement for `record` without executing it.
///
/// Required fields are not checked, so this also shows what an invalid
/// record would have produced.
pub fn dry_run_insert<E: Entity>(record: &RawRecord) -> std::result::Result<DryRun, RecordError> {
    let statement = build_insert(E::TABLE, &E::sanitize(record))?;
    let validation = validate(statement.as_str());
    Ok(DryRun {
        statement,
        validation,
    })
}

/// A lone `INSERT` that needs no splitting.
pub fn is_single_insert(sql: &str) -> bool {
    let trimmed = sql.trim_start();
    let starts_with_insert = trimmed
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("INSERT"));
    starts_with_insert && sql.matches(';').count() == 1
}

fn preview(statement: &str) -> String {
    match statement.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &statement[..cut]),
        None => statement.to_string(),
    }
}
