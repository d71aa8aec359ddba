//! Bulk entity processing.
//!
//! A pass inserts every record of one entity kind through the direct insert
//! path. Bad records are counted and skipped; only a lost connection stops
//! the pass. The session is closed and scratch files are swept whatever the
//! outcome.

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::db::Store;
use crate::entity::{Entity, EntityKind, Hospital, Medico, Paciente};
use crate::error::{ProcessingError, RecordError};
use crate::migration::{dry_run_insert, MigrationExecutor};
use crate::scratch::Scratch;
use crate::sql::{build_insert, SqlStatement};
use crate::value::RawRecord;

/// Outcome of a bulk pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingSummary {
    pub entity: &'static str,
    pub total: usize,
    pub processed_count: usize,
    pub error_count: usize,
    /// One message per failed record, prefixed with its position.
    pub errors: Vec<String>,
}

impl ProcessingSummary {
    pub fn new(entity: &'static str, total: usize) -> Self {
        Self {
            entity,
            total,
            processed_count: 0,
            error_count: 0,
            errors: Vec::new(),
        }
    }

    fn record_failure(&mut self, index: usize, err: &RecordError) {
        self.error_count += 1;
        self.errors.push(format!("record {}: {}", index, err));
    }
}

/// Insert `records` as entity `E`, continuing past per-record failures.
///
/// # Errors
/// [`ProcessingError::Connection`] if the session cannot be opened, and
/// [`ProcessingError::Aborted`] if it is lost mid-pass.
pub fn process_entities<E: Entity, S: Store>(
    executor: &mut MigrationExecutor<S>,
    records: &[RawRecord],
    scratch: Option<&Scratch>,
) -> Result<ProcessingSummary, ProcessingError> {
    if let Err(e) = executor.connect() {
        sweep(scratch);
        return Err(e.into());
    }
    info!(entity = E::NAME, records = records.len(), "processing records");

    let result = insert_all::<E, S>(executor, records);

    sweep(scratch);
    if let Err(e) = executor.disconnect() {
        error!("error while disconnecting after {} processing: {}", E::NAME, e);
    }

    if let Ok(summary) = &result {
        info!(
            entity = E::NAME,
            processed = summary.processed_count,
            errors = summary.error_count,
            "processing finished"
        );
    }
    result
}

fn sweep(scratch: Option<&Scratch>) {
    if let Some(scratch) = scratch {
        scratch.cleanup_temporary_files();
    }
}

fn insert_all<E: Entity, S: Store>(
    executor: &mut MigrationExecutor<S>,
    records: &[RawRecord],
) -> Result<ProcessingSummary, ProcessingError> {
    let mut summary = ProcessingSummary::new(E::NAME, records.len());

    for (index, record) in records.iter().enumerate() {
        match executor.insert_entity::<E>(record) {
            Ok(_) => summary.processed_count += 1,
            Err(err) if err.is_fatal() => {
                error!(index, "connection lost, aborting {} processing: {}", E::NAME, err);
                return Err(ProcessingError::Aborted { index, source: err });
            }
            Err(err @ RecordError::MissingRequiredFields { .. }) => {
                warn!(index, "skipping invalid {} record: {}", E::NAME, err);
                summary.record_failure(index, &err);
            }
            Err(err) => {
                error!(index, "failed to insert {} record: {}", E::NAME, err);
                log_dry_run::<E>(record);
                summary.record_failure(index, &err);
            }
        }
    }
    Ok(summary)
}

fn log_dry_run<E: Entity>(record: &RawRecord) {
    match dry_run_insert::<E>(record) {
        Ok(dry) if dry.validation.is_valid => {
            debug!("statement for failed record: {}", dry.statement);
        }
        Ok(dry) => debug!(
            errors = ?dry.validation.messages(),
            "statement for failed record does not validate: {}",
            dry.statement
        ),
        Err(e) => debug!("no statement could be built for failed record: {}", e),
    }
}

/// Run [`process_entities`] for a kind chosen at runtime.
pub fn process_kind<S: Store>(
    kind: EntityKind,
    executor: &mut MigrationExecutor<S>,
    records: &[RawRecord],
    scratch: Option<&Scratch>,
) -> Result<ProcessingSummary, ProcessingError> {
    match kind {
        EntityKind::Hospital => process_entities::<Hospital, S>(executor, records, scratch),
        EntityKind::Medico => process_entities::<Medico, S>(executor, records, scratch),
        EntityKind::Paciente => process_entities::<Paciente, S>(executor, records, scratch),
    }
}

/// Build statements for valid records without touching a store.
///
/// Invalid records are reported in the summary the same way a bulk pass
/// reports them.
pub fn build_statements<E: Entity>(records: &[RawRecord]) -> (Vec<SqlStatement>, ProcessingSummary) {
    let mut summary = ProcessingSummary::new(E::NAME, records.len());
    let mut statements = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let missing = E::missing_fields(record);
        let built = if missing.is_empty() {
            build_insert(E::TABLE, &E::sanitize(record)).map_err(RecordError::from)
        } else {
            Err(RecordError::MissingRequiredFields {
                entity: E::NAME,
                fields: missing,
            })
        };

        match built {
            Ok(statement) => {
                statements.push(statement);
                summary.processed_count += 1;
            }
            Err(err) => {
                warn!(index, "skipping {} record: {}", E::NAME, err);
                summary.record_failure(index, &err);
            }
        }
    }
    (statements, summary)
}

/// [`build_statements`] for a kind chosen at runtime.
pub fn build_statements_for(kind: EntityKind, records: &[RawRecord]) -> (Vec<SqlStatement>, ProcessingSummary) {
    match kind {
        EntityKind::Hospital => build_statements::<Hospital>(records),
        EntityKind::Medico => build_statements::<Medico>(records),
        EntityKind::Paciente => build_statements::<Paciente>(records),
    }
}
