//! Upload entry point: file name and bytes in, processing summary out.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::convert::{convert_format, SourceFormat, ALLOWED_EXTENSIONS};
use crate::db::Store;
use crate::entity::EntityKind;
use crate::error::UploadError;
use crate::migration::MigrationExecutor;
use crate::normalize::normalize;
use crate::processing::{process_kind, ProcessingSummary};
use crate::scratch::Scratch;

/// Accepts uploaded files for any entity kind and runs them through the
/// pipeline: extension check, conversion, snapshot, normalization, bulk
/// insert.
pub struct UploadService<S: Store> {
    executor: MigrationExecutor<S>,
    scratch: Option<Scratch>,
}

impl<S: Store> UploadService<S> {
    pub fn new(executor: MigrationExecutor<S>, scratch: Scratch) -> Self {
        Self {
            executor,
            scratch: Some(scratch),
        }
    }

    /// A service that never touches the scratch directories: no snapshot is
    /// written and no sweep runs after the pass. Used for dry runs, where
    /// pending SQL files must survive.
    pub fn without_scratch(executor: MigrationExecutor<S>) -> Self {
        Self {
            executor,
            scratch: None,
        }
    }

    pub fn executor(&self) -> &MigrationExecutor<S> {
        &self.executor
    }

    pub fn into_executor(self) -> MigrationExecutor<S> {
        self.executor
    }

    /// Process one uploaded file as records of `kind`.
    ///
    /// # Errors
    /// - [`UploadError::UnsupportedExtension`] if the lower-cased extension
    ///   of `filename` is not one of [`ALLOWED_EXTENSIONS`]
    /// - conversion or shape errors, before anything touches the store
    /// - connection failures from the bulk pass
    ///
    /// Bad records do not fail the upload; they are reported in the summary.
    pub fn upload(
        &mut self,
        kind: EntityKind,
        filename: &str,
        bytes: &[u8],
    ) -> Result<ProcessingSummary, UploadError> {
        let extension = extension_of(filename);
        let format = match SourceFormat::from_extension(&extension) {
            Ok(format) => format,
            Err(_) => {
                return Err(UploadError::UnsupportedExtension {
                    extension,
                    allowed: ALLOWED_EXTENSIONS,
                })
            }
        };

        let parsed = convert_format(bytes, format)?;
        let snapshot = match &self.scratch {
            Some(scratch) => Some(scratch.write_snapshot(kind.name(), &parsed)?),
            None => None,
        };
        let records = match normalize(parsed) {
            Ok(records) => records,
            Err(e) => {
                if let Some(path) = snapshot {
                    remove_snapshot(&path);
                }
                return Err(e.into());
            }
        };
        info!(entity = %kind, file = filename, records = records.len(), "upload converted");

        let summary = process_kind(kind, &mut self.executor, &records, self.scratch.as_ref())?;
        Ok(summary)
    }
}

fn remove_snapshot(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), "failed to remove snapshot: {}", e);
    }
}

/// Lower-cased extension with its leading dot, or an empty string.
fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}
