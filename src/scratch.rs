//! Scratch directory layout.
//!
//! ```text
//! resources/
//!   hospital-data-2024-05-01T12-30-00-000Z.json   snapshot of an upload
//!   sql/
//!     hospital-data-2024-05-01T12-31-10-412Z.sql  pending migration
//! ```
//!
//! Snapshots and generated SQL files are transient. The migration executor
//! deletes each `.sql` file it consumes, and [`Scratch::cleanup_temporary_files`]
//! sweeps whatever is left at the end of a bulk pass.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::ScratchError;
use crate::sql::SqlStatement;

/// Result type for scratch operations.
pub type Result<T> = std::result::Result<T, ScratchError>;

/// The resources directory and its SQL subdirectory.
#[derive(Debug, Clone)]
pub struct Scratch {
    resources_dir: PathBuf,
    sql_dir: PathBuf,
}

impl Scratch {
    /// Use `resources_dir` with the default `sql/` subdirectory.
    pub fn new(resources_dir: impl Into<PathBuf>) -> Self {
        let resources_dir = resources_dir.into();
        let sql_dir = resources_dir.join("sql");
        Self {
            resources_dir,
            sql_dir,
        }
    }

    pub fn with_sql_dir(mut self, sql_dir: impl Into<PathBuf>) -> Self {
        self.sql_dir = sql_dir.into();
        self
    }

    pub fn resources_dir(&self) -> &Path {
        &self.resources_dir
    }

    pub fn sql_dir(&self) -> &Path {
        &self.sql_dir
    }

    /// Write a pretty-printed JSON snapshot of an upload.
    ///
    /// # Arguments
    /// * `entity` - Entity name used as the file name prefix (e.g. "hospital")
    /// * `data` - Anything serializable, usually the converted document
    ///
    /// Returns the path of the written file.
    pub fn write_snapshot<T: Serialize + ?Sized>(&self, entity: &str, data: &T) -> Result<PathBuf> {
        create_dir(&self.resources_dir)?;
        let path = self
            .resources_dir
            .join(format!("{}-data-{}.json", entity, file_timestamp()));

        let json = serde_json::to_string_pretty(data)?;
        fs::write(&path, json).map_err(|source| ScratchError::Io {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), "{} data written", entity);
        Ok(path)
    }

    /// Write statements, one per line, as a pending migration file.
    pub fn write_sql_file(&self, entity: &str, statements: &[SqlStatement]) -> Result<PathBuf> {
        create_dir(&self.sql_dir)?;
        let path = self
            .sql_dir
            .join(format!("{}-data-{}.sql", entity, file_timestamp()));

        let io_error = |source| ScratchError::Io {
            path: path.clone(),
            source,
        };
        let mut file = fs::File::create(&path).map_err(io_error)?;
        for statement in statements {
            writeln!(file, "{}", statement).map_err(io_error)?;
        }
        info!(path = %path.display(), statements = statements.len(), "SQL file written");
        Ok(path)
    }

    /// Remove leftover snapshots and SQL files.
    ///
    /// Only `.json` and `.sql` files whose names contain both `-` and
    /// `data-` are touched. Missing directories are skipped and a file that
    /// cannot be removed is logged; neither fails the sweep. Returns the
    /// number of files removed.
    pub fn cleanup_temporary_files(&self) -> usize {
        let mut removed = 0;
        for dir in [&self.resources_dir, &self.sql_dir] {
            if !dir.is_dir() {
                debug!(dir = %dir.display(), "scratch directory missing, skipping cleanup");
                continue;
            }
            let entries = match fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(dir = %dir.display(), "cannot list scratch directory: {}", e);
                    continue;
                }
            };

            for entry in entries.flatten() {
                let path = entry.path();
                let is_artifact = path.is_file()
                    && path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .is_some_and(is_temporary_artifact);
                if !is_artifact {
                    continue;
                }
                match fs::remove_file(&path) {
                    Ok(()) => {
                        debug!(path = %path.display(), "removed temporary file");
                        removed += 1;
                    }
                    Err(e) => warn!(path = %path.display(), "failed to remove temporary file: {}", e),
                }
            }
        }

        if removed > 0 {
            info!(removed, "temporary files cleaned up");
        }
        removed
    }
}

/// Name pattern of files written by [`Scratch`].
pub fn is_temporary_artifact(file_name: &str) -> bool {
    (file_name.ends_with(".json") || file_name.ends_with(".sql"))
        && file_name.contains('-')
        && file_name.contains("data-")
}

/// UTC timestamp safe for file names: `2024-05-01T12-30-00-000Z`.
fn file_timestamp() -> String {
    Utc::now()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| ScratchError::Io {
        path: dir.to_path_buf(),
        source,
    })
}
