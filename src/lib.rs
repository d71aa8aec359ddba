//! # health-ingest: Healthcare Record Ingestion
//!
//! health-ingest takes hospital, physician and patient records exported by
//! heterogeneous upstream systems and loads them into a relational store
//! without letting malformed values reach the SQL text.
//!
//! ## Pipeline
//!
//! ```text
//! bytes + extension ──► convert ──► normalize ──► entity validate/sanitize
//!                                                        │
//!        store ◄── migration executor ◄── sql validate ◄─┴─ sql build
//! ```
//!
//! - **Format conversion**: JSON, FHIR, XML, CSV and HL7 into one
//!   [`RawValue`] tree
//! - **Entity rules**: required fields, ordered source-field aliases and
//!   sentinel scrubbing per entity kind
//! - **Safe SQL**: escaped literals, idempotent `ON CONFLICT (codigo)`
//!   inserts, a heuristic pre-flight validator and a quote-aware splitter
//! - **Store seam**: Diesel/r2d2 in production, an in-memory store for dry
//!   runs and tests
//!
//! ## Example
//!
//! ```
//! use health_ingest::convert::convert;
//! use health_ingest::entity::{Entity, Hospital};
//! use health_ingest::normalize::normalize;
//! use health_ingest::sql::build_insert;
//!
//! let parsed = convert(b"codigo,nome,cod_municipio,bairro\nH1,Hosp A,1100015,Centro\n", ".csv").unwrap();
//! let records = normalize(parsed).unwrap();
//! assert!(Hospital::is_valid(&records[0]));
//!
//! let statement = build_insert(Hospital::TABLE, &Hospital::sanitize(&records[0])).unwrap();
//! assert!(statement.as_str().ends_with("ON CONFLICT (codigo) DO NOTHING;"));
//! ```

// Input handling
pub mod convert;
pub mod normalize;
pub mod value;

// Entity rules and SQL generation
pub mod entity;
pub mod sql;

// Execution
pub mod db;
pub mod migration;
pub mod processing;
pub mod scratch;
pub mod upload;

pub mod config;
pub mod error;

// Re-export key types
pub use value::{RawRecord, RawValue, Scalar};
pub use entity::{Entity, EntityKind, Hospital, Medico, Paciente, SanitizedFieldMap, SqlValue};
pub use sql::{SqlStatement, ValidationResult};

pub use db::{Database, DatabaseConfig, DieselStore, MemoryStore, Store};
pub use migration::{MigrationExecutor, MigrationReport};
pub use processing::{process_entities, ProcessingSummary};
pub use scratch::Scratch;
pub use upload::UploadService;

pub use config::{DatabaseSettings, IngestConfig};
pub use error::{
    ConfigError, ConvertError, MigrationError, ProcessingError, RecordError, ScratchError,
    ShapeError, SqlBuildError, StoreError, UploadError,
};
