//! SQL generation, validation and splitting.

pub mod builder;
pub mod splitter;
pub mod validator;

pub use builder::{build_insert, escape_string, literal, SqlStatement, CONFLICT_KEY};
pub use splitter::split_statements;
pub use validator::{validate, QuoteEvent, SqlDiagnostics, SqlIssue, ValidationResult};
