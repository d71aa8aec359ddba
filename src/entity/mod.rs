//! Entity validation and sanitization.
//!
//! Each entity kind is described by a static list of [`FieldSpec`]s: the
//! target column, the ordered source-field aliases accepted for it, whether
//! it is required, and how to coerce it. Upstream producers disagree on
//! naming (`cod_municipio` vs `cidade`, `nome_completo` vs
//! `Nome_Completo`), so aliases are resolved in order at sanitize time.

mod hospital;
mod medico;
mod paciente;
pub mod sanitize;

use std::fmt;
use std::str::FromStr;

use crate::value::RawRecord;

pub use hospital::Hospital;
pub use medico::Medico;
pub use paciente::Paciente;
pub use sanitize::{is_missing, sanitize_number, sanitize_string, SanitizedFieldMap, SqlValue};

/// How a field's raw value is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
}

/// One target column and the source fields that may feed it.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub column: &'static str,
    pub aliases: &'static [&'static str],
    pub required: bool,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn required(column: &'static str, aliases: &'static [&'static str]) -> Self {
        Self {
            column,
            aliases,
            required: true,
            kind: FieldKind::Text,
        }
    }

    pub const fn optional(column: &'static str, aliases: &'static [&'static str]) -> Self {
        Self {
            column,
            aliases,
            required: false,
            kind: FieldKind::Text,
        }
    }

    pub const fn numeric(self) -> Self {
        Self {
            kind: FieldKind::Number,
            ..self
        }
    }

    /// At least one alias carries a non-sentinel value.
    pub fn is_present(&self, record: &RawRecord) -> bool {
        self.aliases
            .iter()
            .any(|alias| !is_missing(record.get(*alias)))
    }

    /// First alias whose sanitized value is not null.
    pub fn resolve(&self, record: &RawRecord) -> SqlValue {
        self.aliases
            .iter()
            .filter_map(|alias| record.get(*alias))
            .map(|raw| match self.kind {
                FieldKind::Text => sanitize_string(raw),
                FieldKind::Number => sanitize_number(raw),
            })
            .find(|value| !value.is_null())
            .unwrap_or(SqlValue::Null)
    }
}

/// A record kind the pipeline knows how to validate and insert.
///
/// Implementors only declare their table and fields; validation and
/// sanitization are derived from [`Entity::FIELDS`].
pub trait Entity {
    /// Singular lower-case name, used in logs and scratch file names.
    const NAME: &'static str;

    /// Target table.
    const TABLE: &'static str;

    /// Columns in table order.
    const FIELDS: &'static [FieldSpec];

    /// Required columns with no usable value in `record`.
    fn missing_fields(record: &RawRecord) -> Vec<&'static str> {
        Self::FIELDS
            .iter()
            .filter(|field| field.required && !field.is_present(record))
            .map(|field| field.column)
            .collect()
    }

    fn is_valid(record: &RawRecord) -> bool {
        Self::missing_fields(record).is_empty()
    }

    /// Map every declared column, defaulting absent optionals to null.
    fn sanitize(record: &RawRecord) -> SanitizedFieldMap {
        Self::FIELDS
            .iter()
            .map(|field| (field.column, field.resolve(record)))
            .collect()
    }
}

/// Runtime selector for the three entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Hospital,
    Medico,
    Paciente,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Hospital, EntityKind::Medico, EntityKind::Paciente];

    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Hospital => Hospital::NAME,
            EntityKind::Medico => Medico::NAME,
            EntityKind::Paciente => Paciente::NAME,
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Hospital => Hospital::TABLE,
            EntityKind::Medico => Medico::TABLE,
            EntityKind::Paciente => Paciente::TABLE,
        }
    }

    pub fn is_valid(&self, record: &RawRecord) -> bool {
        match self {
            EntityKind::Hospital => Hospital::is_valid(record),
            EntityKind::Medico => Medico::is_valid(record),
            EntityKind::Paciente => Paciente::is_valid(record),
        }
    }

    pub fn sanitize(&self, record: &RawRecord) -> SanitizedFieldMap {
        match self {
            EntityKind::Hospital => Hospital::sanitize(record),
            EntityKind::Medico => Medico::sanitize(record),
            EntityKind::Paciente => Paciente::sanitize(record),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    /// Accepts the singular name or the table name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hospital" | "hospitais" => Ok(EntityKind::Hospital),
            "medico" | "medicos" => Ok(EntityKind::Medico),
            "paciente" | "pacientes" => Ok(EntityKind::Paciente),
            other => Err(format!(
                "unknown entity '{}', expected one of: hospital, medico, paciente",
                other
            )),
        }
    }
}
