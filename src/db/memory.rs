//! In-memory [`Store`] used by `--dry-run` and by tests.
//!
//! Executed statements are recorded in order. Inserts are keyed on
//! `(table, codigo)` so `ON CONFLICT (codigo) DO NOTHING` behaves the way
//! it does against a real primary key, and a plain duplicate insert fails.

use std::collections::HashSet;

use super::store::Store;
use crate::error::StoreError;
use crate::sql::CONFLICT_KEY;

#[derive(Debug, Default)]
pub struct MemoryStore {
    connected: bool,
    executed: Vec<String>,
    keys: HashSet<(String, String)>,
    connects: usize,
    disconnects: usize,
    refuse_connect: bool,
    fail_disconnect: bool,
    reject_pattern: Option<String>,
    drop_pattern: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `connect` fails with a connection error.
    pub fn refusing_connections(mut self) -> Self {
        self.refuse_connect = true;
        self
    }

    /// Every `disconnect` fails after releasing the session.
    pub fn failing_disconnect(mut self) -> Self {
        self.fail_disconnect = true;
        self
    }

    /// Statements containing `pattern` fail with an execution error.
    pub fn rejecting(mut self, pattern: impl Into<String>) -> Self {
        self.reject_pattern = Some(pattern.into());
        self
    }

    /// A statement containing `pattern` drops the session.
    pub fn dropping_connection_on(mut self, pattern: impl Into<String>) -> Self {
        self.drop_pattern = Some(pattern.into());
        self
    }

    /// Statements executed successfully, in order.
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    /// Number of distinct rows inserted into `table`.
    pub fn row_count(&self, table: &str) -> usize {
        self.keys.iter().filter(|(t, _)| t == table).count()
    }

    pub fn connect_count(&self) -> usize {
        self.connects
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects
    }

    fn insert_row(&mut self, statement: &str) -> Result<usize, StoreError> {
        let Some((table, key)) = conflict_key(statement) else {
            return Ok(0);
        };
        if self.keys.contains(&(table.clone(), key.clone())) {
            if statement.contains("ON CONFLICT") {
                return Ok(0);
            }
            return Err(StoreError::Execution {
                message: format!(
                    "duplicate key value violates unique constraint \"{}_pkey\"",
                    table
                ),
            });
        }
        self.keys.insert((table, key));
        Ok(1)
    }
}

impl Store for MemoryStore {
    fn connect(&mut self) -> Result<(), StoreError> {
        if self.refuse_connect {
            return Err(StoreError::Connection {
                message: "connection refused".to_string(),
            });
        }
        self.connected = true;
        self.connects += 1;
        Ok(())
    }

    fn execute(&mut self, statement: &str) -> Result<usize, StoreError> {
        if !self.connected {
            return Err(StoreError::NotConnected);
        }
        if let Some(pattern) = &self.drop_pattern {
            if statement.contains(pattern.as_str()) {
                self.connected = false;
                return Err(StoreError::Connection {
                    message: "server closed the connection unexpectedly".to_string(),
                });
            }
        }
        if let Some(pattern) = &self.reject_pattern {
            if statement.contains(pattern.as_str()) {
                return Err(StoreError::Execution {
                    message: format!("statement rejected: {}", statement),
                });
            }
        }

        let affected = if statement.trim_start().to_ascii_uppercase().starts_with("INSERT") {
            self.insert_row(statement)?
        } else {
            0
        };
        self.executed.push(statement.to_string());
        Ok(affected)
    }

    fn disconnect(&mut self) -> Result<(), StoreError> {
        if !self.connected {
            return Ok(());
        }
        self.connected = false;
        self.disconnects += 1;
        if self.fail_disconnect {
            return Err(StoreError::Disconnection {
                message: "error while closing session".to_string(),
            });
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Extract `(table, codigo literal)` from an `INSERT INTO t (cols) VALUES (...)`.
fn conflict_key(statement: &str) -> Option<(String, String)> {
    let upper = statement.to_ascii_uppercase();
    let into = upper.find("INTO")? + "INTO".len();
    let open = into + statement[into..].find('(')?;
    let table = statement[into..open].trim().to_string();

    let close = open + statement[open..].find(')')?;
    let columns: Vec<&str> = statement[open + 1..close].split(',').map(str::trim).collect();
    let index = columns.iter().position(|c| *c == CONFLICT_KEY)?;

    let values_at = close + upper[close..].find("VALUES")? + "VALUES".len();
    let values_open = values_at + statement[values_at..].find('(')?;
    let values = split_values(&statement[values_open + 1..]);
    values.get(index).map(|v| (table, v.clone()))
}

/// Split a value list at top-level commas, stopping at its closing paren.
fn split_values(list: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut depth = 0usize;

    for ch in list.chars() {
        match ch {
            '\'' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string && depth == 0 => break,
            ')' if !in_string => depth -= 1,
            ',' if !in_string && depth == 0 => {
                values.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    values.push(current.trim().to_string());
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSERT_H1: &str =
        "INSERT INTO hospitais (nome, codigo) VALUES ('Hosp, A', 'H1') ON CONFLICT (codigo) DO NOTHING;";

    #[test]
    fn test_conflict_key_extraction() {
        assert_eq!(
            conflict_key(INSERT_H1),
            Some(("hospitais".to_string(), "'H1'".to_string()))
        );
        assert_eq!(conflict_key("INSERT INTO t (a) VALUES (1)"), None);
        assert_eq!(conflict_key("SELECT 1"), None);
    }

    #[test]
    fn test_on_conflict_is_idempotent() {
        let mut store = MemoryStore::new();
        store.connect().unwrap();
        assert_eq!(store.execute(INSERT_H1).unwrap(), 1);
        assert_eq!(store.execute(INSERT_H1).unwrap(), 0);
        assert_eq!(store.row_count("hospitais"), 1);
        assert_eq!(store.executed().len(), 2);
    }

    #[test]
    fn test_plain_duplicate_fails() {
        let mut store = MemoryStore::new();
        store.connect().unwrap();
        let sql = "INSERT INTO medicos (codigo) VALUES ('M1')";
        store.execute(sql).unwrap();
        let err = store.execute(sql).unwrap_err();
        assert!(err.to_string().contains("duplicate key"));
    }

    #[test]
    fn test_requires_connection() {
        let mut store = MemoryStore::new();
        assert!(matches!(store.execute("SELECT 1"), Err(StoreError::NotConnected)));
        assert!(store.disconnect().is_ok());
        assert_eq!(store.disconnect_count(), 0);
    }

    #[test]
    fn test_failure_injection() {
        let mut refusing = MemoryStore::new().refusing_connections();
        assert!(refusing.connect().unwrap_err().is_connection_failure());

        let mut dropping = MemoryStore::new().dropping_connection_on("BOOM");
        dropping.connect().unwrap();
        assert!(dropping.execute("SELECT 'BOOM'").unwrap_err().is_connection_failure());
        assert!(!dropping.is_connected());

        let mut rejecting = MemoryStore::new().rejecting("bad");
        rejecting.connect().unwrap();
        assert!(!rejecting.execute("SELECT 'bad'").unwrap_err().is_connection_failure());
        assert!(rejecting.is_connected());
    }
}
