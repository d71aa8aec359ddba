//! The store seam.
//!
//! The migration executor and the bulk pass only see [`Store`]: connect,
//! run one statement, disconnect. [`DieselStore`] talks to the real
//! database; [`MemoryStore`](super::MemoryStore) records statements for dry
//! runs and tests.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::RunQueryDsl;

use super::database::{Database, PooledConnection};
use crate::error::StoreError;

/// A relational store that executes one statement at a time.
pub trait Store {
    /// Open a session. Fails with [`StoreError::Connection`]; never retries.
    fn connect(&mut self) -> Result<(), StoreError>;

    /// Execute a single statement, returning the affected row count.
    fn execute(&mut self, statement: &str) -> Result<usize, StoreError>;

    /// Close the session. Closing a store that is not connected is a no-op.
    fn disconnect(&mut self) -> Result<(), StoreError>;

    fn is_connected(&self) -> bool;
}

/// [`Store`] backed by a pooled Diesel connection.
pub struct DieselStore {
    database: Database,
    connection: Option<PooledConnection>,
}

impl DieselStore {
    pub fn new(database: Database) -> Self {
        Self {
            database,
            connection: None,
        }
    }
}

impl Store for DieselStore {
    fn connect(&mut self) -> Result<(), StoreError> {
        if self.connection.is_none() {
            self.connection = Some(self.database.get_connection()?);
            tracing::info!("connected to database");
        }
        Ok(())
    }

    fn execute(&mut self, statement: &str) -> Result<usize, StoreError> {
        let conn = self.connection.as_mut().ok_or(StoreError::NotConnected)?;
        diesel::sql_query(statement)
            .execute(&mut **conn)
            .map_err(classify)
    }

    fn disconnect(&mut self) -> Result<(), StoreError> {
        if self.connection.take().is_some() {
            tracing::info!("disconnected from database");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connection.is_some()
    }
}

fn classify(err: DieselError) -> StoreError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, info) => {
            StoreError::Connection {
                message: info.message().to_string(),
            }
        }
        other => StoreError::Execution {
            message: other.to_string(),
        },
    }
}
