//! Destination store for the bank registry: one unit of work per import.

use crate::domain::BankRecord;
use crate::error::AppError;
use crate::infra::db::{get_connection, DbPool};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::sync::MutexGuard;

const UPSERT_BANK: &str = "INSERT INTO banks (routing_code, record_marker, name, postal_code, city, short_name, pan, bic, checksum_method, record_sequence, change_flag, deleted_routing_code, successor_routing_code, created_at, updated_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14) \
     ON CONFLICT(routing_code) DO UPDATE SET name = excluded.name, bic = excluded.bic, city = excluded.city, updated_at = excluded.updated_at";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub total_banks: u64,
    pub unique_bics: u64,
    pub banks_with_bic: u64,
}

/// Result of writing one record. A rejected record leaves the unit usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Rejected(String),
}

/// Bookkeeping row stored alongside the records it describes.
#[derive(Debug, Clone)]
pub struct ImportRunRecord {
    pub id: String,
    pub source: String,
    pub source_sha256: String,
    pub started_at: String,
    pub finished_at: String,
    pub imported: u64,
    pub errors: u64,
}

/// A registry destination that can open an all-or-nothing unit of work.
pub trait BankStore {
    type Unit<'a>: ImportUnit
    where
        Self: 'a;

    fn begin(&self) -> Result<Self::Unit<'_>, AppError>;

    fn stats(&self) -> Result<RegistryStats, AppError>;
}

/// An open unit of work. Dropping it without `commit` rolls everything back.
pub trait ImportUnit {
    /// Delete every registry row; returns how many were removed.
    fn clear(&mut self) -> Result<usize, AppError>;

    /// Insert the record, or refresh name/bic/city on an existing routing code.
    /// `Err` means the unit itself is broken and must be abandoned.
    fn upsert(&mut self, record: &BankRecord, touched_at: &str) -> Result<WriteOutcome, AppError>;

    fn record_run(&mut self, run: &ImportRunRecord) -> Result<(), AppError>;

    fn commit(self) -> Result<(), AppError>;
}

impl BankStore for DbPool {
    type Unit<'a> = SqliteImportUnit<'a>
    where
        Self: 'a;

    fn begin(&self) -> Result<SqliteImportUnit<'_>, AppError> {
        let conn = get_connection(self);
        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| AppError::Transaction(format!("begin failed: {}", e)))?;
        Ok(SqliteImportUnit {
            conn,
            finished: false,
        })
    }

    fn stats(&self) -> Result<RegistryStats, AppError> {
        let conn = get_connection(self);
        query_stats(&conn)
    }
}

fn query_stats(conn: &Connection) -> Result<RegistryStats, AppError> {
    let stats = conn
        .query_row(
            "SELECT COUNT(*), COUNT(DISTINCT NULLIF(bic, '')), COUNT(NULLIF(bic, '')) FROM banks",
            [],
            |row| {
                Ok(RegistryStats {
                    total_banks: row.get::<_, i64>(0)? as u64,
                    unique_bics: row.get::<_, i64>(1)? as u64,
                    banks_with_bic: row.get::<_, i64>(2)? as u64,
                })
            },
        )
        .map_err(|e| AppError::Db(e.to_string()))?;
    Ok(stats)
}

/// SQLite unit of work holding the connection lock until commit or drop.
pub struct SqliteImportUnit<'a> {
    conn: MutexGuard<'a, Connection>,
    finished: bool,
}

impl ImportUnit for SqliteImportUnit<'_> {
    fn clear(&mut self) -> Result<usize, AppError> {
        self.conn
            .execute("DELETE FROM banks", [])
            .map_err(|e| AppError::Transaction(format!("clearing banks failed: {}", e)))
    }

    fn upsert(&mut self, record: &BankRecord, touched_at: &str) -> Result<WriteOutcome, AppError> {
        // Per-record savepoint so a rejected row does not poison the unit
        self.conn
            .execute_batch("SAVEPOINT bank_row")
            .map_err(|e| AppError::Transaction(format!("savepoint failed: {}", e)))?;

        let written = self.conn.execute(
            UPSERT_BANK,
            params![
                record.routing_code,
                record.record_marker,
                record.name,
                record.postal_code,
                record.city,
                record.short_name,
                record.pan,
                record.bic,
                record.checksum_method,
                record.record_sequence,
                record.change_flag,
                record.deleted_routing_code,
                record.successor_routing_code,
                touched_at,
            ],
        );

        match written {
            Ok(_) => {
                self.conn
                    .execute_batch("RELEASE bank_row")
                    .map_err(|e| AppError::Transaction(format!("release failed: {}", e)))?;
                Ok(WriteOutcome::Written)
            }
            Err(e) => {
                self.conn
                    .execute_batch("ROLLBACK TO bank_row; RELEASE bank_row")
                    .map_err(|e| AppError::Transaction(format!("rollback to savepoint failed: {}", e)))?;
                Ok(WriteOutcome::Rejected(e.to_string()))
            }
        }
    }

    fn record_run(&mut self, run: &ImportRunRecord) -> Result<(), AppError> {
        self.conn
            .execute(
                "INSERT INTO import_runs (id, source, source_sha256, started_at, finished_at, imported, errors) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    run.id,
                    run.source,
                    run.source_sha256,
                    run.started_at,
                    run.finished_at,
                    run.imported as i64,
                    run.errors as i64,
                ],
            )
            .map_err(|e| AppError::Transaction(format!("recording import run failed: {}", e)))?;
        Ok(())
    }

    fn commit(mut self) -> Result<(), AppError> {
        // Drop rolls back whatever is still open if COMMIT itself fails
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| AppError::Transaction(format!("commit failed: {}", e)))?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for SqliteImportUnit<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.conn.execute_batch("ROLLBACK") {
            log::error!("Rollback of import unit failed: {}", e);
        } else {
            log::warn!("Import unit rolled back");
        }
    }
}
