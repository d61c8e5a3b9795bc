//! Registry queries: lookup by routing code, statistics, import history.

use crate::domain::BankRecord;
use crate::error::AppError;
use crate::infra::{get_connection, BankStore, DbPool, RegistryStats};
use rusqlite::OptionalExtension;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDto {
    #[serde(flatten)]
    pub record: BankRecord,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRunDto {
    pub id: String,
    pub source: String,
    pub source_sha256: String,
    pub started_at: String,
    pub finished_at: String,
    pub imported: u64,
    pub errors: u64,
}

pub fn bank_get(pool: &DbPool, routing_code: &str) -> Result<BankDto, AppError> {
    let routing_code = routing_code.trim();
    let conn = get_connection(pool);
    conn.query_row(
        "SELECT routing_code, record_marker, name, postal_code, city, short_name, pan, bic, checksum_method, record_sequence, change_flag, deleted_routing_code, successor_routing_code, created_at, updated_at FROM banks WHERE routing_code = ?1",
        [routing_code],
        |row| {
            Ok(BankDto {
                record: BankRecord {
                    routing_code: row.get(0)?,
                    record_marker: row.get(1)?,
                    name: row.get(2)?,
                    postal_code: row.get(3)?,
                    city: row.get(4)?,
                    short_name: row.get(5)?,
                    pan: row.get(6)?,
                    bic: row.get(7)?,
                    checksum_method: row.get(8)?,
                    record_sequence: row.get(9)?,
                    change_flag: row.get(10)?,
                    deleted_routing_code: row.get(11)?,
                    successor_routing_code: row.get(12)?,
                },
                created_at: row.get(13)?,
                updated_at: row.get(14)?,
            })
        },
    )
    .optional()
    .map_err(|e| AppError::Db(e.to_string()))?
    .ok_or_else(|| AppError::NotFound(format!("bank {}", routing_code)))
}

pub fn registry_stats(pool: &DbPool) -> Result<RegistryStats, AppError> {
    pool.stats()
}

/// Committed imports, newest first.
pub fn import_history(pool: &DbPool, limit: usize) -> Result<Vec<ImportRunDto>, AppError> {
    let conn = get_connection(pool);
    let mut stmt = conn
        .prepare("SELECT id, source, source_sha256, started_at, finished_at, imported, errors FROM import_runs ORDER BY started_at DESC, rowid DESC LIMIT ?1")
        .map_err(|e| AppError::Db(e.to_string()))?;
    let rows = stmt.query_map([limit as i64], |row| {
        Ok(ImportRunDto {
            id: row.get(0)?,
            source: row.get(1)?,
            source_sha256: row.get(2)?,
            started_at: row.get(3)?,
            finished_at: row.get(4)?,
            imported: row.get::<_, i64>(5)? as u64,
            errors: row.get::<_, i64>(6)? as u64,
        })
    })?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r.map_err(|e| AppError::Db(e.to_string()))?);
    }
    Ok(out)
}
