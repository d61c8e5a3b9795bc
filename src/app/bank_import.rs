//! Bank registry import: decode the feed, normalize each line and replace the
//! registry inside a single unit of work.
//!
//! Lines are processed strictly in file order, so a routing code that appears
//! twice ends up with the name/bic/city of its last occurrence.

use crate::domain::{decode_latin1, parse_line, SkipReason};
use crate::error::AppError;
use crate::infra::{BankStore, ImportRunRecord, ImportUnit, RegistryStats, WriteOutcome};
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_VERBOSE_ERROR_LIMIT: usize = 5;
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    /// Record errors logged at warn level and kept in the report; later ones go to debug.
    pub verbose_error_limit: usize,
    /// Progress is reported every this many written records. 0 disables it.
    pub progress_interval: u64,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            verbose_error_limit: DEFAULT_VERBOSE_ERROR_LIMIT,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// A single record the store refused. Never aborts the run.
#[derive(Debug, Clone, Error, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("line {line} ({routing_code}): {message}")]
pub struct RecordWriteError {
    pub line: usize,
    pub routing_code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub run_id: String,
    pub source: String,
    pub source_sha256: String,
    pub imported: u64,
    pub errors: u64,
    /// All zero when `stats_error` is set.
    pub stats: RegistryStats,
    /// Why statistics could not be read after the commit. The import itself succeeded.
    pub stats_error: Option<String>,
    /// The first `verbose_error_limit` record errors.
    pub error_samples: Vec<RecordWriteError>,
    pub started_at: String,
    pub finished_at: String,
}

#[derive(Debug, Default)]
struct Tally {
    imported: u64,
    errors: u64,
    samples: Vec<RecordWriteError>,
}

impl Tally {
    fn reject(&mut self, err: RecordWriteError, verbose_limit: usize) {
        self.errors += 1;
        if self.samples.len() < verbose_limit {
            log::warn!("Failed to import {}", err);
            self.samples.push(err);
        } else {
            log::debug!("Failed to import {}", err);
        }
    }
}

/// Import the registry file at `source_path`. The file is read completely
/// before the destination is touched.
pub fn import_bank_file<S: BankStore>(
    store: &S,
    source_path: &Path,
    options: &ImportOptions,
) -> Result<ImportReport, AppError> {
    let bytes = std::fs::read(source_path)
        .map_err(|e| AppError::Io(format!("{}: {}", source_path.display(), e)))?;
    log::info!("Read {} bytes from {}", bytes.len(), source_path.display());
    import_bank_bytes(
        store,
        &bytes,
        &source_path.display().to_string(),
        options,
        &mut |_| {},
    )
}

/// Import raw Latin-1 feed bytes.
pub fn import_bank_bytes<S: BankStore>(
    store: &S,
    bytes: &[u8],
    source: &str,
    options: &ImportOptions,
    on_progress: &mut dyn FnMut(u64),
) -> Result<ImportReport, AppError> {
    let text = decode_latin1(bytes);
    run_import(store, &text, source, sha256_hex(bytes), options, on_progress)
}

/// Import already decoded feed text.
pub fn import_bank_text<S: BankStore>(
    store: &S,
    text: &str,
    source: &str,
    options: &ImportOptions,
) -> Result<ImportReport, AppError> {
    import_bank_text_with_progress(store, text, source, options, &mut |_| {})
}

pub fn import_bank_text_with_progress<S: BankStore>(
    store: &S,
    text: &str,
    source: &str,
    options: &ImportOptions,
    on_progress: &mut dyn FnMut(u64),
) -> Result<ImportReport, AppError> {
    run_import(
        store,
        text,
        source,
        sha256_hex(text.as_bytes()),
        options,
        on_progress,
    )
}

fn run_import<S: BankStore>(
    store: &S,
    text: &str,
    source: &str,
    source_sha256: String,
    options: &ImportOptions,
    on_progress: &mut dyn FnMut(u64),
) -> Result<ImportReport, AppError> {
    let run_id = Uuid::new_v4().to_string();
    let started_at = Utc::now().to_rfc3339();
    log::info!("Importing bank registry from {} (run {})", source, run_id);

    let mut unit = store.begin()?;
    let removed = unit.clear()?;
    log::info!("Cleared {} existing banks", removed);

    let mut tally = Tally::default();
    // Line 1 is the header, whatever it contains
    for (idx, line) in text.lines().enumerate().skip(1) {
        let line_no = idx + 1;
        let record = match parse_line(line) {
            Ok(record) => record,
            Err(SkipReason::Blank) => continue,
            Err(reason) => {
                log::debug!("Skipping line {}: {}", line_no, reason);
                continue;
            }
        };

        match unit.upsert(&record, &started_at)? {
            WriteOutcome::Written => {
                tally.imported += 1;
                if options.progress_interval > 0 && tally.imported % options.progress_interval == 0 {
                    log::info!("Imported {} banks", tally.imported);
                    on_progress(tally.imported);
                }
            }
            WriteOutcome::Rejected(message) => tally.reject(
                RecordWriteError {
                    line: line_no,
                    routing_code: record.routing_code,
                    message,
                },
                options.verbose_error_limit,
            ),
        }
    }

    let finished_at = Utc::now().to_rfc3339();
    unit.record_run(&ImportRunRecord {
        id: run_id.clone(),
        source: source.to_string(),
        source_sha256: source_sha256.clone(),
        started_at: started_at.clone(),
        finished_at: finished_at.clone(),
        imported: tally.imported,
        errors: tally.errors,
    })?;
    unit.commit()?;

    let suppressed = tally.errors.saturating_sub(tally.samples.len() as u64);
    if suppressed > 0 {
        log::info!("{} further record errors not shown", suppressed);
    }

    // The data is committed at this point; a failing statistics query must not fail the run
    let (stats, stats_error) = match store.stats() {
        Ok(stats) => {
            log::info!(
                "Import finished: {} imported, {} errors; {} banks, {} unique BICs, {} with BIC",
                tally.imported,
                tally.errors,
                stats.total_banks,
                stats.unique_bics,
                stats.banks_with_bic
            );
            (stats, None)
        }
        Err(e) => {
            log::warn!(
                "Import finished: {} imported, {} errors; statistics unavailable: {}",
                tally.imported,
                tally.errors,
                e
            );
            (RegistryStats::default(), Some(e.to_string()))
        }
    };

    Ok(ImportReport {
        run_id,
        source: source.to_string(),
        source_sha256,
        imported: tally.imported,
        errors: tally.errors,
        stats,
        stats_error,
        error_samples: tally.samples,
        started_at,
        finished_at,
    })
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
