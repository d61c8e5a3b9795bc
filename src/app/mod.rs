//! Application use cases.

mod bank;
mod bank_import;

pub use bank::{bank_get, import_history, registry_stats, BankDto, ImportRunDto};
pub use bank_import::{
    import_bank_bytes, import_bank_file, import_bank_text, import_bank_text_with_progress,
    ImportOptions, ImportReport, RecordWriteError, DEFAULT_PROGRESS_INTERVAL,
    DEFAULT_VERBOSE_ERROR_LIMIT,
};
