//! Infrastructure: SQLite connection, migrations, registry store, import lock.

pub mod db;
pub mod lock;
pub mod store;

pub(crate) use db::get_connection;
pub use db::{init_db, init_test_db, DbPool};
pub use lock::ImportLock;
pub use store::{BankStore, ImportRunRecord, ImportUnit, RegistryStats, SqliteImportUnit, WriteOutcome};
