//! Domain: registry records, line normalization, feed decoding.

pub mod bank;
pub mod encoding;

pub use bank::{normalize_field, parse_line, BankRecord, SkipReason, FIELD_COUNT};
pub use encoding::decode_latin1;
