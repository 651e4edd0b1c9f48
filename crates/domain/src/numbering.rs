//! Human-readable document numbers for orders and returns.

use chrono::NaiveDate;

/// Formats a document number as `PREFIX-YYYYMMDD-NNNN`.
///
/// The sequence restarts each day; the store hands out the next value.
pub fn document_number(prefix: &str, day: NaiveDate, sequence: u32) -> String {
    format!("{}-{}-{:04}", prefix, day.format("%Y%m%d"), sequence)
}
