//! Spreadsheet persistence for finalized Respira records.
//!
//! The dialog engine hands completed records to a [`RowAppender`]; the
//! shipped implementation, [`SheetsClient`], appends rows to a Google
//! Sheets spreadsheet over the REST API. Two independent appenders
//! (primary and backup) receive identical payloads per finalized session.

/// The append seam the record finalizer writes through.
pub mod appender;
/// Google Sheets REST implementation.
pub mod google;

pub use appender::RowAppender;
pub use google::SheetsClient;
