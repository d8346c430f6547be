//! Record finalization: branch-specific row shapes and the
//! two-destination append fan-out.

use chrono::{DateTime, Utc};
use respira_core::RespiraError;
use respira_session::{Branch, Session};
use respira_sheets::RowAppender;
use std::sync::Arc;
use tracing::{info, warn};

/// Placeholder for any field the dialog never collected.
pub const NOT_AVAILABLE: &str = "NA";

// Upstream sheet conventions: session start uses the US date order,
// finalization time the European one.
const START_FORMAT: &str = "%m/%d/%Y %H:%M:%S";
const FINALIZED_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Assembles the row for a completed confirm-branch session.
///
/// Order: start, finalized, name, last name, user id, handle link,
/// province, delivered, delivered qty A, delivered qty B, PLA needed,
/// diameter, PLA qty received, coils returned, coils qty.
pub fn confirmed_row(session: &Session, finalized_at: DateTime<Utc>) -> Vec<String> {
    let f = &session.fields;
    let mut row = identity_cells(session, finalized_at);
    row.extend([
        text_cell(&f.delivered),
        count_cell(&f.qty_delivered_a),
        count_cell(&f.qty_delivered_b),
        text_cell(&f.pla_received),
        text_cell(&f.pla_diameter),
        count_cell(&f.pla_qty_received),
        text_cell(&f.coils_returned),
        count_cell(&f.coils_returned_qty),
    ]);
    row
}

/// Assembles the row for a completed schedule-branch session.
///
/// Order: start, finalized, name, last name, user id, handle link,
/// province, prepared qty A, prepared qty B, municipality, address,
/// time window, phone.
pub fn scheduled_row(session: &Session, finalized_at: DateTime<Utc>) -> Vec<String> {
    let f = &session.fields;
    let mut row = identity_cells(session, finalized_at);
    row.extend([
        count_cell(&f.qty_prepared_a),
        count_cell(&f.qty_prepared_b),
        text_cell(&f.municipality),
        text_cell(&f.address),
        text_cell(&f.time_window),
        text_cell(&f.phone),
    ]);
    row
}

fn identity_cells(session: &Session, finalized_at: DateTime<Utc>) -> Vec<String> {
    vec![
        session.started_at.format(START_FORMAT).to_string(),
        finalized_at.format(FINALIZED_FORMAT).to_string(),
        session.first_name.clone(),
        text_cell(&session.last_name),
        session.user_id.to_string(),
        handle_cell(session.handle.as_deref()),
        text_cell(&session.fields.province),
    ]
}

fn text_cell(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn count_cell(value: &Option<i64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |n| n.to_string())
}

/// Spreadsheet hyperlink cell pointing at the user's public handle.
fn handle_cell(handle: Option<&str>) -> String {
    match handle {
        Some(h) if !h.is_empty() => {
            format!("=HYPERLINK(\"https://t.me/{h}\", \"{h}\")")
        }
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Sends each finalized session's row to every configured destination.
pub struct RecordFinalizer {
    destinations: Vec<Arc<dyn RowAppender>>,
    confirmed_sheet: String,
    scheduled_sheet: String,
}

impl RecordFinalizer {
    /// Creates a finalizer writing to the given destinations (typically
    /// primary and backup, in that order).
    pub fn new(
        destinations: Vec<Arc<dyn RowAppender>>,
        confirmed_sheet: impl Into<String>,
        scheduled_sheet: impl Into<String>,
    ) -> Self {
        Self {
            destinations,
            confirmed_sheet: confirmed_sheet.into(),
            scheduled_sheet: scheduled_sheet.into(),
        }
    }

    /// Builds the branch-specific row and appends it to every
    /// destination.
    ///
    /// Appends are independent best-effort attempts: a failing
    /// destination is logged and skipped, never retried, and never
    /// blocks the remaining destinations. Errors are returned for the
    /// caller's bookkeeping only — the user has already received the
    /// finalization message.
    pub async fn finalize(&self, session: &Session) -> Vec<RespiraError> {
        let Some(branch) = session.branch else {
            warn!(user_id = session.user_id, "Finalize called without a branch tag");
            return Vec::new();
        };

        let now = Utc::now();
        let (sheet, row) = match branch {
            Branch::Confirm => (self.confirmed_sheet.as_str(), confirmed_row(session, now)),
            Branch::Schedule => (self.scheduled_sheet.as_str(), scheduled_row(session, now)),
        };

        info!(
            user = %session.first_name,
            sheet = %sheet,
            cells = row.len(),
            "Saving finalized record"
        );

        let mut errors = Vec::new();
        for destination in &self.destinations {
            if let Err(e) = destination.append(sheet, &row).await {
                warn!(
                    destination = %destination.name(),
                    user_id = session.user_id,
                    error = %e,
                    "Persistence append failed"
                );
                errors.push(e);
            }
        }
        errors
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use respira_core::TurnUser;

    fn session(handle: Option<&str>) -> Session {
        Session::new(
            5,
            &TurnUser {
                id: 5,
                first_name: "Ane".to_string(),
                last_name: Some("Egia".to_string()),
                handle: handle.map(str::to_string),
            },
        )
    }

    #[test]
    fn test_confirmed_row_has_fifteen_cells_with_na_gaps() {
        let mut s = session(None);
        s.branch = Some(Branch::Confirm);
        s.fields.province = Some("Bizkaia".to_string());
        s.fields.delivered = Some("No".to_string());

        let row = confirmed_row(&s, Utc::now());
        assert_eq!(row.len(), 15);
        assert_eq!(row[6], "Bizkaia");
        assert_eq!(row[7], "No");
        // Quantities were never asked; they render as NA.
        assert_eq!(row[8], NOT_AVAILABLE);
        assert_eq!(row[9], NOT_AVAILABLE);
        // PLA qty received is never collected in the dialog.
        assert_eq!(row[12], NOT_AVAILABLE);
    }

    #[test]
    fn test_scheduled_row_order() {
        let mut s = session(Some("ane_egia"));
        s.branch = Some(Branch::Schedule);
        s.fields.province = Some("Bizkaia".to_string());
        s.fields.qty_prepared_a = Some(5);
        s.fields.qty_prepared_b = Some(3);
        s.fields.municipality = Some("Bilbao".to_string());
        s.fields.address = Some("Calle Mayor 1".to_string());
        s.fields.time_window = Some("Mañana".to_string());
        s.fields.phone = Some("679123456".to_string());

        let row = scheduled_row(&s, Utc::now());
        assert_eq!(row.len(), 13);
        assert_eq!(
            &row[7..],
            &[
                "5".to_string(),
                "3".to_string(),
                "Bilbao".to_string(),
                "Calle Mayor 1".to_string(),
                "Mañana".to_string(),
                "679123456".to_string(),
            ]
        );
    }

    #[test]
    fn test_handle_renders_as_hyperlink_formula() {
        let s = session(Some("ane_egia"));
        let row = scheduled_row(&s, Utc::now());
        assert_eq!(
            row[5],
            "=HYPERLINK(\"https://t.me/ane_egia\", \"ane_egia\")"
        );
    }

    #[test]
    fn test_missing_handle_renders_na() {
        let s = session(None);
        let row = scheduled_row(&s, Utc::now());
        assert_eq!(row[5], NOT_AVAILABLE);
    }

    #[test]
    fn test_timestamp_formats() {
        let s = session(None);
        let finalized = Utc::now();
        let row = scheduled_row(&s, finalized);
        assert_eq!(row[0], s.started_at.format("%m/%d/%Y %H:%M:%S").to_string());
        assert_eq!(row[1], finalized.format("%d/%m/%Y %H:%M:%S").to_string());
    }
}
