//! Plain-text rendering of reports.

use std::fmt::Write;

use crate::result::{ReportResult, ReportStatus};

/// Shown when the user has not recorded anything yet.
pub const NO_EXPENSES: &str = "You have no expenses yet";

/// Shown instead of a failed build's cause.
pub const REPORT_FAILED: &str = "Can't get your expenses atm. Try later";

/// Render a report as chat text.
///
/// One `Category: amount` line per record, a blank line, then the total.
/// Failures render as a generic apology; the cause is for logs only.
pub fn render(result: &ReportResult) -> String {
    match &result.status {
        ReportStatus::NoData => NO_EXPENSES.to_string(),
        ReportStatus::Failed(_) => REPORT_FAILED.to_string(),
        ReportStatus::Success => {
            let mut text = String::new();
            for record in &result.records {
                let _ = writeln!(text, "{}: {:.2}", record.category, record.amount);
            }
            text.push('\n');
            let _ = write!(text, "Total: {:.2}", result.total);
            text
        }
    }
}
