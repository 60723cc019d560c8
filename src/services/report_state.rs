//! Report lifecycle.
//!
//! ```text
//! pending ──► investigating ──► resolved | dismissed
//!    └──────────────────────────► resolved | dismissed
//! ```
//!
//! Terminal states are final; a new report has to be filed instead.

use crate::error::{AppError, AppResult};
use crate::models::ReportStatus;

pub fn can_transition(from: ReportStatus, to: ReportStatus) -> bool {
    use ReportStatus::*;
    matches!(
        (from, to),
        (Pending, Investigating)
            | (Pending, Resolved)
            | (Pending, Dismissed)
            | (Investigating, Resolved)
            | (Investigating, Dismissed)
    )
}

/// The status a report ends up in. Asking for the current status is a no-op.
pub fn next_status(current: ReportStatus, requested: Option<ReportStatus>) -> AppResult<ReportStatus> {
    match requested {
        None => Ok(current),
        Some(to) if to == current => Ok(current),
        Some(to) if can_transition(current, to) => Ok(to),
        Some(to) => Err(AppError::InvalidTransition { from: current, to }),
    }
}

/// Whether moving `from -> to` closes the report, which is when the reporter
/// hears back.
pub fn closes(from: ReportStatus, to: ReportStatus) -> bool {
    !from.is_terminal() && to.is_terminal()
}
