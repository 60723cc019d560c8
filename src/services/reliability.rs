use crate::{
    error::AppResult,
    models::{report, Report, ReportStatus},
};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};
use serde::Serialize;
use utoipa::ToSchema;

/// Reporters need strictly more than this many reports before their history
/// moves priority in either direction.
pub const MIN_HISTORY: u64 = 5;
pub const UPGRADE_ACCURACY: f64 = 0.8;
pub const DOWNGRADE_ACCURACY: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustAdjustment {
    Upgrade,
    Neutral,
    Downgrade,
}

/// A reporter's historical outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct TrackRecord {
    pub total: u64,
    pub resolved: u64,
    pub dismissed: u64,
    /// `resolved / (resolved + dismissed)`, or 0 with no decided reports.
    pub accuracy: f64,
}

impl TrackRecord {
    pub fn from_counts(total: u64, resolved: u64, dismissed: u64) -> Self {
        let decided = resolved + dismissed;
        let accuracy = if decided == 0 {
            0.0
        } else {
            resolved as f64 / decided as f64
        };
        Self {
            total,
            resolved,
            dismissed,
            accuracy,
        }
    }

    pub fn adjustment(&self) -> TrustAdjustment {
        if self.total <= MIN_HISTORY {
            TrustAdjustment::Neutral
        } else if self.accuracy > UPGRADE_ACCURACY {
            TrustAdjustment::Upgrade
        } else if self.accuracy < DOWNGRADE_ACCURACY {
            TrustAdjustment::Downgrade
        } else {
            TrustAdjustment::Neutral
        }
    }
}

/// Count the reporter's reports by status in one grouped query.
pub async fn track_record<C: ConnectionTrait>(db: &C, reporter_id: i32) -> AppResult<TrackRecord> {
    let rows: Vec<(ReportStatus, i64)> = Report::find()
        .select_only()
        .column(report::Column::Status)
        .column_as(report::Column::Id.count(), "count")
        .filter(report::Column::ReporterId.eq(reporter_id))
        .group_by(report::Column::Status)
        .into_tuple()
        .all(db)
        .await?;

    let (mut total, mut resolved, mut dismissed) = (0u64, 0u64, 0u64);
    for (status, count) in rows {
        let count = count.max(0) as u64;
        total += count;
        match status {
            ReportStatus::Resolved => resolved += count,
            ReportStatus::Dismissed => dismissed += count,
            ReportStatus::Pending | ReportStatus::Investigating => {}
        }
    }

    Ok(TrackRecord::from_counts(total, resolved, dismissed))
}
