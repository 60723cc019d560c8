use crate::models::{Priority, ReportReason};
use crate::services::reliability::TrustAdjustment;

/// Starting priority for a reason before reporter history is considered.
pub fn base_priority(reason: ReportReason) -> Priority {
    match reason {
        ReportReason::Violence | ReportReason::HateSpeech | ReportReason::Harassment => {
            Priority::High
        }
        ReportReason::Spam | ReportReason::Other => Priority::Low,
        ReportReason::SexualContent
        | ReportReason::Misinformation
        | ReportReason::Copyright
        | ReportReason::Privacy
        | ReportReason::Impersonation => Priority::Medium,
    }
}

/// Final triage priority: the reason's base moved one step by reporter trust.
pub fn score(reason: ReportReason, adjustment: TrustAdjustment) -> Priority {
    let base = base_priority(reason);
    match adjustment {
        TrustAdjustment::Upgrade => base.raised(),
        TrustAdjustment::Downgrade => base.lowered(),
        TrustAdjustment::Neutral => base,
    }
}
