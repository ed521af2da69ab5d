use policyfeed_core::{PolicyReport, QualityReport};

/// Publish only when neither gate hard-failed. Soft failures do not block.
pub fn deploy_ready(quality: &QualityReport, policy: &PolicyReport) -> bool {
    !quality.decision.is_hard_fail() && !policy.decision.is_hard_fail()
}
