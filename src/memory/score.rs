//! Exchange-level importance scoring.

use crate::memory::types::{ExtractedFact, FactKind};

/// Baseline salience for an exchange with no stronger signal.
const BASELINE: u8 = 5;

/// Score an exchange's salience on the 1–10 scale.
///
/// Every signal raises the score to a floor; the final score is the maximum
/// of all applicable floors and never drops below the baseline. Fact-kind
/// floors mirror the per-fact importances assigned by the extractor:
/// personal_info 9, location 8, work 7. Questions and long messages floor
/// at 6.
pub fn calculate_importance(user_message: &str, facts: &[ExtractedFact]) -> u8 {
    let mut score = BASELINE;

    for fact in facts {
        let floor = match fact.kind {
            FactKind::PersonalInfo => 9,
            FactKind::Location => 8,
            FactKind::Work => 7,
            _ => BASELINE,
        };
        score = score.max(floor);
    }

    if user_message.contains('?') {
        score = score.max(6);
    }
    if user_message.len() > 200 {
        score = score.max(6);
    }

    score
}
