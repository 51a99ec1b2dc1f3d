//! Multi-factor relevance scoring for recall candidates.
//!
//! Distance dominates; recency, importance, usage, and confidence shade the
//! result. Scope boosts live in the engine so this stays scope-free and
//! directly testable against the monotonicity laws.

use super::types::Memory;
use crate::config::RecallConfig;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Score a memory against its query distance.
///
/// ```text
/// similarity = 1 / (1 + d)
/// recency    = 0.7 + 0.3·exp(-age_days / half_life_days)   (1.0 when boost off)
/// importance = 0.5 + 0.1·clamp(importance, 1, 5)
/// usage      = 1 + 0.05·min(access_count, 10)
/// score      = similarity · recency · importance · usage · confidence
/// ```
pub fn score(memory: &Memory, distance: f64, now: i64, config: &RecallConfig) -> f64 {
    let similarity = 1.0 / (1.0 + distance);

    let recency = if config.boost_recency {
        let age_days = (now - memory.created_at) as f64 / SECONDS_PER_DAY;
        0.7 + 0.3 * (-age_days / config.recency_half_life_days).exp()
    } else {
        1.0
    };

    let importance = 0.5 + 0.1 * (memory.importance.clamp(1, 5) as f64);
    let usage = 1.0 + 0.05 * (memory.access_count.min(10) as f64);

    similarity * recency * importance * usage * memory.confidence
}
