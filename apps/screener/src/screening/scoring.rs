use serde::Serialize;

/// ATS weighting, in points out of 100.
///
/// - 60 semantic similarity
/// - 30 preferred-skill match
/// - 10 reserved for future enhancements (never awarded)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoringWeights {
    pub semantic: f64,
    pub skills: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            semantic: 60.0,
            skills: 30.0,
        }
    }
}

/// Rounded to 2 decimals. `final_ats_score` is the rounded sum of the unrounded
/// components, so it can differ from the sum of the rounded ones by 0.01.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub final_ats_score: f64,
    pub semantic_component: f64,
    pub skill_component: f64,
}

/// Combines a percent semantic score with the skill-match ratio.
/// With no preferred skills the skill component is 0; its weight is not redistributed.
pub fn final_score(
    semantic_score: f64,
    matched_count: usize,
    total_skill_count: usize,
) -> ScoreBreakdown {
    compute_breakdown(
        semantic_score,
        matched_count,
        total_skill_count,
        &ScoringWeights::default(),
    )
}

fn compute_breakdown(
    semantic_score: f64,
    matched_count: usize,
    total_skill_count: usize,
    weights: &ScoringWeights,
) -> ScoreBreakdown {
    let semantic_component = semantic_score / 100.0 * weights.semantic;
    let skill_component = if total_skill_count > 0 {
        matched_count as f64 / total_skill_count as f64 * weights.skills
    } else {
        0.0
    };

    ScoreBreakdown {
        final_ats_score: round2(semantic_component + skill_component),
        semantic_component: round2(semantic_component),
        skill_component: round2(skill_component),
    }
}

/// Two decimals, ties rounded half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
