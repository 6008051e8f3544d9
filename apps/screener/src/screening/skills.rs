//! Skill Matcher: recruiter-supplied skills checked against resume text by
//! case-insensitive substring containment. No word boundaries, no stemming.

use serde::Serialize;

/// Ordered, lowercased, trimmed, non-empty skill tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkillSet(Vec<String>);

impl SkillSet {
    /// Splits a comma-separated list. Blank input yields an empty set and blank
    /// tokens such as the middle of `"rust,,go"` are dropped.
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// `matched` and `not_matched` partition the parsed skill set in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub matched: Vec<String>,
    pub not_matched: Vec<String>,
}

impl MatchResult {
    #[allow(dead_code)]
    pub fn total(&self) -> usize {
        self.matched.len() + self.not_matched.len()
    }
}

#[allow(dead_code)]
pub fn match_skills(preferred_skills_raw: &str, resume_text: &str) -> MatchResult {
    match_skill_set(&SkillSet::parse(preferred_skills_raw), resume_text)
}

/// Matches an already-parsed set; the ranker parses once per batch.
pub fn match_skill_set(skills: &SkillSet, resume_text: &str) -> MatchResult {
    if skills.is_empty() {
        return MatchResult::default();
    }

    let haystack = resume_text.to_lowercase();
    let (matched, not_matched): (Vec<String>, Vec<String>) = skills
        .iter()
        .map(String::from)
        .partition(|skill| !skill.is_empty() && haystack.contains(skill.as_str()));

    MatchResult {
        matched,
        not_matched,
    }
}
