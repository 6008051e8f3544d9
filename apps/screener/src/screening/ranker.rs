//! Batch Ranker: scores N resumes against one JD and orders them.
//!
//! Pipeline per resume: extract → minimum-content filter → semantic score →
//! skill match → weighted breakdown. Unreadable resumes are dropped, never
//! surfaced as errors; only a failure to embed the JD itself aborts the batch.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::models::document::Document;
use crate::screening::embedding::{Embedder, EmbeddingError};
use crate::screening::extractor::extract;
use crate::screening::scoring::final_score;
use crate::screening::similarity::semantic_score_with;
use crate::screening::skills::{match_skill_set, SkillSet};

/// Resumes whose trimmed text is shorter than this many characters are excluded.
pub const MIN_RESUME_CHARS: usize = 20;
pub const DEFAULT_MIN_JD_CHARS: usize = 30;
pub const DEFAULT_TOP_N: usize = 5;

/// One scored resume. `semantic_score` and `skill_score` are the weighted
/// components (out of 60 and 30), not the raw similarity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateResult {
    pub filename: String,
    pub ats_score: f64,
    pub semantic_score: f64,
    pub skill_score: f64,
    pub matched_skills: Vec<String>,
    pub not_matched_skills: Vec<String>,
}

/// Candidates sorted by `ats_score` descending; equal scores keep upload order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankedResults {
    pub candidates: Vec<CandidateResult>,
    /// Filenames dropped for having no usable text, in upload order.
    pub excluded: Vec<String>,
}

impl RankedResults {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// The first `n` candidates; presentation-only truncation.
    pub fn top(&self, n: usize) -> &[CandidateResult] {
        &self.candidates[..n.min(self.candidates.len())]
    }
}

/// True when `text` carries enough content to be worth scoring.
pub fn has_minimum_content(text: &str) -> bool {
    text.trim().chars().count() >= MIN_RESUME_CHARS
}

/// Scores every usable resume against `jd_text` and returns the full ranking.
///
/// An empty result means no resume had usable text; that is not an error here.
pub fn rank(
    embedder: &dyn Embedder,
    jd_text: &str,
    resumes: &[Document],
    preferred_skills_raw: &str,
) -> Result<RankedResults, EmbeddingError> {
    let skills = SkillSet::parse(preferred_skills_raw);
    // Embedded on the first usable resume, so a batch with none never touches the model.
    let mut jd_embedding: Option<Vec<f32>> = None;

    let mut ranked = RankedResults::default();

    for resume in resumes {
        let text = extract(resume);
        if !has_minimum_content(&text) {
            debug!(filename = %resume.filename, "Excluding resume without usable text");
            ranked.excluded.push(resume.filename.clone());
            continue;
        }

        if jd_embedding.is_none() {
            jd_embedding = Some(embedder.embed(jd_text)?);
        }
        let jd_vec = jd_embedding.as_deref().unwrap_or_default();

        let semantic = match semantic_score_with(embedder, jd_vec, &text) {
            Ok(score) => score,
            Err(e) => {
                warn!(
                    filename = %resume.filename,
                    error = %e,
                    "Embedding failed; excluding resume"
                );
                ranked.excluded.push(resume.filename.clone());
                continue;
            }
        };

        let skill_match = match_skill_set(&skills, &text);
        let breakdown = final_score(semantic, skill_match.matched.len(), skills.len());

        ranked.candidates.push(CandidateResult {
            filename: resume.filename.clone(),
            ats_score: breakdown.final_ats_score,
            semantic_score: breakdown.semantic_component,
            skill_score: breakdown.skill_component,
            matched_skills: skill_match.matched,
            not_matched_skills: skill_match.not_matched,
        });
    }

    // `sort_by` is stable, so ties keep upload order.
    ranked
        .candidates
        .sort_by(|a, b| b.ats_score.total_cmp(&a.ats_score));

    Ok(ranked)
}

// ────────────────────────────────────────────────────────────────────────────
// Screening: rank plus the input checks callers need to render guidance
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreeningStatus {
    Ranked,
    JobDescriptionTooShort,
    NoUsableResumes,
}

impl ScreeningStatus {
    /// User-facing guidance for the degenerate outcomes.
    pub fn message(self, policy: &ScreeningPolicy) -> Option<String> {
        match self {
            ScreeningStatus::Ranked => None,
            ScreeningStatus::JobDescriptionTooShort => Some(format!(
                "Job Description must be at least {} characters long.",
                policy.min_jd_chars
            )),
            ScreeningStatus::NoUsableResumes => {
                Some("No valid resume content found. Please upload readable files.".to_string())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreeningPolicy {
    pub min_jd_chars: usize,
    pub top_n: usize,
}

impl Default for ScreeningPolicy {
    fn default() -> Self {
        Self {
            min_jd_chars: DEFAULT_MIN_JD_CHARS,
            top_n: DEFAULT_TOP_N,
        }
    }
}

/// The JD is either typed in or uploaded; an uploaded document wins.
#[derive(Debug, Clone, Default)]
pub struct ScreeningRequest {
    pub jd_text: String,
    pub jd_document: Option<Document>,
    pub resumes: Vec<Document>,
    pub preferred_skills: String,
}

impl ScreeningRequest {
    pub fn resolve_jd_text(&self) -> String {
        match &self.jd_document {
            Some(doc) => extract(doc),
            None => self.jd_text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Screening {
    pub status: ScreeningStatus,
    pub jd_chars: usize,
    pub results: RankedResults,
}

impl Screening {
    pub fn top(&self, n: usize) -> &[CandidateResult] {
        self.results.top(n)
    }
}

/// Validates the JD, ranks the resumes, and reports a distinguishable status
/// instead of an error when the input is unusable.
pub fn screen(
    embedder: &dyn Embedder,
    request: &ScreeningRequest,
    policy: &ScreeningPolicy,
) -> Result<Screening, EmbeddingError> {
    let jd_text = request.resolve_jd_text();
    let jd_chars = jd_text.trim().chars().count();

    if jd_chars < policy.min_jd_chars {
        return Ok(Screening {
            status: ScreeningStatus::JobDescriptionTooShort,
            jd_chars,
            results: RankedResults::default(),
        });
    }

    let results = rank(
        embedder,
        &jd_text,
        &request.resumes,
        &request.preferred_skills,
    )?;

    let status = if results.is_empty() {
        ScreeningStatus::NoUsableResumes
    } else {
        ScreeningStatus::Ranked
    };

    info!(
        resumes = request.resumes.len(),
        ranked = results.len(),
        excluded = results.excluded.len(),
        ?status,
        "Screening complete"
    );

    Ok(Screening {
        status,
        jd_chars,
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screening::embedding::HashEmbedder;
    use crate::screening::extractor::tests::make_docx;

    const JD: &str =
        "Looking for a backend engineer with Python and distributed systems experience";

    fn txt(name: &str, body: &str) -> Document {
        Document::new(name, body.as_bytes().to_vec())
    }

    fn embedder() -> HashEmbedder {
        HashEmbedder::new(256)
    }

    /// Embeds every text to the same vector, so only skills separate candidates.
    struct ConstantEmbedder;

    impl Embedder for ConstantEmbedder {
        fn name(&self) -> &str {
            "constant"
        }
        fn dimensions(&self) -> usize {
            1
        }
        fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![1.0])
        }
    }

    /// Fails for any text containing "poison".
    struct FlakyEmbedder;

    impl Embedder for FlakyEmbedder {
        fn name(&self) -> &str {
            "flaky"
        }
        fn dimensions(&self) -> usize {
            1
        }
        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            if text.contains("poison") {
                Err(EmbeddingError::TokenizationFailed {
                    reason: "poisoned".to_string(),
                })
            } else {
                Ok(vec![1.0])
            }
        }
    }

    #[test]
    fn test_unreadable_resume_is_dropped() {
        let resumes = vec![
            txt("a.txt", "Python engineer who built distributed systems at scale"),
            Document::new("broken.pdf", b"\x00\x01 not a pdf".to_vec()),
            Document::new(
                "b.docx",
                make_docx(&["Frontend developer", "React and CSS, some Python"]),
            ),
        ];
        let ranked = rank(&embedder(), JD, &resumes, "python, kubernetes").unwrap();

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked.excluded, vec!["broken.pdf"]);
        assert!(ranked.candidates[0].ats_score >= ranked.candidates[1].ats_score);
        assert!(ranked.candidates.iter().all(|c| c.filename != "broken.pdf"));
    }

    #[test]
    fn test_short_text_is_excluded() {
        let resumes = vec![
            txt("short.txt", "   Python dev    \n"),
            txt("exactly20.txt", "  abcdefghijklmnopqrst  "),
            txt("unknown.rtf", "Plenty of text but an unsupported extension"),
        ];
        let ranked = rank(&embedder(), JD, &resumes, "").unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked.candidates[0].filename, "exactly20.txt");
        assert_eq!(ranked.excluded, vec!["short.txt", "unknown.rtf"]);
    }

    #[test]
    fn test_minimum_content_counts_characters() {
        // 19 two-byte characters
        assert!(!has_minimum_content(&"é".repeat(19)));
        assert!(has_minimum_content(&"é".repeat(20)));
    }

    #[test]
    fn test_scenario_skill_component() {
        let resumes = vec![txt(
            "jane.txt",
            "experienced Python developer, built systems in Go",
        )];
        let ranked = rank(&embedder(), JD, &resumes, "python, kubernetes, go").unwrap();
        let c = &ranked.candidates[0];
        assert_eq!(c.matched_skills, vec!["python", "go"]);
        assert_eq!(c.not_matched_skills, vec!["kubernetes"]);
        assert_eq!(c.skill_score, 20.0);
    }

    #[test]
    fn test_empty_skills_score_is_semantic_only() {
        let resumes = vec![txt("jane.txt", "Python backend engineer, distributed systems")];
        let ranked = rank(&embedder(), JD, &resumes, "").unwrap();
        let c = &ranked.candidates[0];
        assert!(c.matched_skills.is_empty());
        assert!(c.not_matched_skills.is_empty());
        assert_eq!(c.skill_score, 0.0);
        assert_eq!(c.ats_score, c.semantic_score);
    }

    #[test]
    fn test_sorted_descending() {
        let resumes = vec![
            txt("none.txt", "Pastry chef with a love of sourdough baking"),
            txt("all.txt", "Rust, Go and Kubernetes on distributed systems"),
            txt("some.txt", "Go developer on embedded firmware projects"),
        ];
        let ranked = rank(&ConstantEmbedder, JD, &resumes, "rust, go, kubernetes").unwrap();
        let names: Vec<_> = ranked.candidates.iter().map(|c| c.filename.as_str()).collect();
        assert_eq!(names, vec!["all.txt", "some.txt", "none.txt"]);
        assert!(ranked
            .candidates
            .windows(2)
            .all(|w| w[0].ats_score >= w[1].ats_score));
    }

    #[test]
    fn test_ties_keep_upload_order() {
        let resumes = vec![
            txt("first.txt", "Go engineer, cloud infrastructure team"),
            txt("second.txt", "Rust developer on storage engines here"),
            txt("third.txt", "Go engineer, cloud infrastructure team"),
        ];
        let ranked = rank(&ConstantEmbedder, JD, &resumes, "go").unwrap();
        let names: Vec<_> = ranked.candidates.iter().map(|c| c.filename.as_str()).collect();
        assert_eq!(names, vec!["first.txt", "third.txt", "second.txt"]);
    }

    #[test]
    fn test_rank_is_idempotent() {
        let resumes = vec![
            txt("a.txt", "Python engineer who built distributed systems at scale"),
            txt("b.txt", "Kubernetes operator and Go developer for platform teams"),
            txt("c.txt", "Data analyst, SQL and dashboards, some Python scripting"),
        ];
        let e = embedder();
        let first = rank(&e, JD, &resumes, "python, go, sql").unwrap();
        let second = rank(&e, JD, &resumes, "python, go, sql").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_all_excluded_is_empty_not_error() {
        let resumes = vec![txt("a.txt", ""), Document::new("b.pdf", Vec::<u8>::new())];
        let ranked = rank(&embedder(), JD, &resumes, "python").unwrap();
        assert!(ranked.is_empty());
        assert_eq!(ranked.excluded.len(), 2);
    }

    #[test]
    fn test_resume_embedding_failure_excludes_only_that_resume() {
        let resumes = vec![
            txt("ok.txt", "Python engineer who built distributed systems"),
            txt("bad.txt", "this resume text contains poison somewhere"),
        ];
        let ranked = rank(&FlakyEmbedder, JD, &resumes, "python").unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked.excluded, vec!["bad.txt"]);
    }

    #[test]
    fn test_jd_embedding_failure_is_an_error() {
        let resumes = vec![txt("ok.txt", "Python engineer who built distributed systems")];
        let err = rank(&FlakyEmbedder, "poison JD", &resumes, "").unwrap_err();
        assert!(matches!(err, EmbeddingError::TokenizationFailed { .. }));
    }

    #[test]
    fn test_unembeddable_jd_with_no_usable_resumes_is_not_an_error() {
        let resumes = vec![txt("a.txt", "tiny"), txt("b.pdf", "not a pdf")];
        let ranked = rank(&FlakyEmbedder, "poison JD for a backend engineer role", &resumes, "")
            .unwrap();
        assert!(ranked.is_empty());
        assert_eq!(ranked.excluded, vec!["a.txt", "b.pdf"]);

        let request = ScreeningRequest {
            jd_text: "poison JD for a backend engineer role".to_string(),
            resumes,
            ..Default::default()
        };
        let screening = screen(&FlakyEmbedder, &request, &ScreeningPolicy::default()).unwrap();
        assert_eq!(screening.status, ScreeningStatus::NoUsableResumes);
    }

    #[test]
    fn test_top_truncates_without_reordering() {
        let resumes: Vec<_> = (0..7)
            .map(|i| txt(&format!("r{i}.txt"), "Python engineer, distributed systems"))
            .collect();
        let ranked = rank(&ConstantEmbedder, JD, &resumes, "python").unwrap();
        assert_eq!(ranked.len(), 7);
        let top = ranked.top(5);
        assert_eq!(top.len(), 5);
        assert_eq!(top[0].filename, "r0.txt");
        assert_eq!(ranked.top(50).len(), 7);
    }

    #[test]
    fn test_screen_rejects_short_jd_without_embedding() {
        let request = ScreeningRequest {
            jd_text: "  poison JD  ".to_string(),
            resumes: vec![txt("a.txt", "Rust developer with ten years experience")],
            ..Default::default()
        };
        let screening = screen(&FlakyEmbedder, &request, &ScreeningPolicy::default()).unwrap();
        assert_eq!(screening.status, ScreeningStatus::JobDescriptionTooShort);
        assert_eq!(screening.jd_chars, 9);
        assert!(screening.results.is_empty());
        assert_eq!(
            screening.status.message(&ScreeningPolicy::default()).unwrap(),
            "Job Description must be at least 30 characters long."
        );
    }

    #[test]
    fn test_screen_reports_no_usable_resumes() {
        let request = ScreeningRequest {
            jd_text: JD.to_string(),
            resumes: vec![txt("a.txt", "tiny")],
            ..Default::default()
        };
        let screening = screen(&embedder(), &request, &ScreeningPolicy::default()).unwrap();
        assert_eq!(screening.status, ScreeningStatus::NoUsableResumes);
        assert_eq!(screening.results.excluded, vec!["a.txt"]);
    }

    #[test]
    fn test_screen_prefers_uploaded_jd_document() {
        let request = ScreeningRequest {
            jd_text: "short".to_string(),
            jd_document: Some(txt("jd.txt", JD)),
            resumes: vec![txt("a.txt", "Python engineer who built distributed systems")],
            preferred_skills: "python".to_string(),
        };
        let screening = screen(&embedder(), &request, &ScreeningPolicy::default()).unwrap();
        assert_eq!(screening.status, ScreeningStatus::Ranked);
        assert_eq!(screening.jd_chars, JD.chars().count());
        assert_eq!(screening.top(5)[0].matched_skills, vec!["python"]);
    }

    #[test]
    fn test_screen_unreadable_jd_document_is_too_short() {
        let request = ScreeningRequest {
            jd_text: JD.to_string(),
            jd_document: Some(Document::new("jd.pdf", b"garbage".to_vec())),
            resumes: vec![txt("a.txt", "Python engineer who built distributed systems")],
            ..Default::default()
        };
        let screening = screen(&embedder(), &request, &ScreeningPolicy::default()).unwrap();
        assert_eq!(screening.status, ScreeningStatus::JobDescriptionTooShort);
    }
}
