//! Axum route handlers for the Screening API.

use std::sync::Arc;

use axum::{
    extract::{multipart::Field, Multipart, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info_span};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::document::{Document, DocumentFormat};
use crate::screening::ranker::{screen, CandidateResult, ScreeningRequest, ScreeningStatus};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub analysis_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub jd_chars: usize,
    pub preferred_skills: String,
    pub total_candidates: usize,
    pub excluded: Vec<String>,
    pub results: Vec<CandidateResult>,
    /// The first `TOP_N` of `results`.
    pub top: Vec<CandidateResult>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/analyze
///
/// Multipart form: `jd_text` and/or `jd_file`, `preferred_skills`, and one or
/// more `resumes` files. Returns every usable resume ranked by ATS score.
pub async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let request = read_form(multipart).await?;
    let policy = state.policy;

    if request.jd_document.is_none() && request.jd_text.trim().chars().count() < policy.min_jd_chars
    {
        return Err(reject(ScreeningStatus::JobDescriptionTooShort, &state));
    }

    let mut uploads = request.jd_document.iter().chain(request.resumes.iter());
    if let Some(bad) = uploads.find(|d| !d.format().is_supported()) {
        return Err(AppError::Validation(format!(
            "Unsupported file type: {}. Upload only PDF, DOCX, or TXT.",
            bad.filename
        )));
    }
    if request.resumes.is_empty() {
        return Err(AppError::Validation(
            "At least one resume file is required.".to_string(),
        ));
    }

    let analysis_id = Uuid::new_v4();
    let preferred_skills = request.preferred_skills.clone();
    let embedder = Arc::clone(&state.embedder);
    let span = info_span!("analysis", %analysis_id);

    // Extraction and inference are CPU-bound.
    let screening = tokio::task::spawn_blocking(move || {
        let _guard = span.enter();
        screen(embedder.as_ref(), &request, &policy)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("screening task failed: {e}")))??;

    if screening.status != ScreeningStatus::Ranked {
        return Err(reject(screening.status, &state));
    }

    let top = screening.top(policy.top_n).to_vec();
    let results = screening.results;

    Ok(Json(AnalyzeResponse {
        analysis_id,
        generated_at: Utc::now(),
        jd_chars: screening.jd_chars,
        preferred_skills,
        total_candidates: results.len(),
        excluded: results.excluded,
        results: results.candidates,
        top,
    }))
}

fn reject(status: ScreeningStatus, state: &AppState) -> AppError {
    AppError::Validation(
        status
            .message(&state.policy)
            .unwrap_or_else(|| "Invalid screening request".to_string()),
    )
}

async fn read_form(mut multipart: Multipart) -> Result<ScreeningRequest, AppError> {
    let mut request = ScreeningRequest::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "jd_text" => request.jd_text = field.text().await.map_err(bad_form)?,
            "preferred_skills" => request.preferred_skills = field.text().await.map_err(bad_form)?,
            "jd_file" => request.jd_document = read_file(field).await?,
            "resumes" => {
                if let Some(doc) = read_file(field).await? {
                    request.resumes.push(doc);
                }
            }
            other => debug!(field = other, "Ignoring unknown form field"),
        }
    }

    Ok(request)
}

/// Browsers send an empty part with no filename when no file was chosen.
async fn read_file(field: Field<'_>) -> Result<Option<Document>, AppError> {
    let filename = field.file_name().unwrap_or_default().to_string();
    let bytes = field.bytes().await.map_err(bad_form)?;
    if filename.is_empty() {
        return Ok(None);
    }
    debug!(
        filename = %filename,
        format = ?DocumentFormat::from_filename(&filename),
        size = bytes.len(),
        "Received upload"
    );
    Ok(Some(Document::new(filename, bytes)))
}

fn bad_form(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("Malformed multipart form: {}", e.body_text()))
}
