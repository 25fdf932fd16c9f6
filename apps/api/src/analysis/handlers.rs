//! Axum route handlers for the Analysis API.

use axum::{
    extract::{Path as AxumPath, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::analysis::pipeline::{run_pipeline, PipelineParams, RankedCandidate};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub folder: String,
    /// Job description identifier, echoed into logs for traceability.
    pub jd_id: String,
    pub job_description: String,
    pub department: String,
    pub output_version: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub candidate_count: usize,
    pub output_file: String,
    pub rows: Vec<RankedCandidate>,
}

#[derive(Debug, Serialize)]
pub struct ResultsListResponse {
    pub files: Vec<String>,
}

/// POST /api/v1/analysis
///
/// Runs the full CV sorting pipeline over a folder of candidate documents
/// and returns the ranked table. The same table is persisted as CSV under
/// the configured results directory.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    if request.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description cannot be empty".to_string(),
        ));
    }

    info!(
        "Starting CV analysis: jd_id={}, department={}, version={}",
        request.jd_id, request.department, request.output_version
    );

    let result = run_pipeline(
        &state.config,
        state.llm.as_ref(),
        PipelineParams {
            folder: Path::new(&request.folder),
            job_description: &request.job_description,
            department: &request.department,
            output_version: &request.output_version,
        },
    )
    .await?;

    Ok(Json(AnalyzeResponse {
        candidate_count: result.rows.len(),
        output_file: result.output_path.display().to_string(),
        rows: result.rows,
    }))
}

/// GET /api/v1/analysis/results
///
/// Lists previously persisted result files, newest naming last (sorted).
pub async fn handle_list_results(
    State(state): State<AppState>,
) -> Result<Json<ResultsListResponse>, AppError> {
    let mut files = Vec::new();

    if state.config.results_dir.is_dir() {
        for entry in std::fs::read_dir(&state.config.results_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".csv") {
                files.push(name);
            }
        }
    }

    files.sort();
    Ok(Json(ResultsListResponse { files }))
}

/// GET /api/v1/analysis/results/:name
///
/// Downloads one persisted result file as CSV.
pub async fn handle_get_result(
    State(state): State<AppState>,
    AxumPath(name): AxumPath<String>,
) -> Result<impl IntoResponse, AppError> {
    // Only bare file names are addressable; no traversal out of results_dir
    if name.contains(['/', '\\']) || name.contains("..") || !name.ends_with(".csv") {
        return Err(AppError::Validation(format!(
            "'{name}' is not a valid result file name"
        )));
    }

    let path = state.config.results_dir.join(&name);
    let contents = std::fs::read_to_string(&path)
        .map_err(|_| AppError::NotFound(format!("Result file '{name}' not found")))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{name}\""),
            ),
        ],
        contents,
    ))
}
