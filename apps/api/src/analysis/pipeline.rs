//! Aggregator — orchestrates extraction, batching, and scoring, then merges
//! per-batch results into one ranked table persisted as CSV.
//!
//! Per-batch failures degrade to fewer rows; only configuration-class errors
//! (bad folder, unwritable results dir) abort the run. A run over zero
//! documents, or one where every batch fails, still persists a header-only
//! file and returns an empty table.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::analysis::batching::pack;
use crate::analysis::scoring::{CandidateRecord, ScoringClient};
use crate::config::Config;
use crate::errors::AppError;
use crate::extract::extract_all;
use crate::llm_client::CompletionModel;

/// One row of the final ranked table.
#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate {
    pub name: Option<String>,
    pub strengths: Option<String>,
    pub weaknesses: Option<String>,
    pub score: Option<f64>,
    pub rank: usize,
}

/// The full result of one pipeline run. Owned by the caller; nothing is
/// shared across runs.
#[derive(Debug, Serialize)]
pub struct AnalysisResult {
    pub rows: Vec<RankedCandidate>,
    pub output_path: PathBuf,
}

pub struct PipelineParams<'a> {
    pub folder: &'a Path,
    pub job_description: &'a str,
    pub department: &'a str,
    pub output_version: &'a str,
}

/// Runs the full pipeline: extract CVs, pack into token-bounded batches,
/// score each batch sequentially, merge, rank, and persist.
pub async fn run_pipeline(
    config: &Config,
    model: &dyn CompletionModel,
    params: PipelineParams<'_>,
) -> Result<AnalysisResult, AppError> {
    if !params.folder.is_dir() {
        return Err(AppError::Validation(format!(
            "CV folder '{}' does not exist or is not a directory",
            params.folder.display()
        )));
    }

    let documents = extract_all(params.folder).map_err(AppError::Internal)?;

    let labeled: Vec<String> = documents.iter().map(|d| d.labeled()).collect();
    let batches = pack(&labeled, config.batch_token_budget);
    info!(
        "Packed {} documents into {} batches (budget {} tokens)",
        documents.len(),
        batches.len(),
        config.batch_token_budget
    );

    let scorer = ScoringClient::new(model, config.max_retries, config.retry_delay);

    let mut merged: Vec<CandidateRecord> = Vec::new();
    for (i, batch) in batches.iter().enumerate() {
        info!("Analyzing CV batch {}/{}", i + 1, batches.len());
        let records = scorer.score(params.job_description, batch).await;
        if records.is_empty() {
            // Exhausted its retry budget; other batches are unaffected
            warn!("Batch {}/{} contributed no records", i + 1, batches.len());
            continue;
        }
        merged.extend(records);
    }

    let rows = rank_candidates(merged);

    let output_path = persist_results(&config.results_dir, params.department, params.output_version, &rows)?;
    info!(
        "Analysis complete: {} candidates ranked, results saved to {}",
        rows.len(),
        output_path.display()
    );

    Ok(AnalysisResult { rows, output_path })
}

/// Sorts records descending by score and assigns contiguous ranks 1..N.
///
/// The sort is stable, so equal scores keep batch-then-within-batch
/// insertion order; records without a score sort last.
pub fn rank_candidates(mut records: Vec<CandidateRecord>) -> Vec<RankedCandidate> {
    records.sort_by(|a, b| match (a.score, b.score) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    records
        .into_iter()
        .enumerate()
        .map(|(i, r)| RankedCandidate {
            name: r.name,
            strengths: r.strength,
            weaknesses: r.weakness,
            score: r.score,
            rank: i + 1,
        })
        .collect()
}

/// Writes the ranked table as UTF-8 CSV at
/// `<results_dir>/sorted_cv_<department>_<version>.csv`. The header row is
/// always written, even for an empty table.
fn persist_results(
    results_dir: &Path,
    department: &str,
    version: &str,
    rows: &[RankedCandidate],
) -> Result<PathBuf, AppError> {
    fs::create_dir_all(results_dir)?;
    let path = results_dir.join(format!("sorted_cv_{department}_{version}.csv"));

    let mut out = String::from("Name,Strengths,Weaknesses,Score,Rank\n");
    for row in rows {
        let score = row.score.map(|s| s.to_string()).unwrap_or_default();
        out.push_str(&format!(
            "{},{},{},{},{}\n",
            escape_csv(row.name.as_deref().unwrap_or("")),
            escape_csv(row.strengths.as_deref().unwrap_or("")),
            escape_csv(row.weaknesses.as_deref().unwrap_or("")),
            score,
            row.rank
        ));
    }

    fs::write(&path, out)?;
    Ok(path)
}

/// RFC 4180 quoting: fields containing commas, quotes, or newlines are
/// wrapped in double quotes with inner quotes doubled.
fn escape_csv(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use async_trait::async_trait;
    use std::time::Duration;

    fn record(name: &str, score: Option<f64>) -> CandidateRecord {
        CandidateRecord {
            name: Some(name.to_string()),
            strength: Some("strong".to_string()),
            weakness: Some("weak".to_string()),
            score,
        }
    }

    fn test_config(results_dir: PathBuf) -> Config {
        Config {
            groq_api_key: "test-key".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            batch_token_budget: 3000,
            max_retries: 2,
            retry_delay: Duration::from_millis(1),
            results_dir,
            port: 0,
            rust_log: "info".to_string(),
        }
    }

    /// Model that always returns the same canned response.
    struct CannedModel {
        response: Result<String, ()>,
    }

    #[async_trait]
    impl CompletionModel for CannedModel {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
            self.response.clone().map_err(|_| LlmError::EmptyContent)
        }
    }

    #[test]
    fn test_rank_merges_batches_descending_with_stable_ties() {
        // Batch 1: [5], Batch 2: [9, 5] concatenated in batch order
        let merged = vec![
            record("first-five", Some(5.0)),
            record("nine", Some(9.0)),
            record("second-five", Some(5.0)),
        ];

        let ranked = rank_candidates(merged);
        let scores: Vec<_> = ranked.iter().map(|r| r.score.unwrap()).collect();
        assert_eq!(scores, vec![9.0, 5.0, 5.0]);
        let ranks: Vec<_> = ranked.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        // Ties keep insertion order: batch 1's five before batch 2's five
        assert_eq!(ranked[1].name.as_deref(), Some("first-five"));
        assert_eq!(ranked[2].name.as_deref(), Some("second-five"));
    }

    #[test]
    fn test_missing_scores_sort_last() {
        let merged = vec![
            record("unscored", None),
            record("low", Some(1.5)),
            record("high", Some(8.0)),
        ];

        let ranked = rank_candidates(merged);
        assert_eq!(ranked[0].name.as_deref(), Some("high"));
        assert_eq!(ranked[1].name.as_deref(), Some("low"));
        assert_eq!(ranked[2].name.as_deref(), Some("unscored"));
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn test_rank_of_empty_input_is_empty() {
        assert!(rank_candidates(Vec::new()).is_empty());
    }

    #[test]
    fn test_escape_csv_quotes_commas_and_quotes() {
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv("a, b"), "\"a, b\"");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_csv("line\nbreak"), "\"line\nbreak\"");
    }

    #[tokio::test]
    async fn test_end_to_end_three_documents_one_batch() {
        let cv_dir = tempfile::tempdir().unwrap();
        std::fs::write(cv_dir.path().join("a_cv.txt"), "Candidate A, Python and NLP").unwrap();
        std::fs::write(cv_dir.path().join("b_cv.txt"), "Candidate B, PyTorch and AWS").unwrap();
        std::fs::write(cv_dir.path().join("c_cv.txt"), "Candidate C, React only").unwrap();

        let results_dir = tempfile::tempdir().unwrap();
        let config = test_config(results_dir.path().to_path_buf());

        let model = CannedModel {
            response: Ok(r#"[
                {"Name": "A", "Strength": "Python", "Weakness": "none", "Score": 7.5},
                {"Name": "B", "Strength": "PyTorch", "Weakness": "none", "Score": 9.0},
                {"Name": "C", "Strength": "React", "Weakness": "no ML", "Score": 3.25}
            ]"#
            .to_string()),
        };

        let result = run_pipeline(
            &config,
            &model,
            PipelineParams {
                folder: cv_dir.path(),
                job_description: "AI/ML Engineer skilled in Python",
                department: "AI_ML",
                output_version: "v1",
            },
        )
        .await
        .unwrap();

        assert_eq!(result.rows.len(), 3);
        assert_eq!(result.rows[0].rank, 1);
        assert_eq!(result.rows[0].score, Some(9.0));
        assert_eq!(result.rows[2].rank, 3);
        assert_eq!(result.rows[2].score, Some(3.25));

        let expected = results_dir.path().join("sorted_cv_AI_ML_v1.csv");
        assert_eq!(result.output_path, expected);
        let contents = std::fs::read_to_string(&expected).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("Name,Strengths,Weaknesses,Score,Rank"));
        assert_eq!(lines.next(), Some("B,PyTorch,none,9,1"));
        assert_eq!(lines.clone().count(), 2);
    }

    #[tokio::test]
    async fn test_all_batches_failing_persists_header_only() {
        let cv_dir = tempfile::tempdir().unwrap();
        std::fs::write(cv_dir.path().join("a_cv.txt"), "Candidate A").unwrap();

        let results_dir = tempfile::tempdir().unwrap();
        let config = test_config(results_dir.path().to_path_buf());

        let model = CannedModel {
            response: Err(()),
        };

        let result = run_pipeline(
            &config,
            &model,
            PipelineParams {
                folder: cv_dir.path(),
                job_description: "AI/ML Engineer",
                department: "AI_ML",
                output_version: "v2",
            },
        )
        .await
        .unwrap();

        assert!(result.rows.is_empty());
        let contents = std::fs::read_to_string(result.output_path).unwrap();
        assert_eq!(contents, "Name,Strengths,Weaknesses,Score,Rank\n");
    }

    #[tokio::test]
    async fn test_empty_folder_persists_header_only_without_error() {
        let cv_dir = tempfile::tempdir().unwrap();
        let results_dir = tempfile::tempdir().unwrap();
        let config = test_config(results_dir.path().to_path_buf());

        let model = CannedModel {
            response: Ok("[]".to_string()),
        };

        let result = run_pipeline(
            &config,
            &model,
            PipelineParams {
                folder: cv_dir.path(),
                job_description: "AI/ML Engineer",
                department: "Empty",
                output_version: "v1",
            },
        )
        .await
        .unwrap();

        assert!(result.rows.is_empty());
        assert!(result.output_path.exists());
    }

    #[tokio::test]
    async fn test_missing_folder_is_a_validation_error() {
        let results_dir = tempfile::tempdir().unwrap();
        let config = test_config(results_dir.path().to_path_buf());
        let model = CannedModel {
            response: Ok("[]".to_string()),
        };

        let err = run_pipeline(
            &config,
            &model,
            PipelineParams {
                folder: Path::new("/definitely/not/a/folder"),
                job_description: "AI/ML Engineer",
                department: "X",
                output_version: "v1",
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }
}
