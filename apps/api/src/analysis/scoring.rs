//! Scoring Client — sends one CV batch plus the job description to the model
//! and parses its structured verdict.
//!
//! The model's JSON compliance is not guaranteed, so parsing is a
//! parse-and-recover step: direct parse first, then a bracket-depth scan for
//! the first balanced top-level array embedded in surrounding prose. Any
//! call or parse failure is retried up to the configured budget; an
//! exhausted budget yields an empty record set, never an error, so one bad
//! batch cannot abort the run.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::analysis::prompts::{CV_SCORE_PROMPT_TEMPLATE, CV_SCORE_SYSTEM};
use crate::llm_client::CompletionModel;

/// One candidate's evaluation as returned by the model. Field keys are
/// capitalised on the wire to match the prompt schema. Missing or malformed
/// fields deserialize to `None` rather than failing the whole batch.
///
/// `Score` is passed through as produced by the model — no clamping or
/// range validation. Rank is assigned later, after global aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Strength", default)]
    pub strength: Option<String>,
    #[serde(rename = "Weakness", default)]
    pub weakness: Option<String>,
    #[serde(rename = "Score", default)]
    pub score: Option<f64>,
}

/// Wraps a `CompletionModel` with the fixed recruiter prompt and the
/// per-batch retry policy. Stateless between calls.
pub struct ScoringClient<'a> {
    model: &'a dyn CompletionModel,
    /// Total attempts per batch (first call + retries).
    max_retries: u32,
    retry_delay: Duration,
}

impl<'a> ScoringClient<'a> {
    pub fn new(model: &'a dyn CompletionModel, max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            model,
            max_retries,
            retry_delay,
        }
    }

    /// Scores one batch of CVs against the job description.
    ///
    /// Returns the parsed records on the first attempt that yields a valid
    /// JSON array; returns an empty vec after `max_retries` failed attempts.
    pub async fn score(&self, job_description: &str, cv_batch: &str) -> Vec<CandidateRecord> {
        let prompt = CV_SCORE_PROMPT_TEMPLATE
            .replace("{job_description}", job_description)
            .replace("{cv_batch}", cv_batch);

        for attempt in 1..=self.max_retries {
            if attempt > 1 {
                tokio::time::sleep(self.retry_delay).await;
            }

            match self.model.complete(CV_SCORE_SYSTEM, &prompt).await {
                Ok(raw) => match parse_candidate_records(&raw) {
                    Some(records) => {
                        debug!("Batch scored: {} candidate records", records.len());
                        return records;
                    }
                    None => warn!("Scoring attempt {attempt} returned no parseable JSON array"),
                },
                Err(e) => warn!("Scoring attempt {attempt} failed: {e}"),
            }
        }

        warn!(
            "Batch scoring exhausted {} attempts; batch contributes no records",
            self.max_retries
        );
        Vec::new()
    }
}

/// Extracts a candidate-record array from raw model output.
///
/// Policy: strip code fences, try a direct parse of the whole text, then
/// fall back to the first balanced top-level JSON array found by bracket
/// scanning. Returns `None` when neither succeeds.
pub fn parse_candidate_records(raw: &str) -> Option<Vec<CandidateRecord>> {
    let text = strip_json_fences(raw);

    if let Ok(records) = serde_json::from_str::<Vec<CandidateRecord>>(text) {
        return Some(records);
    }

    let embedded = find_json_array(text)?;
    serde_json::from_str::<Vec<CandidateRecord>>(embedded).ok()
}

/// Locates the first balanced top-level JSON array in `text`.
///
/// A bracket-depth scan that tracks string literals and escapes, so brackets
/// inside quoted values do not confuse the match.
fn find_json_array(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(|&b| b == b'[')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
