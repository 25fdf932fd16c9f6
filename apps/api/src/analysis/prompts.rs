// All LLM prompt constants for the Analysis module.

/// System prompt for CV scoring — enforces JSON-array-only output.
pub const CV_SCORE_SYSTEM: &str = "You are an expert HR recruiter evaluating candidate CVs \
    against a job description. \
    You MUST respond with a valid JSON array only. \
    Do NOT include any text outside the JSON array. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// CV scoring prompt template. Replace `{job_description}` and `{cv_batch}`
/// before sending. Each CV in the batch is prefixed with its file name so
/// the model can attribute fields to candidates.
pub const CV_SCORE_PROMPT_TEMPLATE: &str = r#"You will receive:
1. A Job Description (JD)
2. Multiple candidate CVs in the format: "filename : CV text"

Your task:
- Analyze ALL CVs together relative to the JD.
- For each candidate, extract:
  - Name
  - Strength (skills aligning with the JD)
  - Weakness (missing or weak areas)
  - A numeric Score (0-10, 2 decimal precision)
- Return a JSON array of objects strictly matching this schema:

[
  {"Name": "John Doe", "Strength": "...", "Weakness": "...", "Score": 8.75},
  {"Name": "Jane Smith", "Strength": "...", "Weakness": "...", "Score": 6.50}
]

Job Description:
{job_description}

Candidate CVs:
{cv_batch}"#;
