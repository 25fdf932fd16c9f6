//! Token-aware batch packing. CV texts are grouped greedily, in input order,
//! into batches whose estimated token count stays under the configured
//! budget, so each scoring call fits the model's context window.

/// English text averages ~4 chars/token for subword tokenizers.
const CHARS_PER_TOKEN: usize = 4;

/// Estimates the model token count for a text. Conservative (rounds up) so
/// packed batches stay under the real limit.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(CHARS_PER_TOKEN)
}

/// Packs `texts` into batches bounded by `max_tokens`, preserving input
/// order within and across batches. Documents in a batch are joined with a
/// blank line.
///
/// Appending a text that would push the running sum over the budget closes
/// the current batch (if non-empty) and starts a new one with that text — a
/// single text over budget forms its own batch rather than being split.
pub fn pack(texts: &[String], max_tokens: usize) -> Vec<String> {
    let mut batches: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_tokens = 0usize;

    for text in texts {
        let tokens = estimate_tokens(text);

        if !current.is_empty() && current_tokens + tokens > max_tokens {
            batches.push(std::mem::take(&mut current));
            current_tokens = 0;
        }

        current.push(text);
        current_tokens += tokens;
    }

    if !current.is_empty() {
        batches.push(current);
    }

    batches.into_iter().map(|batch| batch.join("\n\n")).collect()
}
