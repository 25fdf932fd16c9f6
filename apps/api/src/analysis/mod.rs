//! Analysis — the CV sorting core: token-aware batching, LLM scoring with
//! retry and recovery, and rank-merge aggregation.

pub mod batching;
pub mod handlers;
pub mod pipeline;
pub mod prompts;
pub mod scoring;
