//! Grounded answer generation
//!
//! Prompt construction, the external text-generation boundary,
//! retrieval-signal confidence scoring, and safety annotations.

mod formatter;
mod prompt;
mod safety;
mod service;

pub use formatter::{
    compute_confidence, format_response, AnswerResponse, ResponseFlags, SourceInfo, DISCLAIMER,
};
pub use prompt::{build_prompt, system_prompt};
pub use safety::{build_safety_addendum, SafetyAssessment};
pub use service::{ExtractiveGeneration, GenerationError, GenerationService};
