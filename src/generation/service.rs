//! Text-generation service boundary
//!
//! The model call is an opaque prompt-in/text-out contract. Failures
//! propagate to the caller; no retry policy lives here. When no LLM is
//! configured the pipeline falls back to [`ExtractiveGeneration`],
//! which answers directly from the retrieved context.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Generation failed: {0}")]
    Failed(String),

    #[error("Generation service not configured")]
    NotConfigured,
}

/// External text-generation contract: one completion for a user prompt
/// plus optional system prompt, model name, and temperature.
pub trait GenerationService: Send + Sync {
    fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        model: &str,
        temperature: f32,
    ) -> Result<String, GenerationError>;
}

/// Offline fallback: extracts the head of the retrieved context as the
/// answer instead of calling a model. Output is plain text, like any
/// other generation service.
pub struct ExtractiveGeneration {
    max_sentences: usize,
}

impl ExtractiveGeneration {
    pub fn new(max_sentences: usize) -> Self {
        Self { max_sentences }
    }
}

impl Default for ExtractiveGeneration {
    fn default() -> Self {
        Self::new(4)
    }
}

impl GenerationService for ExtractiveGeneration {
    fn generate(
        &self,
        prompt: &str,
        _system_prompt: Option<&str>,
        _model: &str,
        _temperature: f32,
    ) -> Result<String, GenerationError> {
        // The user prompt carries the context between "---" fences (see
        // prompt construction); fall back to the whole prompt if the
        // fences are absent.
        let context = prompt
            .split("---")
            .nth(1)
            .unwrap_or(prompt)
            .trim();

        if context.is_empty() {
            return Ok(
                "Insufficient information available in the provided sources.".to_string(),
            );
        }

        let mut sentences: Vec<&str> = Vec::new();
        for sentence in context.split_inclusive(['.', '!', '?']) {
            let trimmed = sentence.trim();
            if trimmed.is_empty() {
                continue;
            }
            sentences.push(trimmed);
            if sentences.len() >= self.max_sentences {
                break;
            }
        }

        if sentences.is_empty() {
            return Ok(
                "Insufficient information available in the provided sources.".to_string(),
            );
        }

        Ok(format!(
            "According to the retrieved sources: {}",
            sentences.join(" ")
        ))
    }
}
