//! Token counting for chunk sizing and context budgeting
//!
//! Uses a HuggingFace tokenizer when one is configured; otherwise falls
//! back to a character-based estimate (4 characters per token), which
//! is also the ratio assumed for non-tokenizable text.

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokenizers::Tokenizer;

/// Assumed characters per token when no tokenizer is available.
pub const FALLBACK_CHARS_PER_TOKEN: f32 = 4.0;

#[derive(Error, Debug)]
pub enum TokenizerError {
    #[error("Failed to load tokenizer from {path}: {message}")]
    Load { path: String, message: String },
}

/// Counts tokens either exactly (HuggingFace tokenizer) or by estimate.
#[derive(Clone)]
pub enum TokenCounter {
    HuggingFace(Arc<Tokenizer>),
    Approximate,
}

impl TokenCounter {
    /// Load a tokenizer from a `tokenizer.json` file.
    pub fn from_file(path: &Path) -> Result<Self, TokenizerError> {
        let tokenizer = Tokenizer::from_file(path).map_err(|e| TokenizerError::Load {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::HuggingFace(Arc::new(tokenizer)))
    }

    /// Character-estimate counter; needs no model files.
    pub fn approximate() -> Self {
        Self::Approximate
    }

    /// Number of tokens in `text`. Non-empty text always counts ≥ 1.
    pub fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        match self {
            Self::HuggingFace(tokenizer) => match tokenizer.encode(text, false) {
                Ok(encoding) => encoding.get_ids().len().max(1),
                Err(_) => estimate_tokens(text),
            },
            Self::Approximate => estimate_tokens(text),
        }
    }

    /// Average characters per token measured on a sample of `text`
    /// (first 500 characters). Returns the fallback ratio when the
    /// sample tokenizes to nothing.
    pub fn chars_per_token(&self, text: &str) -> f32 {
        let sample: String = text.chars().take(500).collect();
        let tokens = self.count(&sample);
        if tokens == 0 {
            return FALLBACK_CHARS_PER_TOKEN;
        }
        sample.chars().count() as f32 / tokens as f32
    }
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HuggingFace(_) => write!(f, "TokenCounter::HuggingFace"),
            Self::Approximate => write!(f, "TokenCounter::Approximate"),
        }
    }
}

fn estimate_tokens(text: &str) -> usize {
    let chars = text.chars().count();
    ((chars as f32 / FALLBACK_CHARS_PER_TOKEN).ceil() as usize).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_zero() {
        let counter = TokenCounter::approximate();
        assert_eq!(counter.count(""), 0);
    }

    #[test]
    fn test_nonempty_is_positive() {
        let counter = TokenCounter::approximate();
        assert!(counter.count("a") >= 1);
        assert!(counter.count("the statute prohibits theft") >= 1);
    }

    #[test]
    fn test_estimate_scales_with_length() {
        let counter = TokenCounter::approximate();
        let short = counter.count("word");
        let long = counter.count(&"word ".repeat(100));
        assert!(long > short);
    }

    #[test]
    fn test_chars_per_token_fallback() {
        let counter = TokenCounter::approximate();
        let ratio = counter.chars_per_token("sample statutory language here");
        assert!((ratio - FALLBACK_CHARS_PER_TOKEN).abs() < 0.5);
    }

    #[test]
    fn test_missing_tokenizer_file() {
        let result = TokenCounter::from_file(Path::new("/nonexistent/tokenizer.json"));
        assert!(result.is_err());
    }
}
