/// Embedding provider trait and FastEmbed implementation
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Model initialization failed: {0}")]
    InitializationError(String),

    #[error("Embedding generation failed: {0}")]
    GenerationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Trait for embedding providers
///
/// Given a list of strings, a provider returns one fixed-dimension
/// float vector per string, order-preserving. Callers surface failures
/// rather than retrying; any retry policy belongs to the provider.
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Generate embeddings for multiple texts (batched for efficiency)
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// FastEmbed provider for local embedding generation
///
/// Uses all-MiniLM-L6-v2 (384 dimensions) by default. Models are
/// downloaded on demand to `~/.cache/huggingface/` on first use.
pub struct FastEmbedProvider {
    model: Arc<TextEmbedding>,
    model_name: String,
    dimension: usize,
}

impl FastEmbedProvider {
    pub fn new(model_name: &str) -> Result<Self, EmbeddingError> {
        let embedding_model = match model_name {
            "all-MiniLM-L6-v2" | "all-minilm-l6-v2" => EmbeddingModel::AllMiniLML6V2,
            "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
            "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
            _ => {
                return Err(EmbeddingError::InitializationError(format!(
                    "Unsupported model: {}. Supported: all-MiniLM-L6-v2, bge-small-en-v1.5, bge-base-en-v1.5",
                    model_name
                )));
            }
        };

        let dimension = match embedding_model {
            EmbeddingModel::BGEBaseENV15 => 768,
            _ => 384,
        };

        tracing::info!(
            "Initializing embedding model: {} ({}D, downloaded if not cached)",
            model_name,
            dimension
        );

        let init_options = InitOptions::new(embedding_model).with_show_download_progress(true);

        let model = TextEmbedding::try_new(init_options)
            .map_err(|e| EmbeddingError::InitializationError(e.to_string()))?;

        Ok(Self {
            model: Arc::new(model),
            model_name: model_name.to_string(),
            dimension,
        })
    }

    /// Create provider with default model (all-MiniLM-L6-v2)
    pub fn with_default_model() -> Result<Self, EmbeddingError> {
        Self::new("all-MiniLM-L6-v2")
    }
}

impl EmbeddingProvider for FastEmbedProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }

        let embeddings = self
            .model
            .embed(vec![text.to_string()], None)
            .map_err(|e| EmbeddingError::GenerationError(e.to_string()))?;

        let embedding = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::GenerationError("No embeddings generated".to_string()))?;

        if embedding.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        Ok(embedding)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let valid_texts: Vec<String> = texts.iter().filter(|t| !t.is_empty()).cloned().collect();

        if valid_texts.is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "All texts are empty".to_string(),
            ));
        }

        let embeddings = self
            .model
            .embed(valid_texts, None)
            .map_err(|e| EmbeddingError::GenerationError(e.to_string()))?;

        for embedding in &embeddings {
            if embedding.len() != self.dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.dimension,
                    actual: embedding.len(),
                });
            }
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Requires model download (~90MB) - run with: cargo test -- --ignored
    fn test_provider_creation() {
        let provider = FastEmbedProvider::with_default_model();
        assert!(provider.is_ok());

        let provider = provider.unwrap();
        assert_eq!(provider.dimension(), 384);
        assert_eq!(provider.model_name(), "all-MiniLM-L6-v2");
    }

    #[test]
    #[ignore] // Requires model download (~90MB) - run with: cargo test -- --ignored
    fn test_embed_legal_text() {
        let provider = FastEmbedProvider::with_default_model().unwrap();

        let embedding = provider
            .embed("Whoever intentionally causes bodily harm commits battery.")
            .unwrap();
        assert_eq!(embedding.len(), 384);

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 0.1);
    }

    #[test]
    #[ignore] // Requires model download (~90MB) - run with: cargo test -- --ignored
    fn test_batch_preserves_order() {
        let provider = FastEmbedProvider::with_default_model().unwrap();
        let texts = vec![
            "battery statute".to_string(),
            "traffic stop requirements".to_string(),
        ];

        let batch = provider.embed_batch(&texts).unwrap();
        assert_eq!(batch.len(), 2);

        let single = provider.embed(&texts[0]).unwrap();
        let dot: f32 = batch[0].iter().zip(single.iter()).map(|(a, b)| a * b).sum();
        assert!(dot > 0.99);
    }

    #[test]
    fn test_unsupported_model_name() {
        let result = FastEmbedProvider::new("not-a-model");
        assert!(matches!(
            result,
            Err(EmbeddingError::InitializationError(_))
        ));
    }
}
