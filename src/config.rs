//! Configuration management for juris
//!
//! Loads, validates, and saves the TOML configuration that wires the
//! ingestion and retrieval pipelines together.

use crate::error::{JurisError, Result, ValidationError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub ingestion: IngestionConfig,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub retrieval: RetrievalConfig,
    pub llm: LlmConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the raw legal corpus (statutes/, case_law/, ...)
    pub data_dir: PathBuf,
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Target tokens per chunk
    pub chunk_target_tokens: usize,
    /// Fraction of a chunk carried over as overlap into the next chunk
    pub chunk_overlap_fraction: f32,
    /// Number of chunks embedded and upserted per batch
    pub embedding_batch_size: usize,
    /// Optional HuggingFace tokenizer file for exact token counts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokenizer_file: Option<PathBuf>,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub vector_dim: usize,
    pub hnsw_ef_construction: usize,
    pub hnsw_m: usize,
    pub hnsw_ef_search: usize,
    /// Upper bound on stored vectors, sized at index creation
    pub capacity: usize,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of fused results returned by hybrid search
    pub n_results: usize,
    /// RRF constant
    pub rrf_k: f64,
    /// Token budget for the assembled context window
    pub context_token_limit: usize,
    /// Maximum chunks pulled in per followed cross-reference
    pub max_chunks_per_ref: usize,
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub enabled: bool,
    pub model: String,
    pub temperature: f32,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(JurisError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| JurisError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| JurisError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: JURIS_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("JURIS_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "STORAGE__DATA_DIR" => {
                self.storage.data_dir = PathBuf::from(value);
            }
            "LLM__ENABLED" => {
                self.llm.enabled = value.parse().map_err(|_| JurisError::Config(format!(
                    "Cannot parse '{}' as boolean for {}",
                    value, path
                )))?;
            }
            "LLM__MODEL" => {
                self.llm.model = value.to_string();
            }
            "EMBEDDING__MODEL" => {
                self.embedding.model = value.to_string();
            }
            "RETRIEVAL__N_RESULTS" => {
                self.retrieval.n_results = value.parse().map_err(|_| {
                    JurisError::Config(format!("Cannot parse '{}' as usize for {}", value, path))
                })?;
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Validate configuration values, collecting every violation
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<ValidationError> = Vec::new();

        if self.ingestion.chunk_target_tokens == 0 {
            errors.push(ValidationError::new(
                "ingestion.chunk_target_tokens",
                "must be greater than zero",
            ));
        }
        if !(0.0..1.0).contains(&self.ingestion.chunk_overlap_fraction) {
            errors.push(ValidationError::new(
                "ingestion.chunk_overlap_fraction",
                "must be in [0.0, 1.0)",
            ));
        }
        if self.ingestion.embedding_batch_size == 0 {
            errors.push(ValidationError::new(
                "ingestion.embedding_batch_size",
                "must be greater than zero",
            ));
        }
        if self.retrieval.n_results == 0 {
            errors.push(ValidationError::new(
                "retrieval.n_results",
                "must be greater than zero",
            ));
        }
        if self.retrieval.rrf_k <= 0.0 {
            errors.push(ValidationError::new("retrieval.rrf_k", "must be positive"));
        }
        if self.index.vector_dim == 0 {
            errors.push(ValidationError::new("index.vector_dim", "must be greater than zero"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(JurisError::ConfigValidation { errors })
        }
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| JurisError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("juris").join("config.toml"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                data_dir: PathBuf::from("./data"),
            },
            ingestion: IngestionConfig {
                chunk_target_tokens: 1000,
                chunk_overlap_fraction: 0.15,
                embedding_batch_size: 100,
                tokenizer_file: None,
            },
            embedding: EmbeddingConfig {
                model: "all-MiniLM-L6-v2".to_string(),
            },
            index: IndexConfig {
                vector_dim: 384,
                hnsw_ef_construction: 200,
                hnsw_m: 16,
                hnsw_ef_search: 50,
                capacity: 100_000,
            },
            retrieval: RetrievalConfig {
                n_results: 20,
                rrf_k: 60.0,
                context_token_limit: 4000,
                max_chunks_per_ref: 2,
            },
            llm: LlmConfig {
                enabled: false,
                model: "gpt-4o-mini".to_string(),
                temperature: 0.3,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_collects_errors() {
        let mut config = Config::default();
        config.ingestion.chunk_target_tokens = 0;
        config.ingestion.chunk_overlap_fraction = 1.5;

        match config.validate() {
            Err(JurisError::ConfigValidation { errors }) => {
                assert_eq!(errors.len(), 2);
            }
            other => panic!("expected validation failure, got {:?}", other.is_ok()),
        }
    }

    #[test]
    fn test_roundtrip() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let config = Config::default();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.retrieval.n_results, config.retrieval.n_results);
        assert_eq!(loaded.llm.model, config.llm.model);
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(JurisError::ConfigNotFound { .. })));
    }
}
