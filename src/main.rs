use juris::cli::{Cli, Commands, ConfigAction};
use juris::config::Config;
use juris::embedding::{EmbeddingProvider, FastEmbedProvider};
use juris::error::{JurisError, Result};
use juris::ingest::tokens::TokenCounter;
use juris::ingest::IngestPipeline;
use juris::pipeline::{AnswerPipeline, HealthStatus};
use juris::store::{EmbeddedStore, VectorStore};
use std::path::PathBuf;
use std::sync::Arc;

fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse_args();

    match cli.command {
        Commands::Ingest { data_dir } => {
            cmd_ingest(cli.config, data_dir)?;
        }
        Commands::Search { query, limit, json } => {
            cmd_search(cli.config, &query, limit, json)?;
        }
        Commands::Ask { question, json } => {
            cmd_ask(cli.config, &question, json)?;
        }
        Commands::Supersede { doc_id, restore } => {
            cmd_supersede(cli.config, &doc_id, restore)?;
        }
        Commands::Status => {
            cmd_status(cli.config)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("juris=info"));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'juris config init' to create one."
        );
        return Ok(Config::default());
    }

    Config::load(&path)
}

fn build_store(config: &Config) -> Arc<EmbeddedStore> {
    Arc::new(EmbeddedStore::new(
        config.index.vector_dim,
        config.index.capacity,
        config.index.hnsw_ef_construction,
        config.index.hnsw_m,
        config.index.hnsw_ef_search,
    ))
}

fn build_embedder(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider = FastEmbedProvider::new(&config.embedding.model)?;
    Ok(Arc::new(provider))
}

fn token_counter(config: &Config) -> Result<TokenCounter> {
    match &config.ingestion.tokenizer_file {
        Some(path) => {
            TokenCounter::from_file(path).map_err(|e| JurisError::Config(e.to_string()))
        }
        None => Ok(TokenCounter::approximate()),
    }
}

/// Ingest and stand up a query pipeline over the same in-process store.
///
/// The embedded store is in-memory, so query commands ingest the
/// configured data directory before searching.
fn build_pipeline(config: Config) -> Result<AnswerPipeline> {
    let store = build_store(&config);
    let embedder = build_embedder(&config)?;

    let ingest = IngestPipeline::new(
        store.clone() as Arc<dyn VectorStore>,
        embedder.clone(),
        token_counter(&config)?,
        config.ingestion.chunk_target_tokens,
        config.ingestion.chunk_overlap_fraction,
        config.ingestion.embedding_batch_size,
    );
    let summary = ingest.run(&config.storage.data_dir)?;
    tracing::info!(
        "Corpus ready: {} documents, {} chunks",
        summary.documents_parsed,
        summary.total_chunks
    );

    AnswerPipeline::new(store, embedder, None, config)
}

fn cmd_ingest(config_path: Option<PathBuf>, data_dir: Option<PathBuf>) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(dir) = data_dir {
        config.storage.data_dir = dir;
    }

    let store = build_store(&config);
    let embedder = build_embedder(&config)?;
    let ingest = IngestPipeline::new(
        store as Arc<dyn VectorStore>,
        embedder,
        token_counter(&config)?,
        config.ingestion.chunk_target_tokens,
        config.ingestion.chunk_overlap_fraction,
        config.ingestion.embedding_batch_size,
    );

    let summary = ingest.run(&config.storage.data_dir)?;

    println!("✓ Ingestion complete");
    println!("  Documents parsed: {}", summary.documents_parsed);
    println!("  Chunks created:   {}", summary.total_chunks);
    println!("  Store total:      {}", summary.store_total);
    println!("  Elapsed:          {:.2}s", summary.elapsed_seconds);

    Ok(())
}

fn cmd_search(config_path: Option<PathBuf>, query: &str, limit: usize, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let pipeline = build_pipeline(config)?;

    let runtime = runtime()?;
    let output = runtime.block_on(pipeline.search(query, limit))?;

    if json {
        let rows: Vec<serde_json::Value> = output
            .results
            .iter()
            .map(|r| {
                serde_json::json!({
                    "id": r.id,
                    "score": r.effective_score(),
                    "rrf_score": r.rrf_score,
                    "title": r.metadata.title,
                    "context_header": r.metadata.context_header,
                    "source_file": r.metadata.source_file,
                })
            })
            .collect();
        let text = serde_json::to_string_pretty(&rows).map_err(|e| JurisError::Json {
            source: e,
            context: "Failed to serialize search results".to_string(),
        })?;
        println!("{}", text);
        return Ok(());
    }

    println!("Results for: {}", query);
    for (i, result) in output.results.iter().enumerate() {
        println!(
            "  {}. [{:.4}] {} ({})",
            i + 1,
            result.effective_score(),
            result.metadata.title,
            result.metadata.context_header
        );
    }
    if output.results.is_empty() {
        println!("  (no results)");
    }

    Ok(())
}

fn cmd_ask(config_path: Option<PathBuf>, question: &str, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let pipeline = build_pipeline(config)?;

    let runtime = runtime()?;
    let response = runtime.block_on(pipeline.answer(question))?;

    if json {
        let text = serde_json::to_string_pretty(&response).map_err(|e| JurisError::Json {
            source: e,
            context: "Failed to serialize response".to_string(),
        })?;
        println!("{}", text);
        return Ok(());
    }

    println!("{}", response.answer);
    if !response.addendum_text.is_empty() {
        println!("\n{}", response.addendum_text);
    }
    println!("\nConfidence: {:.3}", response.confidence_score);
    if !response.sources.is_empty() {
        println!("Sources:");
        for source in &response.sources {
            println!("  - {} ({})", source.title, source.context_header);
        }
    }
    println!("\n{}", response.disclaimer);

    Ok(())
}

fn cmd_supersede(config_path: Option<PathBuf>, doc_id: &str, restore: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let pipeline = build_pipeline(config)?;

    let runtime = runtime()?;
    let updated = runtime.block_on(pipeline.supersede(doc_id, !restore))?;

    if updated {
        if restore {
            println!("✓ Chunk {} restored", doc_id);
        } else {
            println!("✓ Chunk {} marked superseded", doc_id);
        }
    } else {
        println!("Chunk {} not found", doc_id);
    }

    Ok(())
}

fn cmd_status(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;

    println!("Juris Status");
    println!("============");
    println!("Data dir:  {}", config.storage.data_dir.display());
    println!("Model:     {}", config.embedding.model);
    let llm_label = if config.llm.enabled {
        config.llm.model.as_str()
    } else {
        "disabled"
    };
    println!("LLM:       {}", llm_label);

    match build_pipeline(config) {
        Ok(pipeline) => match pipeline.health() {
            HealthStatus::Ok { chunks } => println!("Store:     ok ({} chunks)", chunks),
            HealthStatus::Degraded => println!("Store:     degraded"),
        },
        Err(e) => {
            // Health reporting never throws
            tracing::warn!("Status degraded: {}", e);
            println!("Store:     degraded");
        }
    }

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            let json = serde_json::to_string_pretty(&config).map_err(|e| JurisError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", json);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| JurisError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            let config = Config::default();
            config.save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            Config::load(&path)?;
            println!("✓ Configuration is valid");
        }
    }

    Ok(())
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| JurisError::Io {
        source: e,
        context: "Failed to create tokio runtime".to_string(),
    })
}
