//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "juris",
    version,
    about = "Legal information retrieval and grounded question answering for law enforcement",
    long_about = "Juris ingests a corpus of statutes, case law, and training/policy documents, \
                  indexes it for hybrid semantic + keyword retrieval, and answers natural-language \
                  legal questions with confidence scoring and safety annotations."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/juris/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest a data directory into the document store
    Ingest {
        /// Data directory with statutes/, case_law/, training/, policy/
        /// subfolders (defaults to storage.data_dir from config)
        data_dir: Option<PathBuf>,
    },

    /// Run retrieval only and print ranked results
    Search {
        /// Search query text
        query: String,

        /// Maximum number of results to return
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Ask a question through the full answer pipeline
    Ask {
        /// Question to ask
        question: String,

        /// Show the full response in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Mark a chunk superseded so it never appears in results
    Supersede {
        /// Chunk doc id
        doc_id: String,

        /// Restore the chunk instead of retiring it
        #[arg(long)]
        restore: bool,
    },

    /// Show store health and chunk count
    Status,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the active configuration as JSON
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to validate (defaults to the standard location)
        file: Option<PathBuf>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
