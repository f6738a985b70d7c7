//! Metadata extraction for legal document chunks
//!
//! Builds the persisted metadata record per chunk from file path info,
//! folder structure, and regex extraction of statute numbers, case
//! citations, and chapter references. Multi-valued fields stay as
//! vectors internally; the comma-joined form exists only at the store
//! boundary.

use crate::ingest::chunking::Chunk;
use crate::ingest::document::ParsedDocument;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Matches: § 940.01, 346.63(1)(a), § 940.01(2)
pub static STATUTE_NUMBER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\u{a7}\s*)?(\d{2,4}\.\d{2,4}(?:\(\d+\)(?:\([a-z]\))?)?)")
        .expect("statute number pattern")
});

/// Matches: 2023 WI App 45, 2023 WI 12, 2023AP001234
pub static CASE_CITATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4}\s*(?:WI\s*(?:App\s*)?\d+|AP\s*\d+))").expect("case citation pattern")
});

/// Matches: Chapter 943, Chapter 346A
pub static CHAPTER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Chapter\s+(\d+[A-Z]?)").expect("chapter pattern"));

/// Municipality keywords marking a local-department source.
const LOCAL_JURISDICTION_KEYWORDS: &[&str] = &[
    "madison",
    "milwaukee",
    "dane county",
    "milwaukee county",
    "city of madison",
    "city of milwaukee",
];

/// Canonical source families, matching the corpus folder layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Statute,
    CaseLaw,
    Training,
    Policy,
    Unknown,
}

impl SourceType {
    pub fn from_subfolder(subfolder: &str) -> Self {
        match subfolder.to_lowercase().as_str() {
            "statute" | "statutes" => Self::Statute,
            "case_law" => Self::CaseLaw,
            "training" => Self::Training,
            "policy" => Self::Policy,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Statute => "statute",
            Self::CaseLaw => "case_law",
            Self::Training => "training",
            Self::Policy => "policy",
            Self::Unknown => "unknown",
        }
    }
}

/// State-level vs local-department provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Jurisdiction {
    State,
    LocalDepartment,
}

impl Jurisdiction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::State => "state",
            Self::LocalDepartment => "local_department",
        }
    }
}

/// The persisted record for one chunk. Immutable after ingestion except
/// `superseded`, which may be flipped out-of-band to retire obsolete
/// law without re-embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub doc_id: String,
    pub source_type: SourceType,
    pub jurisdiction: Jurisdiction,
    pub superseded: bool,
    pub title: String,
    pub source_file: String,
    pub chunk_index: usize,
    pub start_page: usize,
    pub end_page: usize,
    pub context_header: String,
    pub statute_numbers: Vec<String>,
    pub case_citations: Vec<String>,
    pub chapter_numbers: Vec<String>,
    pub token_count: usize,
}

impl ChunkMetadata {
    /// Comma-joined serialization of a multi-valued field, as stored in
    /// the flat metadata map.
    pub fn statute_numbers_text(&self) -> String {
        self.statute_numbers.join(",")
    }

    pub fn case_citations_text(&self) -> String {
        self.case_citations.join(",")
    }

    pub fn chapter_numbers_text(&self) -> String {
        self.chapter_numbers.join(",")
    }
}

/// Generate a deterministic unique ID for a chunk.
///
/// Hashes `source_file::chunk_index::first-200-chars` with blake3 and
/// truncates to 32 hex characters, so re-running ingestion with
/// unchanged content reproduces the same IDs and store upserts are
/// idempotent.
pub fn generate_doc_id(chunk_text: &str, source_file: &str, chunk_index: usize) -> String {
    let prefix: String = chunk_text.chars().take(200).collect();
    let content = format!("{}::{}::{}", source_file, chunk_index, prefix);
    let hash = blake3::hash(content.as_bytes());
    hash.to_hex().as_str()[..32].to_string()
}

/// Determine jurisdiction from filename and leading chunk text.
pub fn infer_jurisdiction(text: &str, file_name: &str) -> Jurisdiction {
    let head: String = text.chars().take(2000).collect();
    let search_text = format!("{} {}", file_name, head).to_lowercase();
    for keyword in LOCAL_JURISDICTION_KEYWORDS {
        if search_text.contains(keyword) {
            return Jurisdiction::LocalDepartment;
        }
    }
    Jurisdiction::State
}

fn extract_deduped(pattern: &Regex, text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for caps in pattern.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            let value = m.as_str().to_string();
            if !found.contains(&value) {
                found.push(value);
            }
        }
    }
    found
}

/// Extract statute number references, deduplicated in first-seen order.
pub fn extract_statute_numbers(text: &str) -> Vec<String> {
    extract_deduped(&STATUTE_NUMBER_PATTERN, text)
}

/// Extract case citation references, deduplicated in first-seen order.
pub fn extract_case_citations(text: &str) -> Vec<String> {
    extract_deduped(&CASE_CITATION_PATTERN, text)
}

/// Extract chapter number references, deduplicated in first-seen order.
pub fn extract_chapter_numbers(text: &str) -> Vec<String> {
    extract_deduped(&CHAPTER_PATTERN, text)
}

/// Build the complete metadata record for a chunk.
pub fn extract_metadata(chunk: &Chunk, doc: &ParsedDocument) -> ChunkMetadata {
    let combined_text = format!("{}\n{}", chunk.context_header, chunk.text);

    ChunkMetadata {
        doc_id: generate_doc_id(&chunk.text, &doc.file_path, chunk.chunk_index),
        source_type: SourceType::from_subfolder(&doc.subfolder),
        jurisdiction: infer_jurisdiction(&chunk.text, &doc.file_name),
        superseded: false,
        title: doc.title().to_string(),
        source_file: doc.file_path.clone(),
        chunk_index: chunk.chunk_index,
        start_page: chunk.start_page,
        end_page: chunk.end_page,
        context_header: chunk.context_header.clone(),
        statute_numbers: extract_statute_numbers(&combined_text),
        case_citations: extract_case_citations(&combined_text),
        chapter_numbers: extract_chapter_numbers(&combined_text),
        token_count: chunk.token_count,
    }
}
