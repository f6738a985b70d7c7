//! Page-segmented document model and plain-text loading
//!
//! Rich formats (PDF, DOCX, HTML) are handled by an external parser;
//! this module consumes its output contract: plain text split into
//! pages, joined with a two-character separator when flattened. Plain
//! text files are loaded directly, using form feeds as page breaks.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// File extensions loadable without an external parser
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md"];

/// Separator used when flattening pages into full text. Page offset
/// estimation in chunking depends on its exact length.
pub const PAGE_SEPARATOR: &str = "\n\n";

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Unsupported file type: {path}")]
    UnsupportedFileType { path: PathBuf },

    #[error("Data directory not found: {path}")]
    DataDirNotFound { path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A single page of extracted text
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// 1-indexed page number
    pub page_number: usize,
    pub text: String,
}

/// A fully parsed document with page-level text and source metadata
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub file_path: String,
    pub file_name: String,
    /// First-level folder under the data directory, e.g. "statutes"
    pub subfolder: String,
    pub pages: Vec<ParsedPage>,
    pub full_text: String,
    pub total_pages: usize,
}

impl ParsedDocument {
    /// Build a document from pre-split pages. Pages are flattened with
    /// [`PAGE_SEPARATOR`].
    pub fn from_pages(
        file_path: impl Into<String>,
        file_name: impl Into<String>,
        subfolder: impl Into<String>,
        page_texts: Vec<String>,
    ) -> Self {
        let pages: Vec<ParsedPage> = page_texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| ParsedPage {
                page_number: i + 1,
                text,
            })
            .collect();
        let full_text = pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(PAGE_SEPARATOR);
        let total_pages = pages.len();

        Self {
            file_path: file_path.into(),
            file_name: file_name.into(),
            subfolder: subfolder.into(),
            pages,
            full_text,
            total_pages,
        }
    }

    /// Filename without its extension
    pub fn title(&self) -> &str {
        self.file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&self.file_name)
    }
}

/// Load a plain-text file, splitting pages on form feeds.
pub fn parse_file(path: &Path) -> Result<ParsedDocument, DocumentError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(DocumentError::UnsupportedFileType {
            path: path.to_path_buf(),
        });
    }

    let raw = std::fs::read_to_string(path).map_err(|e| DocumentError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    let page_texts: Vec<String> = if raw.contains('\u{0c}') {
        raw.split('\u{0c}').map(|p| p.to_string()).collect()
    } else {
        vec![raw]
    };

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    Ok(ParsedDocument::from_pages(
        path.to_string_lossy().into_owned(),
        file_name,
        String::new(),
        page_texts,
    ))
}

/// Determine the first-level subfolder of a file relative to the data
/// directory ("" for files at the root).
fn resolve_subfolder(file_path: &Path, data_dir: &Path) -> String {
    match file_path.strip_prefix(data_dir) {
        Ok(relative) => {
            let components: Vec<_> = relative.components().collect();
            if components.len() > 1 {
                components[0].as_os_str().to_string_lossy().into_owned()
            } else {
                String::new()
            }
        }
        Err(_) => String::new(),
    }
}

/// Walk the data directory recursively and parse all supported files.
///
/// One bad file does not abort the batch: unsupported types and read
/// failures are logged and skipped.
pub fn parse_directory(data_dir: &Path) -> Result<Vec<ParsedDocument>, DocumentError> {
    if !data_dir.is_dir() {
        return Err(DocumentError::DataDirNotFound {
            path: data_dir.to_path_buf(),
        });
    }

    let mut files: Vec<PathBuf> = WalkDir::new(data_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();
    files.sort();

    let total = files.len();
    let mut documents: Vec<ParsedDocument> = Vec::new();

    for (i, file_path) in files.iter().enumerate() {
        tracing::info!(
            "Parsing {} ({}/{})",
            file_path.file_name().unwrap_or_default().to_string_lossy(),
            i + 1,
            total
        );
        match parse_file(file_path) {
            Ok(mut doc) => {
                doc.subfolder = resolve_subfolder(file_path, data_dir);
                documents.push(doc);
            }
            Err(e) => {
                tracing::error!("Failed to parse {}: {}", file_path.display(), e);
                continue;
            }
        }
    }

    tracing::info!("Successfully parsed {}/{} files", documents.len(), total);
    Ok(documents)
}
