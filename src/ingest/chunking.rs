//! Document-type-aware hierarchical chunking for legal documents
//!
//! Three structural grammars cover the corpus:
//!   - Statutes:        Chapter > Section (§) > Subsection > Paragraph
//!   - Case law:        Opinion type > Roman-numeral section > Lettered sub > ¶ paragraph
//!   - Training/policy: ALL-CAPS header > Section/decimal subsection > numbered/lettered items
//!
//! Text is split into token-bounded chunks that respect structural
//! boundaries, each annotated with a breadcrumb of its enclosing
//! hierarchy (e.g. "Chapter 943 > § 943.01 > (2) > (a)").

use crate::ingest::document::ParsedDocument;
use crate::ingest::tokens::TokenCounter;
use regex::Regex;
use std::sync::LazyLock;

/// A detected structural element in a legal document.
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyNode {
    /// 0 = chapter/top-level, increasing = more nested
    pub level: usize,
    /// Normalized marker text, e.g. "Chapter 943", "§ 940.01", "(2)"
    pub title: String,
    /// Byte offset where the marker starts (inclusive)
    pub start_pos: usize,
    /// Byte offset where the marker's scope ends (exclusive)
    pub end_pos: usize,
}

/// A single chunk of text ready for embedding.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub text: String,
    /// Breadcrumb of enclosing hierarchy titles joined by " > "
    pub context_header: String,
    /// 0-based, sequential within a document
    pub chunk_index: usize,
    /// 1-indexed, estimated from character offsets
    pub start_page: usize,
    pub end_page: usize,
    pub token_count: usize,
    pub source_file: String,
    /// True for all but the first chunk of a split run
    pub overlap_with_previous: bool,
}

/// Per-document-type grammar: ordered hierarchy rules, the levels that
/// count as section boundaries, and the structural split pattern.
struct Grammar {
    rules: Vec<(usize, Regex)>,
    primary_levels: &'static [usize],
    split_boundary: Regex,
}

fn rule(level: usize, pattern: &str) -> (usize, Regex) {
    (level, Regex::new(pattern).expect("hierarchy pattern"))
}

static STATUTE_GRAMMAR: LazyLock<Grammar> = LazyLock::new(|| Grammar {
    rules: vec![
        // Chapter: "Chapter 943", "Chapter 346A"
        rule(0, r"(?m)^(Chapter\s+\d+[A-Z]?)\b"),
        // Subchapter: "SUBCHAPTER I", "SUBCHAPTER IV"
        rule(0, r"(?m)^(SUBCHAPTER\s+[IVXLC]+)\b"),
        // Section symbol: "§ 940.01"
        rule(1, r"(?m)^(\u{a7}\s*\d+\.\d+(?:\(\d+\))?)\b"),
        // Bare section number with title: "346.01 Words and phrases"
        rule(1, r"(?m)^(\d{2,4}\.\d{2,4})\s+[A-Z]"),
        // "Section X." or "SECTION X."
        rule(1, r"(?mi)^(Section\s+\d+[A-Za-z]?\.?)\s"),
        // Numbered subsections: "(1)", "(2)"
        rule(2, r"(?m)^\((\d+)\)\s"),
        // "Sub. (1)"
        rule(2, r"(?m)^(Sub\.\s*\(\d+\))\s"),
        // Letter paragraphs: "(a)", "(b)"
        rule(3, r"(?m)^\(([a-z])\)\s"),
    ],
    primary_levels: &[0, 1],
    split_boundary: Regex::new(r"\n(?:Chapter\s+\d|\u{a7}\s*\d|\d{2,4}\.\d{2,4}\s)")
        .expect("statute boundary"),
});

static CASE_LAW_GRAMMAR: LazyLock<Grammar> = LazyLock::new(|| Grammar {
    rules: vec![
        // Opinion type header (repeats on every page of each opinion)
        rule(
            0,
            r"(?m)^((?:Opinion of the Court|(?:JUSTICE|Justice|CHIEF JUSTICE)\s+[A-Z][A-Za-z]+(?:,?\s+(?:concurring in part and dissenting in part|concurring|dissenting))[^.\n]*))",
        ),
        // Roman numeral sections: "I. FACTUAL AND PROCEDURAL BACKGROUND"
        rule(1, r"(?m)^([IVXLC]+\.\s+[A-Z][A-Z\s:]+)"),
        // Lettered subsections: "A. PRIVATE PARTY SEARCH"
        rule(2, r"(?m)^([A-Z]\.\s+[A-Z][A-Z\s:]+)"),
        // Pilcrow paragraph markers: "¶1", "¶133"
        rule(3, r"(?m)^(\u{b6}\s*\d+)\b"),
    ],
    primary_levels: &[0, 1],
    split_boundary: Regex::new(r"\n(?:\u{b6}\s*\d+)").expect("case law boundary"),
});

static TRAINING_GRAMMAR: LazyLock<Grammar> = LazyLock::new(|| Grammar {
    rules: vec![
        // ALL-CAPS major section headers (9+ chars)
        rule(0, r"(?m)^([A-Z][A-Z\s&/\-]{8,})\s*$"),
        // "POLICY & PROCEDURE" marker
        rule(0, r"(?mi)^(POLICY\s*&\s*PROCEDURE)\s*$"),
        // "Section X:" numbered sections (handbook style)
        rule(1, r"(?mi)^(Section\s+\d+[A-Za-z]?[:.])(?:\s|$)"),
        // Decimal subsection headers: "1.1 Welcome"
        rule(1, r"(?m)^(\d+\.\d+)\s+[A-Z]"),
        // Numbered items: "1." (but not decimals like "1.1")
        rule(2, r"(?m)^(\d+)\.\s+\D"),
        // Lettered items: "a.", "b."
        rule(2, r"(?m)^([a-z])\.\s"),
    ],
    primary_levels: &[0, 1],
    split_boundary: Regex::new(r"\n(?:Section\s+\d|[A-Z][A-Z\s]{8,}$|\d+\.\d+\s)")
        .expect("training boundary"),
});

/// Closed set of document families the chunker understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Statute,
    CaseLaw,
    Training,
}

static CASE_DOCKET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"No\.\s*\d{4}AP\d+").expect("docket pattern"));
static CASE_PARTIES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Plaintiff|Defendant|Appellant|Respondent").expect("parties pattern")
});
static TRAINING_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[A-Z][A-Z\s&/\-]{10,}$").expect("header pattern"));
static TRAINING_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Section\s+\d+:").expect("section pattern"));

impl DocumentKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Statute => "statute",
            Self::CaseLaw => "case_law",
            Self::Training => "training",
        }
    }

    fn grammar(&self) -> &'static Grammar {
        match self {
            Self::Statute => &STATUTE_GRAMMAR,
            Self::CaseLaw => &CASE_LAW_GRAMMAR,
            Self::Training => &TRAINING_GRAMMAR,
        }
    }

    /// Folder-name classification (handles naming variants).
    pub fn from_subfolder(subfolder: &str) -> Option<Self> {
        match subfolder.to_lowercase().as_str() {
            "statute" | "statutes" => Some(Self::Statute),
            "case_law" => Some(Self::CaseLaw),
            "training" | "policy" => Some(Self::Training),
            _ => None,
        }
    }

    /// Heuristic fallback: detect document type from content when the
    /// subfolder is unknown.
    pub fn detect(text: &str) -> Self {
        let sample: &str = &text[..floor_char_boundary(text, 3000.min(text.len()))];

        if sample.matches('\u{b6}').count() >= 3
            || CASE_DOCKET.is_match(sample)
            || sample.contains("Opinion of the Court")
            || CASE_PARTIES.is_match(sample)
        {
            return Self::CaseLaw;
        }

        if TRAINING_HEADER.is_match(sample)
            || TRAINING_SECTION.is_match(sample)
            || sample.to_uppercase().contains("POLICY & PROCEDURE")
            || sample.to_lowercase().contains("handbook")
        {
            return Self::Training;
        }

        Self::Statute
    }

    /// Resolve from subfolder, falling back to content sniffing.
    pub fn resolve(subfolder: &str, text: &str) -> Self {
        match Self::from_subfolder(subfolder) {
            Some(kind) => kind,
            None => {
                tracing::info!(
                    "Unknown subfolder '{}'; detecting document type from content",
                    subfolder
                );
                Self::detect(text)
            }
        }
    }
}

/// Scan text for hierarchy markers and return nodes sorted by position.
///
/// Markers within 3 bytes of each other are deduplicated keeping the
/// lower (more significant) level. Each node's `end_pos` is the start
/// of the next node at the same or a shallower level, or end of text.
pub fn detect_hierarchy(text: &str, kind: DocumentKind) -> Vec<HierarchyNode> {
    let grammar = kind.grammar();
    let mut raw: Vec<HierarchyNode> = Vec::new();

    for (level, pattern) in &grammar.rules {
        for caps in pattern.captures_iter(text) {
            let whole = caps.get(0).expect("match");
            let mut title = caps
                .get(1)
                .map(|m| m.as_str())
                .unwrap_or_else(|| whole.as_str())
                .trim()
                .to_string();

            // Bare digit/letter captures wrap in parens for readability
            if *level == 2 && title.chars().all(|c| c.is_ascii_digit()) {
                title = format!("({})", title);
            } else if *level == 3 && title.len() == 1 && title.chars().all(|c| c.is_alphabetic()) {
                title = format!("({})", title);
            }

            raw.push(HierarchyNode {
                level: *level,
                title,
                start_pos: whole.start(),
                end_pos: text.len(),
            });
        }
    }

    raw.sort_by_key(|n| n.start_pos);

    // Deduplicate overlapping matches at (nearly) the same position
    let mut deduped: Vec<HierarchyNode> = Vec::new();
    for node in raw {
        if let Some(last) = deduped.last_mut() {
            if node.start_pos.abs_diff(last.start_pos) < 3 {
                if node.level < last.level {
                    *last = node;
                }
                continue;
            }
        }
        deduped.push(node);
    }

    // Each node ends where the next same-or-shallower node begins
    for i in 0..deduped.len() {
        let mut end = text.len();
        for j in (i + 1)..deduped.len() {
            if deduped[j].level <= deduped[i].level {
                end = deduped[j].start_pos;
                break;
            }
        }
        deduped[i].end_pos = end;
    }

    deduped
}

/// Hierarchy path (root -> leaf) enclosing a text position: nodes whose
/// range contains the position, with strictly increasing levels.
fn build_context_path(all_nodes: &[HierarchyNode], target_pos: usize) -> Vec<&HierarchyNode> {
    let mut path: Vec<&HierarchyNode> = Vec::new();
    for node in all_nodes {
        if node.start_pos <= target_pos && target_pos < node.end_pos {
            if path.last().map_or(true, |last| node.level > last.level) {
                path.push(node);
            }
        }
    }
    path
}

/// Breadcrumb string from a hierarchy path, e.g.
/// "Chapter 943 > § 943.01 > (2) > (a)".
pub fn build_context_header(path: &[&HierarchyNode]) -> String {
    path.iter()
        .map(|n| n.title.as_str())
        .collect::<Vec<_>>()
        .join(" > ")
}

// ---------------------------------------------------------------------------
// Text splitting
// ---------------------------------------------------------------------------

static PARAGRAPH_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\n+").expect("paragraph pattern"));
// Sentence end followed by a capital, paren, or section symbol. The
// split point is the start of the trailing capture.
static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+([A-Z(\u{a7}])").expect("sentence pattern"));

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Find the best split point at or before `max_chars`.
///
/// Priority: structural boundary > paragraph break > sentence end >
/// last space. Each candidate is accepted only past 30% of the window
/// to avoid degenerate micro-splits.
fn find_split_point(text: &str, max_chars: usize, boundary: &Regex) -> usize {
    if text.len() <= max_chars {
        return text.len();
    }

    let limit = floor_char_boundary(text, max_chars);
    let region = &text[..limit];
    let min_pos = (max_chars as f32 * 0.3) as usize;

    // 1. Structural boundary
    if let Some(best) = boundary.find_iter(region).last().map(|m| m.start()) {
        if best > min_pos {
            return best;
        }
    }

    // 2. Paragraph boundary
    if let Some(best) = PARAGRAPH_BOUNDARY.find_iter(region).last().map(|m| m.start()) {
        if best > min_pos {
            return best;
        }
    }

    // 3. Sentence boundary
    if let Some(best) = SENTENCE_BOUNDARY
        .captures_iter(region)
        .last()
        .and_then(|caps| caps.get(1).map(|m| m.start()))
    {
        if best > min_pos {
            return best;
        }
    }

    // 4. Last space
    if let Some(last_space) = region.rfind(' ') {
        if last_space > 0 {
            return last_space;
        }
    }

    limit
}

// ---------------------------------------------------------------------------
// Page estimation
// ---------------------------------------------------------------------------

/// Cumulative character offsets matching the parser's page join.
fn build_page_offsets(doc: &ParsedDocument) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(doc.pages.len());
    let mut cumulative = 0usize;
    for page in &doc.pages {
        cumulative += page.text.len();
        offsets.push(cumulative);
        cumulative += 2; // page separator
    }
    offsets
}

/// Map a character offset to a 1-indexed page number.
fn estimate_page(char_offset: usize, page_offsets: &[usize]) -> usize {
    if page_offsets.is_empty() {
        return 1;
    }
    let idx = page_offsets.partition_point(|&o| o <= char_offset);
    (idx + 1).min(page_offsets.len())
}

// ---------------------------------------------------------------------------
// Core splitting
// ---------------------------------------------------------------------------

struct SectionSplit<'a> {
    text: &'a str,
    context_header: String,
    start_chunk_index: usize,
    text_start_offset: usize,
}

#[allow(clippy::too_many_arguments)]
fn split_section(
    section: SectionSplit<'_>,
    target_tokens: usize,
    overlap_fraction: f32,
    source_file: &str,
    page_offsets: &[usize],
    boundary: &Regex,
    counter: &TokenCounter,
) -> Vec<Chunk> {
    if section.text.trim().is_empty() {
        return Vec::new();
    }

    let chars_per_token = counter.chars_per_token(section.text);
    let target_chars = ((target_tokens as f32) * chars_per_token) as usize;
    let overlap_chars = ((target_chars as f32) * overlap_fraction) as usize;
    // Minimum advance is half the target to prevent micro-chunks
    let min_advance = (target_chars / 2).max(100);

    let mut chunks: Vec<Chunk> = Vec::new();
    let mut chunk_idx = section.start_chunk_index;
    let mut remaining = section.text;
    let mut offset_in_section = 0usize;
    let mut is_first = true;

    while !remaining.trim().is_empty() {
        let split_at = find_split_point(remaining, target_chars, boundary);
        let chunk_text = remaining[..split_at].trim();

        if chunk_text.is_empty() {
            break;
        }

        let token_count = counter.count(chunk_text);
        let abs_start = section.text_start_offset + offset_in_section;
        let abs_end = abs_start + split_at;

        chunks.push(Chunk {
            text: chunk_text.to_string(),
            context_header: section.context_header.clone(),
            chunk_index: chunk_idx,
            start_page: estimate_page(abs_start, page_offsets),
            end_page: estimate_page(abs_end, page_offsets),
            token_count,
            source_file: source_file.to_string(),
            overlap_with_previous: !is_first,
        });

        chunk_idx += 1;
        is_first = false;

        // Advance by split point minus overlap, but never less than the
        // minimum, and never past the end of the section
        let advance = split_at
            .saturating_sub(overlap_chars)
            .max(min_advance)
            .min(remaining.len());
        let advance = floor_char_boundary(remaining, advance);
        if advance == 0 {
            break;
        }
        offset_in_section += advance;
        remaining = &remaining[advance..];
    }

    chunks
}

/// Chunk a normalized document into embedding-ready pieces.
///
/// Selects the hierarchy grammar from the document's subfolder with a
/// content-based fallback, partitions the text at primary-level
/// markers, and splits each section into token-bounded chunks with
/// breadcrumb headers. Empty or whitespace-only input yields no chunks.
pub fn chunk_document(
    doc: &ParsedDocument,
    normalized_text: &str,
    target_tokens: usize,
    overlap_fraction: f32,
    counter: &TokenCounter,
) -> Vec<Chunk> {
    let kind = DocumentKind::resolve(&doc.subfolder, normalized_text);
    tracing::debug!("Using document kind '{}' for {}", kind.name(), doc.file_name);

    let grammar = kind.grammar();
    let page_offsets = build_page_offsets(doc);
    let all_nodes = detect_hierarchy(normalized_text, kind);

    let primary_nodes: Vec<&HierarchyNode> = all_nodes
        .iter()
        .filter(|n| grammar.primary_levels.contains(&n.level))
        .collect();

    let doc_title = doc.title().to_string();

    if primary_nodes.is_empty() {
        // No structural markers found, chunk as flat text
        let chunks = split_section(
            SectionSplit {
                text: normalized_text,
                context_header: doc_title,
                start_chunk_index: 0,
                text_start_offset: 0,
            },
            target_tokens,
            overlap_fraction,
            &doc.file_path,
            &page_offsets,
            &grammar.split_boundary,
            counter,
        );
        tracing::info!(
            "{}: {} chunks (flat/{}, no primary hierarchy)",
            doc.file_name,
            chunks.len(),
            kind.name()
        );
        return chunks;
    }

    // Section ranges run from one primary marker to the next, plus a
    // leading section when text precedes the first marker
    let mut sections: Vec<(usize, usize)> = Vec::new();
    if primary_nodes[0].start_pos > 0 {
        sections.push((0, primary_nodes[0].start_pos));
    }
    for (i, node) in primary_nodes.iter().enumerate() {
        let end = primary_nodes
            .get(i + 1)
            .map(|next| next.start_pos)
            .unwrap_or(normalized_text.len());
        sections.push((node.start_pos, end));
    }

    let mut all_chunks: Vec<Chunk> = Vec::new();
    let mut chunk_idx = 0usize;

    for (start_pos, end_pos) in sections {
        let section_text = &normalized_text[start_pos..end_pos];
        if section_text.trim().is_empty() {
            continue;
        }

        let path = build_context_path(&all_nodes, start_pos);
        let header = if path.is_empty() {
            doc_title.clone()
        } else {
            build_context_header(&path)
        };

        let mut chunks = split_section(
            SectionSplit {
                text: section_text,
                context_header: header,
                start_chunk_index: chunk_idx,
                text_start_offset: start_pos,
            },
            target_tokens,
            overlap_fraction,
            &doc.file_path,
            &page_offsets,
            &grammar.split_boundary,
            counter,
        );

        // A long section may itself contain nested markers; re-derive
        // each chunk's header from the sub-hierarchy nearest its
        // approximate midpoint within the section
        let count = chunks.len().max(1);
        for chunk in &mut chunks {
            let mid_pos = start_pos + (chunk.chunk_index - chunk_idx) * ((end_pos - start_pos) / count);
            let mid_pos = mid_pos.min(end_pos.saturating_sub(1));
            let sub_path = build_context_path(&all_nodes, mid_pos);
            if !sub_path.is_empty() {
                chunk.context_header = build_context_header(&sub_path);
            }
        }

        chunk_idx += chunks.len();
        all_chunks.extend(chunks);
    }

    tracing::info!(
        "{}: {} chunks ({} primary sections, {} total nodes, type={})",
        doc.file_name,
        all_chunks.len(),
        primary_nodes.len(),
        all_nodes.len(),
        kind.name()
    );

    all_chunks
}
