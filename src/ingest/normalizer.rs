//! Text normalization for legal documents
//!
//! Strips headers, footers, and page-number noise while preserving
//! legal section markers (Chapter, Section, §, subsection references).
//! The header/footer patterns match whole lines only and are written so
//! they can never match a legal marker.

use regex::Regex;
use std::sync::LazyLock;

/// Full-line header/footer patterns removed everywhere in the text.
static HEADER_FOOTER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // "Page 1 of 5", "page 12 of 100"
        r"(?im)^\s*Page\s+\d+\s+of\s+\d+\s*$",
        // "Page 1" on its own line
        r"(?im)^\s*Page\s+\d+\s*$",
        // "Wisconsin Statutes 2023" header
        r"(?im)^\s*Wisconsin\s+Statut(?:e|es)\s+\d{4}\s*$",
        // "Updated 2023-01-15" or "Updated 2023/01/15" footer
        r"(?im)^\s*Updated\s+\d{4}[-/]\d{2}[-/]\d{2}\s*$",
        // Centered page numbers like "- 42 -" or "— 42 —"
        r"(?m)^\s*[-\u{2014}\u{2013}]\s*\d+\s*[-\u{2014}\u{2013}]\s*$",
        // Copyright / confidential footer lines
        r"(?im)^\s*(?:Copyright|Confidential|\u{a9}).*\d{4}\s*$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("header/footer pattern"))
    .collect()
});

/// Standalone page-number lines (just digits, 1-4 chars). Applied only
/// at page boundaries to avoid stripping numeric statute content.
static LONE_PAGE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d{1,4}\s*$").expect("page number pattern"));

static MULTI_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("newline pattern"));

static MULTI_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" {2,}").expect("space pattern"));

/// Remove repetitive headers, footers, and standalone page numbers.
///
/// Lone page-number lines are only removed within the first or last 3
/// lines of each page-separated (`\n\n`) block; short blocks (≤ 6
/// lines) are checked in full.
pub fn strip_headers_footers(text: &str) -> String {
    let mut text = text.to_string();
    for pattern in HEADER_FOOTER_PATTERNS.iter() {
        text = pattern.replace_all(&text, "").into_owned();
    }

    let cleaned_sections: Vec<String> = text
        .split("\n\n")
        .map(|section| {
            let lines: Vec<&str> = section.split('\n').collect();
            let kept: Vec<&str> = if lines.len() <= 6 {
                lines
                    .into_iter()
                    .filter(|ln| !LONE_PAGE_NUMBER.is_match(ln))
                    .collect()
            } else {
                let head = lines[..3]
                    .iter()
                    .copied()
                    .filter(|ln| !LONE_PAGE_NUMBER.is_match(ln));
                let middle = lines[3..lines.len() - 3].iter().copied();
                let tail = lines[lines.len() - 3..]
                    .iter()
                    .copied()
                    .filter(|ln| !LONE_PAGE_NUMBER.is_match(ln));
                head.chain(middle).chain(tail).collect()
            };
            kept.join("\n")
        })
        .collect();

    cleaned_sections.join("\n\n")
}

/// Normalize whitespace while preserving paragraph breaks.
///
/// - Tabs → single space
/// - 3+ consecutive newlines → 2 newlines (paragraph break)
/// - 2+ spaces within a line → 1 space
/// - Strip leading/trailing whitespace per line and overall
pub fn normalize_whitespace(text: &str) -> String {
    let text = text.replace('\t', " ");
    let text = MULTI_NEWLINE.replace_all(&text, "\n\n");

    let lines: Vec<String> = text
        .split('\n')
        .map(|line| MULTI_SPACE.replace_all(line, " ").trim().to_string())
        .collect();

    lines.join("\n").trim().to_string()
}

/// Full normalization pipeline: strip headers/footers, then normalize
/// whitespace. Pure and total on any input, including empty.
pub fn normalize_text(text: &str) -> String {
    let text = strip_headers_footers(text);
    normalize_whitespace(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_page_of_page_markers() {
        let text = "Chapter 943\nPage 1 of 12\nTheft is prohibited.";
        let result = normalize_text(text);
        assert!(!result.contains("Page 1 of 12"));
        assert!(result.contains("Chapter 943"));
        assert!(result.contains("Theft is prohibited."));
    }

    #[test]
    fn test_removes_dated_headers() {
        let text = "Wisconsin Statutes 2023\n§ 940.01 First-degree intentional homicide\nUpdated 2023-01-15";
        let result = normalize_text(text);
        assert!(!result.contains("Wisconsin Statutes"));
        assert!(!result.contains("Updated"));
        assert!(result.contains("§ 940.01"));
    }

    #[test]
    fn test_removes_centered_page_numbers() {
        let text = "Some statute text.\n- 42 -\nMore statute text.";
        let result = normalize_text(text);
        assert!(!result.contains("- 42 -"));
    }

    #[test]
    fn test_preserves_legal_markers() {
        // Marker-bearing lines interleaved with noise lines must survive
        let text = "Page 3 of 9\nChapter 346\n¶ 12 The court held.\n(1) A person commits theft.\nCopyright Wisconsin DOJ 2020";
        let result = normalize_text(text);
        assert!(result.contains("Chapter 346"));
        assert!(result.contains("¶ 12"));
        assert!(result.contains("(1) A person commits theft."));
        assert!(!result.contains("Copyright"));
        assert!(!result.contains("Page 3"));
    }

    #[test]
    fn test_lone_page_number_only_at_block_edges() {
        // A bare number buried mid-block survives; the same number in
        // the first three lines of a block is stripped.
        let long_block = "42\nline two\nline three\nline four\n346\nline six\nline seven\nline eight";
        let result = strip_headers_footers(long_block);
        assert!(!result.starts_with("42"));
        assert!(result.contains("346"));
    }

    #[test]
    fn test_whitespace_collapse() {
        let text = "Line  with   extra spaces\n\n\n\nNext paragraph\t here";
        let result = normalize_text(text);
        assert_eq!(result, "Line with extra spaces\n\nNext paragraph here");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("   \n\n  "), "");
    }
}
