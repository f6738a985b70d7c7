//! Post-processing guardrails for generated answers
//!
//! Detects sensitive topics (use of force, possibly outdated sources,
//! jurisdiction mismatches) from the query, answer text, and retrieval
//! metadata, and produces advisory flags plus addendum text.

use crate::ingest::metadata::ChunkMetadata;
use chrono::Datelike;
use regex::Regex;
use std::sync::LazyLock;

/// Terms that trigger the use-of-force caution.
const USE_OF_FORCE_TERMS: &[&str] = &[
    "use of force",
    "deadly force",
    "firearm",
    "discharge",
    "taser",
    "electronic control device",
    "oc spray",
    "pepper spray",
    "baton",
    "chokehold",
    "neck restraint",
    "vehicle pursuit",
    "pursuit policy",
    "fleeing",
    "shooting",
    "force",
    "pursuit",
];

/// Keywords indicating the query already names a jurisdiction.
const JURISDICTION_KEYWORDS: &[&str] = &[
    "department",
    "agency",
    "local",
    "city",
    "county",
    "madison",
    "milwaukee",
    "dane",
];

static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"((?:19|20)\d{2})").expect("year pattern"));

/// How many years old the primary source may be before it is flagged.
const OUTDATED_YEARS: i32 = 10;

/// Safety flags and the advisory text they contribute.
#[derive(Debug, Clone, Default)]
pub struct SafetyAssessment {
    pub use_of_force_caution: bool,
    pub outdated_possible: bool,
    pub jurisdiction_note: bool,
    pub addendum_text: String,
}

/// True if the query or answer involves use-of-force topics.
pub fn check_use_of_force(query: &str, answer_text: &str) -> bool {
    let combined = format!("{} {}", query, answer_text).to_lowercase();
    USE_OF_FORCE_TERMS.iter().any(|term| combined.contains(term))
}

/// True if the primary (rank-1) source's filename carries a year more
/// than [`OUTDATED_YEARS`] before the current year.
pub fn check_outdated_possible(sources: &[&ChunkMetadata]) -> bool {
    let primary = match sources.first() {
        Some(primary) => primary,
        None => return false,
    };

    let current_year = chrono::Utc::now().year();
    if let Some(caps) = YEAR_PATTERN.captures(&primary.source_file) {
        if let Ok(year) = caps[1].parse::<i32>() {
            return current_year - year > OUTDATED_YEARS;
        }
    }
    false
}

/// True when a general query (no jurisdiction keyword) is answered
/// primarily from a training or local-department source.
pub fn check_jurisdiction_note(query: &str, sources: &[&ChunkMetadata]) -> bool {
    let top = match sources.first() {
        Some(top) => top,
        None => return false,
    };

    let query_lower = query.to_lowercase();
    if JURISDICTION_KEYWORDS.iter().any(|kw| query_lower.contains(kw)) {
        return false;
    }

    top.source_type.as_str() == "training" || top.jurisdiction.as_str().contains("local_department")
}

/// Build all safety flags and the combined addendum text.
pub fn build_safety_addendum(
    query: &str,
    answer_text: &str,
    sources: &[&ChunkMetadata],
) -> SafetyAssessment {
    let use_of_force_caution = check_use_of_force(query, answer_text);
    let outdated_possible = check_outdated_possible(sources);
    let jurisdiction_note = check_jurisdiction_note(query, sources);

    let mut addendum_parts: Vec<&str> = Vec::new();

    if use_of_force_caution {
        addendum_parts.push(
            "Note: This response involves use of force topics. \
             Department-specific policies may impose additional requirements \
             beyond state law. Consult your agency's use-of-force policy.",
        );
    }

    if outdated_possible {
        addendum_parts.push(
            "Note: The primary source cited may be outdated. \
             Please verify against current statutes and regulations.",
        );
    }

    if jurisdiction_note {
        addendum_parts.push(
            "Note: The top retrieved source is a local department policy. \
             State-level statutes or other jurisdictions may differ.",
        );
    }

    SafetyAssessment {
        use_of_force_caution,
        outdated_possible,
        jurisdiction_note,
        addendum_text: addendum_parts.join(" "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::metadata::{Jurisdiction, SourceType};

    fn meta(source_file: &str, source_type: SourceType, jurisdiction: Jurisdiction) -> ChunkMetadata {
        ChunkMetadata {
            doc_id: "id".to_string(),
            source_type,
            jurisdiction,
            superseded: false,
            title: String::new(),
            source_file: source_file.to_string(),
            chunk_index: 0,
            start_page: 1,
            end_page: 1,
            context_header: String::new(),
            statute_numbers: vec![],
            case_citations: vec![],
            chapter_numbers: vec![],
            token_count: 5,
        }
    }

    #[test]
    fn test_use_of_force_from_query() {
        assert!(check_use_of_force("when may I use my taser", "answer text"));
        assert!(check_use_of_force("question", "deadly force is only justified when"));
        assert!(!check_use_of_force("parking rules", "park legally"));
    }

    fn current_year_file() -> String {
        format!("/data/statutes/ch943_{}.txt", chrono::Utc::now().year())
    }

    #[test]
    fn test_outdated_old_year_in_filename() {
        let old = meta("/data/training/lesb_manual_2008.txt", SourceType::Training, Jurisdiction::State);
        let recent = meta(&current_year_file(), SourceType::Statute, Jurisdiction::State);
        let undated = meta("/data/statutes/ch943.txt", SourceType::Statute, Jurisdiction::State);

        assert!(check_outdated_possible(&[&old]));
        assert!(!check_outdated_possible(&[&recent]));
        assert!(!check_outdated_possible(&[&undated]));
        assert!(!check_outdated_possible(&[]));
    }

    #[test]
    fn test_outdated_checks_primary_only() {
        let recent = meta(&current_year_file(), SourceType::Statute, Jurisdiction::State);
        let old = meta("/data/training/manual_2001.txt", SourceType::Training, Jurisdiction::State);
        assert!(!check_outdated_possible(&[&recent, &old]));
    }

    #[test]
    fn test_jurisdiction_note_general_query_local_source() {
        let local = meta("/data/policy/pd.txt", SourceType::Policy, Jurisdiction::LocalDepartment);
        assert!(check_jurisdiction_note("when can I search a car", &[&local]));
    }

    #[test]
    fn test_jurisdiction_note_suppressed_for_specific_query() {
        let local = meta("/data/policy/pd.txt", SourceType::Policy, Jurisdiction::LocalDepartment);
        assert!(!check_jurisdiction_note("what is the Madison department policy", &[&local]));
    }

    #[test]
    fn test_jurisdiction_note_training_source() {
        let training = meta("/data/training/lesb.txt", SourceType::Training, Jurisdiction::State);
        assert!(check_jurisdiction_note("how do I conduct a frisk", &[&training]));
    }

    #[test]
    fn test_no_note_for_state_statute() {
        let statute = meta("/data/statutes/ch968.txt", SourceType::Statute, Jurisdiction::State);
        assert!(!check_jurisdiction_note("how do I conduct a frisk", &[&statute]));
    }

    #[test]
    fn test_addendum_combines_notes() {
        let local = meta(
            "/data/policy/pursuit_2005.txt",
            SourceType::Policy,
            Jurisdiction::LocalDepartment,
        );
        let assessment =
            build_safety_addendum("vehicle pursuit rules", "pursuits are restricted", &[&local]);

        assert!(assessment.use_of_force_caution);
        assert!(assessment.outdated_possible);
        assert!(assessment.jurisdiction_note);
        assert!(assessment.addendum_text.contains("use of force topics"));
        assert!(assessment.addendum_text.contains("may be outdated"));
        assert!(assessment.addendum_text.contains("local department policy"));
    }

    #[test]
    fn test_empty_sources_no_flags() {
        let assessment = build_safety_addendum("parking rules", "answer", &[]);
        assert!(!assessment.outdated_possible);
        assert!(!assessment.jurisdiction_note);
        assert!(assessment.addendum_text.is_empty());
    }
}
