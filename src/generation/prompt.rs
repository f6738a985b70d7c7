//! Prompt construction for the generation step
//!
//! Builds the system prompt (role, rules, output format) and the user
//! prompt (context + sources + question).

use crate::retrieval::SourceRef;

const SYSTEM_PROMPT: &str = "\
You are a legal information assistant for Wisconsin law enforcement officers.
You provide accurate information based ONLY on the provided context from
Wisconsin statutes, case law, and department policies.

CRITICAL RULES:
1. Write fluid, professional prose. Do NOT use inline citation brackets
   like [1], [Source 1], or (Source: ...). Never reference sources by number.
2. If information is not in the context, explicitly state \"Insufficient information available in the provided sources\"
3. Do NOT fabricate statutes, case names, or legal citations that are not
   in the provided context.
4. If multiple sources contradict each other, acknowledge the discrepancy
5. Provide clear and concise answers for law enforcement officers.
6. Respond with plain text only - no JSON, no code fences, no special formatting.

OUTPUT FORMAT:
Respond with a clean, well-written paragraph that directly answers the
question using the context provided. If you reference specific sources,
mention them naturally in the text (e.g. \"According to Wisconsin Statute
346.03...\" or \"Stated in the department handbook...\").

Be precise, factual, and concise but complete.
";

/// System prompt for the legal assistant.
pub fn system_prompt() -> &'static str {
    SYSTEM_PROMPT
}

/// Build the user prompt with the assembled context injected.
pub fn build_prompt(query: &str, context_text: &str, sources: &[SourceRef]) -> String {
    let mut source_lines: Vec<String> = Vec::new();
    for (i, source) in sources.iter().enumerate() {
        let mut line = format!("  {}. {}", i + 1, source.title);
        if !source.context_header.is_empty() {
            line.push_str(&format!(" ({})", source.context_header));
        }
        if !source.source_type.is_empty() {
            line.push_str(&format!(" [{}]", source.source_type));
        }
        source_lines.push(line);
    }

    let sources_block = if source_lines.is_empty() {
        "  (none)".to_string()
    } else {
        source_lines.join("\n")
    };

    format!(
        "CONTEXT:\n---\n{}\n---\n\nAVAILABLE SOURCES:\n{}\n\nUSER QUESTION: {}\n\nProvide a clear, professional answer based on the context above.",
        context_text, sources_block, query
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(title: &str, header: &str, source_type: &str) -> SourceRef {
        SourceRef {
            id: "id".to_string(),
            source_file: "/data/file.txt".to_string(),
            context_header: header.to_string(),
            statute_numbers: vec![],
            source_type: source_type.to_string(),
            start_page: 1,
            title: title.to_string(),
        }
    }

    #[test]
    fn test_prompt_contains_context_and_question() {
        let prompt = build_prompt("can I stop a vehicle", "the context text", &[]);
        assert!(prompt.contains("the context text"));
        assert!(prompt.contains("USER QUESTION: can I stop a vehicle"));
        assert!(prompt.contains("(none)"));
    }

    #[test]
    fn test_prompt_lists_sources() {
        let sources = vec![
            source("ch346", "Chapter 346 > 346.03", "statute"),
            source("handbook", "", "training"),
        ];
        let prompt = build_prompt("q", "ctx", &sources);
        assert!(prompt.contains("1. ch346 (Chapter 346 > 346.03) [statute]"));
        assert!(prompt.contains("2. handbook [training]"));
    }

    #[test]
    fn test_system_prompt_rules() {
        let system = system_prompt();
        assert!(system.contains("Wisconsin"));
        assert!(system.contains("Do NOT fabricate"));
    }
}
