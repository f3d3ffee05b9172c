use std::fmt::Write;

use crate::parser::truncate_chars;
use crate::schema::{DocumentRecord, Field};

pub const SYSTEM_PROMPT: &str =
    "You are a document analysis expert. Extract information and return only valid JSON.";

/// Prompt embedding the schema, the baseline values as a seed and the
/// document text cut to `max_input_chars` (the start is kept).
pub fn build_prompt(text: &str, baseline: &DocumentRecord, max_input_chars: usize) -> String {
    let body = truncate_chars(text, max_input_chars);

    let mut prompt = String::from(
        "Analyze this document and extract information in JSON format. Return ONLY valid JSON.\n\nRequired fields:\n",
    );
    for field in Field::ALL.iter().filter(|f| f.is_required()) {
        let _ = writeln!(prompt, "- {}: {}", field.key(), field.description());
    }
    prompt.push_str("\nOptional fields (use null if not found):\n");
    for field in Field::ALL.iter().filter(|f| !f.is_required()) {
        let _ = writeln!(prompt, "- {}: {}", field.key(), field.description());
    }

    let seed = serde_json::to_string_pretty(baseline).unwrap_or_default();
    let _ = write!(
        prompt,
        "\nA rule-based extractor produced these values. Improve or complete them; \
         use no keys other than the ones listed above:\n{}\n\nDocument text:\n{}\n\nReturn only the JSON object:\n",
        seed, body
    );
    prompt
}

// ── Tests ──
