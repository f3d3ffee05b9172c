use std::collections::HashMap;

use tracing::debug;

use super::rules::RULES;
use super::truncate_chars;
use crate::schema::{DocumentRecord, Field};

const TITLE_FALLBACK_CHARS: usize = 200;
const BODY_FALLBACK_CHARS: usize = 1500;

/// Map normalized text onto the schema with the ordered rule set.
///
/// Never fails: required fields the rules miss are filled with the truncated
/// document text, or a placeholder when there is no text at all.
pub fn extract(normalized: &str) -> DocumentRecord {
    let lines: Vec<&str> = normalized.lines().collect();
    let mut found: HashMap<Field, String> = HashMap::new();

    for rule in RULES {
        let field = rule.field();
        if found.contains_key(&field) {
            continue;
        }
        if let Some(text) = rule.apply(&lines) {
            debug!(field = field.key(), chars = text.chars().count(), "rule matched");
            found.insert(field, text);
        }
    }

    let whole = lines.join(" ");
    let mut required = |field: Field| {
        found
            .remove(&field)
            .unwrap_or_else(|| fallback(field, &whole))
    };
    let document = required(Field::Document);
    let introduction = required(Field::Introduction);
    let thoughts = required(Field::Thoughts);
    let answers = required(Field::Answers);

    DocumentRecord {
        document,
        introduction,
        thoughts,
        answers,
        hallmarks: found.remove(&Field::Hallmarks),
        further_reading: found.remove(&Field::FurtherReading),
        images: found.remove(&Field::Images),
        further_development: found.remove(&Field::FurtherDevelopment),
        thoughts_i: found.remove(&Field::ThoughtsI),
        answers_i: found.remove(&Field::AnswersI),
        answers_ii: found.remove(&Field::AnswersII),
        further_thoughts: found.remove(&Field::FurtherThoughts),
        ependymoma: found.remove(&Field::Ependymoma),
    }
}

fn fallback(field: Field, whole: &str) -> String {
    debug!(field = field.key(), "no rule matched, using fallback");
    let limit = match field {
        Field::Document => TITLE_FALLBACK_CHARS,
        _ => BODY_FALLBACK_CHARS,
    };
    let text = truncate_chars(whole.trim(), limit);
    if !text.is_empty() {
        return text;
    }
    match field {
        Field::Document => "Document title not found".to_string(),
        Field::Introduction => "Introduction section not found in document".to_string(),
        Field::Thoughts => "Methods/Discussion section not found in document".to_string(),
        Field::Answers => "Results/Conclusions section not found in document".to_string(),
        other => format!("{} not found in document", other.key()),
    }
}

// ── Tests ──
