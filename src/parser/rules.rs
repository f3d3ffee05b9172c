//! Declarative extraction rules. Each rule targets one schema field and is
//! evaluated on its own; `RULES` fixes the order in which they are tried.

use std::sync::LazyLock;

use regex::Regex;

use super::truncate_chars;
use crate::schema::Field;

static STANDALONE_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?:\d+(?:\.\d+)*|[ivx]+)\.?\s+)?([a-z][a-z ]{2,40}?)\s*[:.]?$").unwrap()
});
static INLINE_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?:\d+(?:\.\d+)*|[ivx]+)\.?\s+)?([a-z][a-z ]{2,40}?)\s*[:\u{2013}\u{2014}]\s+(.+)$")
        .unwrap()
});
static ALL_CAPS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z][A-Z\s]{3,}$").unwrap());
static SENTENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^.!?]+[.!?]").unwrap());
static CAPTION_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)Figure \d+[:.][^.]*\.",
        r"(?i)Fig\. \d+[:.][^.]*\.",
        r"(?i)Table \d+[:.][^.]*\.",
        r"(?i)Image \d+[:.][^.]*\.",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

const INTRODUCTION_HEADINGS: &[&str] = &["introduction", "abstract", "summary", "background"];
const THOUGHTS_HEADINGS: &[&str] = &[
    "methods",
    "materials and methods",
    "patients and methods",
    "methodology",
    "approach",
    "discussion",
];
const ANSWERS_HEADINGS: &[&str] = &["results", "findings", "conclusion", "conclusions", "outcome", "outcomes"];
const DEVELOPMENT_HEADINGS: &[&str] = &["limitations", "future work", "future research", "future directions"];
const HALLMARK_HEADINGS: &[&str] = &["highlights", "key points", "hallmarks"];
const FURTHER_THOUGHTS_HEADINGS: &[&str] = &["perspectives", "outlook", "implications"];
const REFERENCE_HEADINGS: &[&str] = &["references", "bibliography", "citations"];

/// Headings that close a section without feeding any field.
const BOUNDARY_HEADINGS: &[&str] = &[
    "keywords",
    "key words",
    "acknowledgements",
    "acknowledgments",
    "funding",
    "abbreviations",
    "author contributions",
    "conflict of interest",
    "conflicts of interest",
    "competing interests",
    "case report",
    "case presentation",
    "supplementary material",
    "appendix",
];

const TITLE_SKIP: &[&str] = &["issn", "doi", "©", "page", "volume"];
const MAX_SENTENCE_CHARS: usize = 400;

#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// First sufficiently long line near the top that is not journal boilerplate.
    Title {
        field: Field,
        max_lines: usize,
        min_len: usize,
        skip: &'static [&'static str],
    },
    /// Text under the first heading (tried in order) that has a non-empty body.
    Section {
        field: Field,
        headings: &'static [&'static str],
        max_chars: usize,
    },
    /// Leading entries of a reference list.
    References {
        field: Field,
        headings: &'static [&'static str],
        max_items: usize,
    },
    /// Figure/table/image caption sentences anywhere in the text.
    Captions { field: Field, max_items: usize },
    /// Sentences mentioning a keyword.
    KeywordSentences {
        field: Field,
        keyword: &'static str,
        max_items: usize,
    },
}

pub const RULES: &[Rule] = &[
    Rule::Title {
        field: Field::Document,
        max_lines: 20,
        min_len: 10,
        skip: TITLE_SKIP,
    },
    Rule::Section {
        field: Field::Introduction,
        headings: INTRODUCTION_HEADINGS,
        max_chars: 1500,
    },
    Rule::Section {
        field: Field::Thoughts,
        headings: THOUGHTS_HEADINGS,
        max_chars: 1500,
    },
    Rule::Section {
        field: Field::Answers,
        headings: ANSWERS_HEADINGS,
        max_chars: 1500,
    },
    Rule::Section {
        field: Field::Hallmarks,
        headings: HALLMARK_HEADINGS,
        max_chars: 1000,
    },
    Rule::References {
        field: Field::FurtherReading,
        headings: REFERENCE_HEADINGS,
        max_items: 5,
    },
    Rule::Captions {
        field: Field::Images,
        max_items: 10,
    },
    Rule::Section {
        field: Field::FurtherDevelopment,
        headings: DEVELOPMENT_HEADINGS,
        max_chars: 1000,
    },
    Rule::Section {
        field: Field::FurtherThoughts,
        headings: FURTHER_THOUGHTS_HEADINGS,
        max_chars: 1000,
    },
    Rule::KeywordSentences {
        field: Field::Ependymoma,
        keyword: "ependymoma",
        max_items: 5,
    },
];

impl Rule {
    pub fn field(&self) -> Field {
        match *self {
            Rule::Title { field, .. }
            | Rule::Section { field, .. }
            | Rule::References { field, .. }
            | Rule::Captions { field, .. }
            | Rule::KeywordSentences { field, .. } => field,
        }
    }

    /// Apply to normalized text split into lines. `None` when nothing matched.
    pub fn apply(&self, lines: &[&str]) -> Option<String> {
        match *self {
            Rule::Title {
                max_lines,
                min_len,
                skip,
                ..
            } => lines.iter().take(max_lines).find_map(|line| {
                let lower = line.to_lowercase();
                let boilerplate = skip.iter().any(|s| lower.contains(s));
                (!boilerplate && line.chars().count() > min_len).then(|| line.to_string())
            }),

            Rule::Section {
                headings,
                max_chars,
                ..
            } => headings.iter().find_map(|h| {
                let body = section_body(lines, h)?.join(" ");
                let body = truncate_chars(body.trim(), max_chars);
                (!body.is_empty()).then_some(body)
            }),

            Rule::References {
                headings,
                max_items,
                ..
            } => headings.iter().find_map(|h| {
                let refs: Vec<String> = section_body(lines, h)?
                    .into_iter()
                    .map(|l| l.trim().to_string())
                    .filter(|l| l.chars().count() > 20 && !l.chars().all(|c| c.is_ascii_digit()))
                    .take(max_items)
                    .collect();
                (!refs.is_empty()).then(|| refs.join("; "))
            }),

            Rule::Captions { max_items, .. } => {
                let text = lines.join(" ");
                let captions: Vec<&str> = CAPTION_RES
                    .iter()
                    .flat_map(|re| re.find_iter(&text).map(|m| m.as_str().trim()))
                    .take(max_items)
                    .collect();
                (!captions.is_empty()).then(|| captions.join("; "))
            }

            Rule::KeywordSentences {
                keyword, max_items, ..
            } => {
                let text = lines.join(" ");
                let sentences: Vec<&str> = SENTENCE_RE
                    .find_iter(&text)
                    .map(|m| m.as_str().trim())
                    .filter(|s| s.len() <= MAX_SENTENCE_CHARS)
                    .filter(|s| s.to_lowercase().contains(keyword))
                    .take(max_items)
                    .collect();
                (!sentences.is_empty()).then(|| sentences.join(" "))
            }
        }
    }
}

/// What a line says about section structure.
#[derive(Debug, PartialEq, Eq)]
enum HeadingMatch<'a> {
    /// Known heading on a line of its own.
    Alone(String),
    /// Known heading followed by text on the same line ("Abstract: ...").
    Inline(String, &'a str),
    /// Structural break that starts no tracked section.
    Boundary,
}

fn is_known_heading(name: &str) -> bool {
    [
        INTRODUCTION_HEADINGS,
        THOUGHTS_HEADINGS,
        ANSWERS_HEADINGS,
        DEVELOPMENT_HEADINGS,
        HALLMARK_HEADINGS,
        FURTHER_THOUGHTS_HEADINGS,
        REFERENCE_HEADINGS,
        BOUNDARY_HEADINGS,
    ]
    .iter()
    .any(|group| group.contains(&name))
}

fn classify_heading(line: &str) -> Option<HeadingMatch<'_>> {
    let line = line.trim();
    if let Some(caps) = STANDALONE_HEADING_RE.captures(line) {
        let name = caps[1].trim().to_lowercase();
        if is_known_heading(&name) {
            return Some(HeadingMatch::Alone(name));
        }
    }
    if let Some(caps) = INLINE_HEADING_RE.captures(line) {
        let name = caps[1].trim().to_lowercase();
        if is_known_heading(&name) {
            let rest = caps.get(2).map_or("", |m| m.as_str());
            return Some(HeadingMatch::Inline(name, rest));
        }
    }
    if ALL_CAPS_RE.is_match(line) {
        return Some(HeadingMatch::Boundary);
    }
    None
}

/// Lines belonging to the first section opened by `heading`, up to the next
/// heading or ALL-CAPS line. `None` if the heading never occurs.
fn section_body<'a>(lines: &[&'a str], heading: &str) -> Option<Vec<&'a str>> {
    let (start, inline) = lines.iter().copied().enumerate().find_map(|(i, line)| {
        match classify_heading(line)? {
            HeadingMatch::Alone(name) if name == heading => Some((i, None)),
            HeadingMatch::Inline(name, rest) if name == heading => Some((i, Some(rest))),
            _ => None,
        }
    })?;

    let mut body: Vec<&str> = inline.into_iter().collect();
    body.extend(
        lines[start + 1..]
            .iter()
            .take_while(|l| classify_heading(l).is_none())
            .copied(),
    );
    Some(body)
}

// ── Tests ──
