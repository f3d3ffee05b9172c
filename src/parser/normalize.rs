use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S+").unwrap());
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+@\S+").unwrap());
static PAGE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:page\s+)?\d{1,4}(?:\s+of\s+\d{1,4})?$").unwrap());
static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Page separator used when concatenating per-page text.
pub const PAGE_BREAK: char = '\u{000C}';

/// Lines inspected at the top and bottom of each page for running headers/footers.
const EDGE_LINES: usize = 2;

/// Clean page-concatenated PDF text: drop running headers/footers and page
/// numbers, strip URLs and e-mail addresses, rejoin hyphenated words and
/// collapse whitespace. Line breaks survive as single `\n`.
pub fn normalize(raw: &str) -> String {
    let mut text = normalize_pass(raw);
    // Stripping a token can leave a fresh end-of-line hyphen behind; settle.
    loop {
        let next = normalize_pass(&text);
        if next == text {
            return text;
        }
        text = next;
    }
}

fn normalize_pass(raw: &str) -> String {
    let pages: Vec<Vec<String>> = raw
        .split(PAGE_BREAK)
        .map(|page| {
            page.lines()
                .map(clean_line)
                .filter(|l| !l.is_empty() && !PAGE_NUMBER_RE.is_match(l))
                .collect()
        })
        .collect();

    let running = running_lines(&pages);

    let mut lines = Vec::new();
    for page in pages {
        let len = page.len();
        for (i, line) in page.into_iter().enumerate() {
            let at_edge = i < EDGE_LINES || i + EDGE_LINES >= len;
            if at_edge && running.contains(&mask_digits(&line)) {
                continue;
            }
            lines.push(line);
        }
    }

    join_hyphenated(lines).join("\n")
}

fn clean_line(line: &str) -> String {
    let line = EMAIL_RE.replace_all(line, " ");
    let line = URL_RE.replace_all(&line, " ");
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn mask_digits(line: &str) -> String {
    DIGITS_RE.replace_all(&line.to_lowercase(), "#").into_owned()
}

/// Edge lines whose digit-masked form recurs on at least half the pages.
fn running_lines(pages: &[Vec<String>]) -> HashSet<String> {
    if pages.len() < 2 {
        return HashSet::new();
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    for page in pages {
        let len = page.len();
        let keys: HashSet<String> = page
            .iter()
            .enumerate()
            .filter(|(i, _)| *i < EDGE_LINES || i + EDGE_LINES >= len)
            .map(|(_, l)| mask_digits(l))
            .collect();
        for key in keys {
            *counts.entry(key).or_default() += 1;
        }
    }

    counts
        .into_iter()
        .filter(|(_, n)| *n >= 2 && n * 2 >= pages.len())
        .map(|(key, _)| key)
        .collect()
}

/// "exam-" followed by "ple ..." becomes "example ...".
fn join_hyphenated(lines: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        let starts_lower = line.chars().next().is_some_and(|c| c.is_lowercase());
        match out.last_mut() {
            Some(prev) if starts_lower && ends_with_split_word(prev) => {
                prev.pop();
                prev.push_str(&line);
            }
            _ => out.push(line),
        }
    }
    out
}

fn ends_with_split_word(line: &str) -> bool {
    let mut tail = line.chars().rev();
    tail.next() == Some('-') && tail.next().is_some_and(|c| c.is_alphabetic())
}

// ── Tests ──
