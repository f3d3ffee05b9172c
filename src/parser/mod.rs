pub mod baseline;
pub mod normalize;
pub mod rules;

pub use baseline::extract;
pub use normalize::{normalize, PAGE_BREAK};

/// Cut `s` to at most `max` chars on a char boundary, trimming the cut edge.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].trim_end().to_string(),
        None => s.to_string(),
    }
}
