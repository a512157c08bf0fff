//! Filename tokenizer and query-relevance scorer.
//!
//! Pure, deterministic, no hidden state — the same string always
//! tokenizes to the same set, in-process or across peers.

use std::collections::BTreeSet;

/// Tokenize a filename (or a search query, via the same procedure):
/// strip the final extension, lower-case, split on whitespace/`_`/`-`/`.`,
/// keep tokens of length >= 2, then add every prefix of length `3..len-1`
/// of each retained token.
#[must_use]
pub fn tokenize(input: &str) -> BTreeSet<String> {
    let stem = strip_extension(input);
    let lower = stem.to_lowercase();

    let mut tokens = BTreeSet::new();
    for raw in lower.split(|c: char| c.is_whitespace() || c == '_' || c == '-' || c == '.') {
        if raw.chars().count() < 2 {
            continue;
        }
        tokens.insert(raw.to_string());
        for prefix_len in 3..raw.chars().count() {
            let prefix: String = raw.chars().take(prefix_len).collect();
            tokens.insert(prefix);
        }
    }
    tokens
}

fn strip_extension(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(0) | None => filename,
        Some(idx) => &filename[..idx],
    }
}

/// `|Q ∩ F| / |Q|`, or 0 if `Q` is empty. An empty query is not a
/// wildcard inside the ranked path — callers special-case it themselves.
#[must_use]
pub fn score(query_tokens: &BTreeSet<String>, file_tokens: &BTreeSet<String>) -> f32 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let hits = query_tokens.intersection(file_tokens).count();
    hits as f32 / query_tokens.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_extension_and_splits_delimiters() {
        let tokens = tokenize("machine_learning_notes.txt");
        assert!(tokens.contains("machine"));
        assert!(tokens.contains("learning"));
        assert!(tokens.contains("notes"));
        assert!(!tokens.contains("txt"));
    }

    #[test]
    fn short_tokens_are_dropped() {
        let tokens = tokenize("a_b_machine.txt");
        assert!(!tokens.contains("a"));
        assert!(!tokens.contains("b"));
        assert!(tokens.contains("machine"));
    }

    #[test]
    fn generates_prefixes_length_three_to_len_minus_one() {
        let tokens = tokenize("machine.txt");
        // "machine" has length 7; prefixes of length 3..6 inclusive.
        for prefix in ["mac", "mach", "machi", "machin"] {
            assert!(tokens.contains(prefix), "missing prefix {prefix}");
        }
        assert!(tokens.contains("machine"));
        assert!(!tokens.contains("machines"));
    }

    #[test]
    fn tokenize_is_idempotent() {
        let a = tokenize("Deep_Learning-Tutorial.pdf");
        let b = tokenize("Deep_Learning-Tutorial.pdf");
        assert_eq!(a, b);
    }

    #[test]
    fn empty_query_scores_zero() {
        let q = tokenize("");
        let f = tokenize("machine_learning_notes.txt");
        assert_eq!(score(&q, &f), 0.0);
    }

    #[test]
    fn score_bounds_and_partial_prefix_match() {
        let q = tokenize("mach");
        let f = tokenize("machine_learning_notes.txt");
        let s = score(&q, &f);
        assert!(s > 0.0 && s <= 1.0);
    }

    #[test]
    fn filename_with_leading_dot_keeps_whole_name() {
        // ".gitignore" has no extension to strip (leading dot is not one).
        let tokens = tokenize(".gitignore");
        assert!(tokens.contains("gitignore"));
    }
}
