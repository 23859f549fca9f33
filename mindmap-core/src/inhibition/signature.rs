//! Failure signatures: a normalized token-bag fingerprint of the text
//! describing why a result was unhelpful, used to recognize "we've seen
//! this failure before" without requiring exact string matches (spec.md
//! §4.5). Stop words are filtered out so two paraphrases of the same
//! failure still collide, and each involved file contributes a `ext:`
//! token so failures tied to one kind of file (e.g. `.tsx` vs `.py`)
//! don't bleed into each other.

use crate::graph::index::tokenize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Low-information words dropped before hashing, so filler differences
/// between two descriptions of the same failure don't change the
/// signature (spec.md §4.5).
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "to", "of", "in", "on",
    "at", "for", "with", "and", "or", "but", "this", "that", "these", "those", "it", "its", "as",
    "by", "from", "into", "than", "then", "so", "not", "no", "do", "does", "did", "has", "have",
    "had", "will", "would", "can", "could",
];

/// Build a signature from the pieces that describe a failure: free-form
/// text parts (task description, error type, error message) and the
/// files involved. Text is tokenized, stop-words dropped; each file
/// contributes an `ext:<extension>` token derived from its suffix
/// (spec.md §4.5).
#[must_use]
pub fn signature_of(text_parts: &[&str], files: &[String]) -> (String, HashSet<String>) {
    let mut tokens: HashSet<String> = text_parts
        .iter()
        .flat_map(|part| tokenize(part))
        .filter(|token| !STOP_WORDS.contains(&token.as_str()))
        .collect();

    for file in files {
        if let Some(ext) = file_extension(file) {
            tokens.insert(format!("ext:{}", ext.to_lowercase()));
        }
    }

    let mut sorted: Vec<&str> = tokens.iter().map(String::as_str).collect();
    sorted.sort_unstable();

    let mut hasher = Sha256::new();
    for token in &sorted {
        hasher.update(token.as_bytes());
        hasher.update([0u8]);
    }
    (format!("{:x}", hasher.finalize()), tokens)
}

fn file_extension(file: &str) -> Option<&str> {
    let name = file.rsplit(['/', '\\']).next().unwrap_or(file);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() {
        None
    } else {
        Some(ext)
    }
}

/// Jaccard overlap between two token sets: `|A ∩ B| / |A ∪ B|`, `0.0`
/// when both are empty.
#[must_use]
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn identical_text_up_to_word_order_has_same_signature() {
        let (sig_a, _) = signature_of(&["connection timed out retrying"], &[]);
        let (sig_b, _) = signature_of(&["retrying, connection TIMED OUT"], &[]);
        assert_eq!(sig_a, sig_b);
    }

    #[test]
    fn stop_words_do_not_change_the_signature() {
        let (sig_a, _) = signature_of(&["the connection timed out"], &[]);
        let (sig_b, _) = signature_of(&["connection timed out"], &[]);
        assert_eq!(sig_a, sig_b);
    }

    #[test]
    fn multiple_text_parts_are_combined() {
        let (_, tokens) = signature_of(&["parse failure", "SyntaxError", "unexpected token"], &[]);
        assert!(tokens.contains("parse"));
        assert!(tokens.contains("syntaxerror"));
        assert!(tokens.contains("unexpected"));
    }

    #[test]
    fn files_contribute_extension_tokens() {
        let (_, tokens) = signature_of(&["generic failure"], &["src/auth/login.ts".to_string()]);
        assert!(tokens.contains("ext:ts"));
    }

    #[test]
    fn dotfiles_without_a_stem_have_no_extension_token() {
        let (_, tokens) = signature_of(&["failure"], &[".gitignore".to_string()]);
        assert!(!tokens.iter().any(|t| t.starts_with("ext:")));
    }

    #[test]
    fn jaccard_of_identical_sets_is_one() {
        let (_, tokens) = signature_of(&["foo bar baz"], &[]);
        assert!((jaccard(&tokens, &tokens) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn jaccard_of_disjoint_sets_is_zero() {
        let (_, a) = signature_of(&["foo bar"], &[]);
        let (_, b) = signature_of(&["baz qux"], &[]);
        assert_eq!(jaccard(&a, &b), 0.0);
    }

    proptest! {
        #[test]
        fn jaccard_is_symmetric_and_bounded(
            a in prop::collection::hash_set("[a-f]{1,3}", 0..8),
            b in prop::collection::hash_set("[a-f]{1,3}", 0..8),
        ) {
            let value = jaccard(&a, &b);
            prop_assert!((0.0..=1.0).contains(&value));
            prop_assert!((value - jaccard(&b, &a)).abs() < 1e-12);
        }
    }
}
