//! Case-folded tokenization shared by the token index and the textual
//! seed scorer.

/// Split text into lowercase alphanumeric tokens, discarding punctuation.
/// Shared by the token index (build time) and `find_seeds` (query time) so
/// both sides fold case identically.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_folds_case_and_splits_on_punctuation() {
        let tokens = tokenize("MindMapEngine.ts");
        assert_eq!(tokens, vec!["mindmapengine", "ts"]);
    }

    #[test]
    fn tokenize_handles_empty_string() {
        assert!(tokenize("").is_empty());
    }
}
