use rustc_hash::FxHashSet;

/// Tokens longer than this are dropped rather than truncated.
pub const MAX_TOKEN_LENGTH: usize = 255;

/// English stop words removed from indexed text
pub const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is",
    "it", "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there",
    "these", "they", "this", "to", "was", "will", "with",
];

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

fn is_token_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Split text into lowercased word tokens for the inverted index.
///
/// Tokens are maximal runs of alphanumeric characters (or `_`). Stop words
/// and over-long tokens are dropped. Each distinct token is returned once,
/// in order of first occurrence.
pub fn analyze(text: &str) -> Vec<String> {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut tokens = Vec::new();

    for word in text.split(|ch: char| !is_token_char(ch)) {
        if word.is_empty() {
            continue;
        }
        // Lowercasing can grow a word, so the cap applies to the result
        let token = word.to_lowercase();
        if token.len() > MAX_TOKEN_LENGTH || is_stop_word(&token) {
            continue;
        }
        if seen.insert(token.clone()) {
            tokens.push(token);
        }
    }

    tokens
}

/// Normalize a single lookup term the same way [`analyze`] normalizes text.
/// Returns None for terms the analyzer would never emit.
pub fn normalize_term(term: &str) -> Option<String> {
    let term = term.trim();
    if term.is_empty() || !term.chars().all(is_token_char) {
        return None;
    }
    let token = term.to_lowercase();
    if token.len() > MAX_TOKEN_LENGTH || is_stop_word(&token) {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_splits_on_punctuation() {
        let tokens = analyze("Ada Lovelace, the Analytical-Engine pioneer.");
        assert_eq!(tokens, vec!["ada", "lovelace", "analytical", "engine", "pioneer"]);
    }

    #[test]
    fn test_drops_stop_words_and_duplicates() {
        let tokens = analyze("The cat and the hat; a cat is not a hat");
        assert_eq!(tokens, vec!["cat", "hat"]);
    }

    #[test]
    fn test_unicode_words() {
        let tokens = analyze("Zürich café 東京");
        assert_eq!(tokens, vec!["zürich", "café", "東京"]);
    }

    #[test]
    fn test_long_tokens_are_dropped() {
        let long = "x".repeat(MAX_TOKEN_LENGTH + 1);
        let text = format!("short {} word", long);
        assert_eq!(analyze(&text), vec!["short", "word"]);
    }

    #[test]
    fn test_cap_applies_after_lowercasing() {
        // "İ" is 2 bytes but lowercases to 3
        let word = "İ".repeat(127);
        assert_eq!(word.len(), 254);
        assert!(analyze(&word).is_empty());
        assert_eq!(normalize_term(&word), None);

        let tokens = analyze(&format!("{} kept", "İ".repeat(85)));
        assert_eq!(tokens.len(), 2);
        assert!(tokens.iter().all(|t| t.len() <= MAX_TOKEN_LENGTH));
    }

    #[test]
    fn test_wiki_markup_is_tokenized_as_text() {
        let tokens = analyze("'''Rust''' is a [[programming language]]");
        assert_eq!(tokens, vec!["rust", "programming", "language"]);
    }

    #[test]
    fn test_normalize_term() {
        assert_eq!(normalize_term("Rust"), Some("rust".to_string()));
        assert_eq!(normalize_term("the"), None);
        assert_eq!(normalize_term("two words"), None);
        assert_eq!(normalize_term(""), None);
    }
}
