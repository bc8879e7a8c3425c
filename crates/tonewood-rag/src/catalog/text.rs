//! Query and record text normalization
//!
//! Both the keyword path and the hashed-term embedding path run text through
//! the same pipeline so their rankings stay comparable: lowercase, split on
//! non-alphanumerics, drop stop words, fold plurals to singular.

use std::collections::BTreeSet;

const STOP_WORDS: &[&str] = &[
    "a", "about", "am", "an", "and", "any", "are", "as", "at", "be", "but", "by", "can", "could",
    "do", "does", "for", "from", "get", "got", "had", "has", "have", "hi", "hello", "how", "i",
    "if", "im", "in", "is", "it", "its", "just", "me", "my", "need", "of", "on", "or", "please",
    "s", "should", "so", "some", "tell", "than", "that", "the", "their", "them", "there", "these",
    "this", "those", "to", "us", "want", "was", "we", "what", "whats", "which", "who", "why",
    "will", "with", "would", "you", "your",
];

/// Lowercase word tokens, stop words kept
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

/// Whether a token is a stop word
pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Fold a plural token to its singular form
pub fn singularize(token: &str) -> String {
    let len = token.len();
    if len > 4 && token.ends_with("ies") {
        return format!("{}y", &token[..len - 3]);
    }
    if len > 4
        && (token.ends_with("ches")
            || token.ends_with("shes")
            || token.ends_with("sses")
            || token.ends_with("xes"))
    {
        return token[..len - 2].to_string();
    }
    if len > 3
        && token.ends_with('s')
        && !token.ends_with("ss")
        && !token.ends_with("us")
        && !token.ends_with("is")
    {
        return token[..len - 1].to_string();
    }
    token.to_string()
}

/// Normalized search terms in order of appearance
pub fn terms(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| !is_stop_word(t))
        .map(|t| singularize(&t))
        .collect()
}

/// Distinct normalized search terms
pub fn term_set(text: &str) -> BTreeSet<String> {
    terms(text).into_iter().collect()
}

/// Whether `tokens` contains `phrase` as a contiguous token run
pub fn contains_phrase(tokens: &[String], phrase: &str) -> bool {
    let needle = tokenize(phrase);
    if needle.is_empty() || needle.len() > tokens.len() {
        return false;
    }
    tokens
        .windows(needle.len())
        .any(|window| window.iter().zip(&needle).all(|(a, b)| a == b))
}
