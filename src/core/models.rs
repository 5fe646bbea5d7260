//! Core data models for translation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider language code, always stored lowercase
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageCode(String);

impl LanguageCode {
    /// Normalize a raw code (trimmed, lowercased)
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_lowercase())
    }

    /// Normalized code
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LanguageCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for LanguageCode {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

/// Translation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRequest {
    /// Source language code as submitted
    pub source_language_code: String,
    /// Target language code as submitted
    pub target_language_code: String,
    /// Text to translate
    pub source_text: String,
    /// Caller identity, stored with history
    pub client_id: String,
    /// When the request was received
    pub request_timestamp: DateTime<Utc>,
}

impl TranslationRequest {
    /// Create a request stamped with the current time
    pub fn new(
        source_language_code: impl Into<String>,
        target_language_code: impl Into<String>,
        source_text: impl Into<String>,
    ) -> Self {
        Self {
            source_language_code: source_language_code.into(),
            target_language_code: target_language_code.into(),
            source_text: source_text.into(),
            client_id: String::new(),
            request_timestamp: Utc::now(),
        }
    }

    /// Set the caller identity
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }
}

/// Translation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    /// Translated words joined by single spaces
    pub translated_text: String,
    /// When the join finished
    pub response_timestamp: DateTime<Utc>,
}

/// One whitespace-delimited token of the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordUnit {
    /// Position in the source text
    pub index: usize,
    /// The token itself
    pub text: String,
}

/// Split text on runs of whitespace, dropping empty tokens
pub fn split_words(text: &str) -> Vec<WordUnit> {
    text.split_whitespace()
        .enumerate()
        .map(|(index, word)| WordUnit {
            index,
            text: word.to_string(),
        })
        .collect()
}

/// Characters billed for a text: summed length of its words
///
/// Length is in Unicode scalar values, so an emoji outside the BMP counts once.
pub fn count_symbols(words: &[WordUnit]) -> usize {
    words.iter().map(|w| w.text.chars().count()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_code_normalized() {
        assert_eq!(LanguageCode::new(" EN ").as_str(), "en");
        assert_eq!(LanguageCode::from("Ru"), LanguageCode::from("ru".to_string()));
    }

    #[test]
    fn test_split_words_collapses_whitespace() {
        let words = split_words("  one\t two \n\nthree  ");
        let texts: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        assert_eq!(words[2].index, 2);
    }

    #[test]
    fn test_count_symbols_ignores_whitespace() {
        assert_eq!(count_symbols(&split_words("one one one")), 9);
        assert_eq!(count_symbols(&split_words("   one    one\tone  ")), 9);
        assert_eq!(count_symbols(&split_words(" \t\n ")), 0);
    }

    #[test]
    fn test_count_symbols_counts_chars_not_bytes() {
        assert_eq!(count_symbols(&split_words("один")), 4);
    }

    #[test]
    fn test_count_symbols_counts_astral_chars_once() {
        // 4 bytes in UTF-8, a surrogate pair in UTF-16
        assert_eq!("🙂".len(), 4);
        assert_eq!("🙂".encode_utf16().count(), 2);

        assert_eq!(count_symbols(&split_words("🙂")), 1);
        assert_eq!(count_symbols(&split_words("hi 🙂🙂")), 4);
    }
}
