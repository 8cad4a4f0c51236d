// Keyword tokenizer shared by global and per-cluster frequency analysis.
//
// Splits text into runs of word characters, lower-cases them and drops
// stopwords and very short tokens. Unlike the normalizer this uses the large
// general-purpose Spanish stopword list.

use std::collections::HashSet;

use crate::lexicon::Lexicon;

/// Tokens must be longer than this many chars to count as keywords.
pub const MAX_DROPPED_TOKEN_CHARS: usize = 2;

#[derive(Debug, Clone)]
pub struct KeywordTokenizer {
    stopwords: HashSet<String>,
}

impl KeywordTokenizer {
    pub fn new(stopwords: HashSet<String>) -> Self {
        Self { stopwords }
    }

    /// Tokenizer using the lexicon's keyword stopword list.
    pub fn from_lexicon(lexicon: &Lexicon) -> Self {
        Self::new(lexicon.keyword_stopwords.clone())
    }

    /// Keyword tokens of `text`, in order of appearance.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        word_runs(text)
            .map(str::to_lowercase)
            .filter(|token| {
                token.chars().count() > MAX_DROPPED_TOKEN_CHARS && !self.stopwords.contains(token)
            })
            .collect()
    }
}

/// Maximal runs of alphanumeric or underscore chars.
fn word_runs(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|run| !run.is_empty())
}
