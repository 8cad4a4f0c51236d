// Keyword frequency rankings, globally or per cluster.
//
// Counts are accumulated across all texts of a group (not per text). Ranking
// is by descending count; equal counts keep the order in which the words were
// first seen, which makes the output stable for identical inputs.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::text::tokenize::KeywordTokenizer;

/// Group key used for rankings over the whole corpus.
pub const GLOBAL_GROUP: &str = "global";

/// One row of a keyword ranking table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordFrequency {
    /// `"global"` or a cluster label such as `C3`
    #[serde(rename = "cluster")]
    pub group: String,
    #[serde(rename = "palabra")]
    pub word: String,
    #[serde(rename = "frecuencia")]
    pub count: usize,
}

/// Word counter that remembers first-insertion order.
#[derive(Debug, Default)]
struct OrderedCounter {
    index: HashMap<String, usize>,
    counts: Vec<(String, usize)>,
}

impl OrderedCounter {
    fn add(&mut self, word: String) {
        match self.index.get(&word) {
            Some(&i) => self.counts[i].1 += 1,
            None => {
                self.index.insert(word.clone(), self.counts.len());
                self.counts.push((word, 1));
            }
        }
    }

    /// Top `n` words by count. `sort_by` is stable, so ties stay in
    /// first-insertion order.
    fn most_common(mut self, n: usize) -> Vec<(String, usize)> {
        self.counts.sort_by(|a, b| b.1.cmp(&a.1));
        self.counts.truncate(n);
        self.counts
    }
}

/// Computes keyword rankings with a configured tokenizer.
#[derive(Debug, Clone)]
pub struct FrequencyAnalyzer {
    tokenizer: KeywordTokenizer,
}

impl FrequencyAnalyzer {
    pub fn new(tokenizer: KeywordTokenizer) -> Self {
        Self { tokenizer }
    }

    pub fn tokenizer(&self) -> &KeywordTokenizer {
        &self.tokenizer
    }

    /// The `top_n` most frequent keywords across all `texts`.
    ///
    /// Empty input (or `top_n == 0`) yields an empty ranking.
    pub fn top_keywords<S: AsRef<str>>(&self, texts: &[S], top_n: usize) -> Vec<(String, usize)> {
        let mut counter = OrderedCounter::default();
        for text in texts {
            for token in self.tokenizer.tokenize(text.as_ref()) {
                counter.add(token);
            }
        }
        counter.most_common(top_n)
    }

    /// Global ranking as table rows keyed by `"global"`.
    pub fn global_keywords<S: AsRef<str>>(
        &self,
        texts: &[S],
        top_n: usize,
    ) -> Vec<KeywordFrequency> {
        self.top_keywords(texts, top_n)
            .into_iter()
            .map(|(word, count)| KeywordFrequency {
                group: GLOBAL_GROUP.to_string(),
                word,
                count,
            })
            .collect()
    }

    /// One ranking per group, concatenated in ascending (lexicographic)
    /// group order. Input is `(group, text)` pairs in record order.
    pub fn top_keywords_by_group<'a, I>(&self, rows: I, top_n: usize) -> Vec<KeywordFrequency>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (group, text) in rows {
            groups.entry(group).or_default().push(text);
        }

        let mut table = Vec::new();
        for (group, texts) in groups {
            for (word, count) in self.top_keywords(&texts, top_n) {
                table.push(KeywordFrequency {
                    group: group.to_string(),
                    word,
                    count,
                });
            }
        }
        table
    }
}
