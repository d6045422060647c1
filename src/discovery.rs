//! Unsupervised discovery of words missing from the segmentation vocabulary.
//!
//! Every 2..=5 character substring of every clause is a candidate. A
//! candidate is accepted when it is frequent, its left and right neighbor
//! distributions are both diverse (adjacent entropy), and it is internally
//! cohesive (minimum PMI over its split points).

use std::collections::HashMap;

use log::info;
use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::segment::Segmenter;
use crate::text::{is_ascii_alphabetic_word, is_numeric_or_symbolic};

const MAX_NGRAM: usize = 5;
const PMI_EPSILON: f64 = 1e-10;

const CLAUSE_DELIMITERS: &str = "，。！？、；：“”‘’（）,.!?()\"'";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Neighbor {
    Begin,
    End,
    Char(char),
}

#[derive(Debug, Default)]
struct NgramCandidate {
    freq: u64,
    left: HashMap<Neighbor, u64>,
    right: HashMap<Neighbor, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveredWord {
    pub word: String,
    pub freq: u64,
    pub left_entropy: f64,
    pub right_entropy: f64,
    pub min_pmi: f64,
}

/// Shannon entropy (bits) of a count distribution. Empty distributions have entropy 0.
pub fn entropy<I: IntoIterator<Item = u64>>(counts: I) -> f64 {
    let counts: Vec<u64> = counts.into_iter().filter(|c| *c > 0).collect();
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}

fn split_clauses(text: &str) -> impl Iterator<Item = Vec<char>> + '_ {
    text.split(|c: char| c.is_whitespace() || CLAUSE_DELIMITERS.contains(c))
        .map(|clause| clause.chars().collect::<Vec<char>>())
        .filter(|chars| chars.len() >= 2)
}

/// Corpus-wide n-gram statistics gathered in one pass over the cleaned texts.
#[derive(Debug, Default)]
pub struct NgramStats {
    candidates: HashMap<String, NgramCandidate>,
    total_chars: u64,
}

impl NgramStats {
    pub fn collect<S: AsRef<str>>(texts: &[S]) -> Self {
        let mut stats = NgramStats::default();
        for text in texts {
            for clause in split_clauses(text.as_ref()) {
                stats.total_chars += clause.len() as u64;
                stats.add_clause(&clause);
            }
        }
        stats
    }

    fn add_clause(&mut self, clause: &[char]) {
        let len = clause.len();
        for n in 2..=MAX_NGRAM.min(len) {
            for i in 0..=len - n {
                let ngram: String = clause[i..i + n].iter().collect();
                if is_numeric_or_symbolic(&ngram) || is_ascii_alphabetic_word(&ngram) {
                    continue;
                }
                let left = if i > 0 {
                    Neighbor::Char(clause[i - 1])
                } else {
                    Neighbor::Begin
                };
                let right = if i + n < len {
                    Neighbor::Char(clause[i + n])
                } else {
                    Neighbor::End
                };
                let cand = self.candidates.entry(ngram).or_default();
                cand.freq += 1;
                *cand.left.entry(left).or_insert(0) += 1;
                *cand.right.entry(right).or_insert(0) += 1;
            }
        }
    }

    pub fn freq(&self, ngram: &str) -> u64 {
        self.candidates.get(ngram).map_or(0, |c| c.freq)
    }

    pub fn total_chars(&self) -> u64 {
        self.total_chars
    }

    /// Minimum PMI over the split points whose halves were both observed.
    ///
    /// Unobserved halves are skipped; when no split point qualifies the
    /// result is 0.
    pub fn min_pmi(&self, word: &str) -> f64 {
        let freq = self.freq(word) as f64;
        let total = self.total_chars as f64;
        let boundaries: Vec<usize> = word.char_indices().map(|(i, _)| i).skip(1).collect();
        boundaries
            .into_iter()
            .filter_map(|b| {
                let lf = self.freq(&word[..b]);
                let rf = self.freq(&word[b..]);
                (lf > 0 && rf > 0)
                    .then(|| (freq * total / ((lf * rf) as f64 + PMI_EPSILON)).log2())
            })
            .reduce(f64::min)
            .unwrap_or(0.0)
    }

    fn evaluate(
        &self,
        word: &str,
        cand: &NgramCandidate,
        cfg: &AnalysisConfig,
    ) -> Option<DiscoveredWord> {
        if cand.freq < cfg.new_word_min_freq {
            return None;
        }
        let left_entropy = entropy(cand.left.values().copied());
        let right_entropy = entropy(cand.right.values().copied());
        if left_entropy.min(right_entropy) < cfg.entropy_threshold {
            return None;
        }
        let min_pmi = self.min_pmi(word);
        if min_pmi < cfg.pmi_threshold {
            return None;
        }
        Some(DiscoveredWord {
            word: word.to_string(),
            freq: cand.freq,
            left_entropy,
            right_entropy,
            min_pmi,
        })
    }

    /// Accepted candidates, most frequent first (ties by word).
    pub fn discover(&self, cfg: &AnalysisConfig) -> Vec<DiscoveredWord> {
        let mut found: Vec<DiscoveredWord> = self
            .candidates
            .iter()
            .filter_map(|(word, cand)| self.evaluate(word, cand, cfg))
            .collect();
        found.sort_by(|a, b| b.freq.cmp(&a.freq).then_with(|| a.word.cmp(&b.word)));
        found
    }
}

/// Mine the corpus and register every discovered word with the segmenter.
pub fn discover_new_words<S: AsRef<str>>(
    texts: &[S],
    segmenter: &mut dyn Segmenter,
    cfg: &AnalysisConfig,
) -> Vec<DiscoveredWord> {
    let stats = NgramStats::collect(texts);
    let found = stats.discover(cfg);
    for w in &found {
        segmenter.add_word(&w.word, cfg.new_word_weight);
    }
    info!(
        "new-word discovery: {} candidates over {} clause chars, {} accepted",
        stats.candidates.len(),
        stats.total_chars,
        found.len()
    );
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::MaxMatchSegmenter;

    fn cfg() -> AnalysisConfig {
        AnalysisConfig {
            new_word_min_freq: 10,
            entropy_threshold: 1.5,
            pmi_threshold: 0.0,
            ..AnalysisConfig::default()
        }
    }

    /// "芜湖" surrounded by many different characters, plus a fixed phrase
    /// "甲乙丙丁戊" that always appears with the same padding.
    fn corpus() -> Vec<String> {
        let lefts = ["我", "你", "他", "说", "看", "去", "来", "听", "想", "要"];
        let rights = ["啊", "吧", "呢", "哦", "嘛", "了", "的", "呀", "哇", "耶"];
        let mut texts = Vec::new();
        for i in 0..50 {
            texts.push(format!("{}芜湖{}", lefts[i % 10], rights[(i * 3 + i / 10) % 10]));
            texts.push("子甲乙丙丁戊己".to_string());
        }
        texts
    }

    #[test]
    fn entropy_basics() {
        assert_eq!(entropy(Vec::<u64>::new()), 0.0);
        assert_eq!(entropy([7]), 0.0);
        assert!((entropy([1, 1]) - 1.0).abs() < 1e-12);
        assert!((entropy([1, 1, 1, 1]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn free_word_discovered_and_fixed_fragment_rejected() {
        let stats = NgramStats::collect(&corpus());
        let found = stats.discover(&cfg());
        let words: Vec<&str> = found.iter().map(|w| w.word.as_str()).collect();
        assert!(words.contains(&"芜湖"), "{words:?}");
        // 50 occurrences, but neighbors are always 子 / 己
        assert_eq!(stats.freq("甲乙丙"), 50);
        assert!(!words.iter().any(|w| w.contains('甲')));
    }

    #[test]
    fn accepted_words_respect_thresholds() {
        let c = cfg();
        for w in NgramStats::collect(&corpus()).discover(&c) {
            assert!(w.freq >= c.new_word_min_freq);
            assert!(w.left_entropy.min(w.right_entropy) >= c.entropy_threshold);
            assert!(w.min_pmi >= c.pmi_threshold);
        }
    }

    #[test]
    fn numeric_and_latin_candidates_are_skipped() {
        let stats = NgramStats::collect(&["abc 123", "ab12"]);
        assert_eq!(stats.freq("ab"), 0);
        assert_eq!(stats.freq("12"), 0);
        assert_eq!(stats.freq("b1"), 1);
    }

    #[test]
    fn pmi_defaults_to_zero_when_halves_unobserved() {
        let stats = NgramStats::collect(&["好耶"]);
        assert_eq!(stats.min_pmi("好耶"), 0.0);
        // every split of "好耶好" leaves a single (never counted) character
        let stats = NgramStats::collect(&["好耶好耶"]);
        assert_eq!(stats.min_pmi("好耶好"), 0.0);
    }

    #[test]
    fn pmi_uses_observed_splits_only() {
        let stats = NgramStats::collect(&["甲乙丙丁"]);
        // only 甲乙|丙丁 is observed on both sides: log2(1 * 4 / (1 * 1))
        assert!((stats.min_pmi("甲乙丙丁") - 2.0).abs() < 1e-6);
    }

    #[test]
    fn discovered_words_reach_the_segmenter() {
        let mut seg = MaxMatchSegmenter::new();
        let found = discover_new_words(&corpus(), &mut seg, &cfg());
        assert!(!found.is_empty());
        assert_eq!(seg.cut("我芜湖啊"), vec!["我", "芜湖", "啊"]);
    }

    #[test]
    fn empty_corpus_discovers_nothing() {
        let mut seg = MaxMatchSegmenter::new();
        assert!(discover_new_words::<&str>(&[], &mut seg, &cfg()).is_empty());
    }
}
