//! Analysis configuration.
//!
//! Every threshold the mining stages honor lives in [`AnalysisConfig`]. The
//! struct is deserialized from JSON with missing keys falling back to
//! [`Default`], then checked by [`AnalysisConfig::validate`]. It is never
//! mutated while a run is in progress.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Grammatical particles, pronouns and fillers that never count as topical words.
const DEFAULT_FUNCTION_WORDS: &[&str] = &[
    "的", "了", "是", "在", "我", "你", "他", "她", "它", "们", "这", "那", "就", "也", "都",
    "和", "与", "及", "而", "或", "吗", "呢", "吧", "啊", "呀", "哦", "嗯", "哈", "么", "着",
    "过", "被", "把", "给", "让", "对", "从", "到", "向", "很", "还", "又", "再", "才", "只",
    "一个", "这个", "那个", "什么", "怎么", "为什么", "我们", "你们", "他们", "她们", "自己",
    "就是", "但是", "因为", "所以", "如果", "然后", "还是", "可能", "已经", "没有", "不是",
    "现在", "时候", "感觉", "知道", "觉得", "这样", "那样", "一下", "一样", "有点",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub min_word_len: usize,
    pub max_word_len: usize,
    pub min_freq: u64,
    pub top_n: usize,
    pub sample_count: usize,
    pub contributor_top_n: usize,
    pub rank_top_n: usize,

    pub new_word_min_freq: u64,
    pub entropy_threshold: f64,
    pub pmi_threshold: f64,
    pub new_word_weight: usize,

    pub merge_max_len: usize,
    pub merge_min_freq: u64,
    pub merge_min_prob: f64,
    pub merge_weight_factor: usize,

    pub single_min_solo_ratio: f64,
    pub single_min_solo_count: f64,

    pub night_owl_hours: BTreeSet<u32>,
    pub early_bird_hours: BTreeSet<u32>,
    /// Offset applied to parsed timestamps before the local hour is taken.
    pub utc_offset_hours: i32,
    /// Shortest cleaned text (in characters) that counts as a repeat.
    pub repeat_min_len: usize,

    pub whitelist: HashSet<String>,
    pub blacklist: HashSet<String>,
    pub function_words: HashSet<String>,
    pub word_alias_map: HashMap<String, String>,
    /// Substrings matched against display names; a hit drops the sender.
    pub filtered_identities: Vec<String>,
    pub filter_bot_messages: bool,

    pub representative_users: usize,
    pub words_per_user: usize,

    /// Dictionary files (`word [freq] [tag]` per line) loaded before any stage.
    /// Unreadable files are skipped with a warning.
    pub custom_dict_files: Vec<PathBuf>,
    /// Vocabulary seeded before any mining stage runs.
    pub custom_words: Vec<String>,
    /// Chat-name keyword -> words seeded when the chat name contains the keyword.
    pub chat_name_words: HashMap<String, Vec<String>>,
    /// Seed for sample down-selection. `None` draws from entropy.
    pub sample_seed: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            min_word_len: 1,
            max_word_len: 10,
            min_freq: 2,
            top_n: 200,
            sample_count: 10,
            contributor_top_n: 10,
            rank_top_n: 15,
            new_word_min_freq: 20,
            entropy_threshold: 2.0,
            pmi_threshold: 3.0,
            new_word_weight: 1000,
            merge_max_len: 4,
            merge_min_freq: 30,
            merge_min_prob: 0.3,
            merge_weight_factor: 1000,
            single_min_solo_ratio: 0.1,
            single_min_solo_count: 5.0,
            night_owl_hours: (0..=5).collect(),
            early_bird_hours: (6..=8).collect(),
            utc_offset_hours: 8,
            repeat_min_len: 2,
            whitelist: HashSet::new(),
            blacklist: HashSet::new(),
            function_words: DEFAULT_FUNCTION_WORDS
                .iter()
                .map(|w| w.to_string())
                .collect(),
            word_alias_map: HashMap::new(),
            filtered_identities: Vec::new(),
            filter_bot_messages: true,
            representative_users: 10,
            words_per_user: 5,
            custom_dict_files: Vec::new(),
            custom_words: Vec::new(),
            chat_name_words: HashMap::new(),
            sample_seed: None,
        }
    }
}

impl AnalysisConfig {
    /// Load a JSON config file. Keys absent from the file keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let cfg: AnalysisConfig = serde_json::from_str(&raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_word_len > self.max_word_len {
            return Err(AnalysisError::Config(format!(
                "min_word_len ({}) exceeds max_word_len ({})",
                self.min_word_len, self.max_word_len
            )));
        }
        if let Some(h) = self
            .night_owl_hours
            .iter()
            .chain(self.early_bird_hours.iter())
            .find(|h| **h > 23)
        {
            return Err(AnalysisError::Config(format!("hour {h} is out of range 0..=23")));
        }
        if let Some(h) = self.night_owl_hours.intersection(&self.early_bird_hours).next() {
            return Err(AnalysisError::Config(format!(
                "hour {h} is both a night-owl and an early-bird hour"
            )));
        }
        if !(0.0..=1.0).contains(&self.merge_min_prob) {
            return Err(AnalysisError::Config(format!(
                "merge_min_prob must be within [0, 1], got {}",
                self.merge_min_prob
            )));
        }
        if !(0.0..=1.0).contains(&self.single_min_solo_ratio) {
            return Err(AnalysisError::Config(format!(
                "single_min_solo_ratio must be within [0, 1], got {}",
                self.single_min_solo_ratio
            )));
        }
        if !(-12..=14).contains(&self.utc_offset_hours) {
            return Err(AnalysisError::Config(format!(
                "utc_offset_hours out of range: {}",
                self.utc_offset_hours
            )));
        }
        Ok(())
    }

    pub fn is_stopword(&self, word: &str) -> bool {
        self.blacklist.contains(word) || self.function_words.contains(word)
    }

    /// Canonical form of a token under the alias table.
    pub fn canonical<'a>(&'a self, word: &'a str) -> &'a str {
        self.word_alias_map
            .get(word)
            .map(String::as_str)
            .unwrap_or(word)
    }

    pub fn is_filtered_name(&self, name: &str) -> bool {
        !name.is_empty() && self.filtered_identities.iter().any(|f| name.contains(f.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn overlapping_hours_rejected() {
        let mut cfg = AnalysisConfig::default();
        cfg.early_bird_hours.insert(5);
        assert!(matches!(cfg.validate(), Err(AnalysisError::Config(_))));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: AnalysisConfig = serde_json::from_str(
            r#"{"top_n": 5, "blacklist": ["草"], "custom_dict_files": ["dict/梗.txt"]}"#,
        )
        .unwrap();
        assert_eq!(cfg.top_n, 5);
        assert_eq!(cfg.custom_dict_files, vec![PathBuf::from("dict/梗.txt")]);
        assert!(cfg.blacklist.contains("草"));
        assert_eq!(cfg.merge_max_len, AnalysisConfig::default().merge_max_len);
    }

    #[test]
    fn alias_canonicalization() {
        let mut cfg = AnalysisConfig::default();
        cfg.word_alias_map
            .insert("hhh".to_string(), "哈哈".to_string());
        assert_eq!(cfg.canonical("hhh"), "哈哈");
        assert_eq!(cfg.canonical("草"), "草");
    }
}
