//! # Chat Analysis
//!
//! Vocabulary mining and per-user behavior statistics for CJK group-chat
//! transcripts.
//!
//! A run is a fixed sequence of stages over one transcript:
//!
//! 1. cleaning and eligibility ([`corpus`]) plus the single-character
//!    independence statistic ([`single_char`]),
//! 2. new-word discovery by adjacent entropy and PMI ([`discovery`]),
//! 3. collocation merging ([`collocation`]),
//! 4. tokenize and aggregate into the word table ([`tokenize`]),
//! 5. behavioral counters ([`behavior`]),
//! 6. final filtering and ranking ([`report`]).
//!
//! Stages 2 and 3 grow the segmenter vocabulary that stage 4 cuts with, so
//! the order is fixed and the segmenter is threaded through by reference.
//!
//! ## Example
//! ```
//! use chat_analysis::{AnalysisConfig, MaxMatchSegmenter, Message, analyze_with};
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let messages = vec![Message {
//!     sender_id: Some("42".into()),
//!     sender_name: Some("Alice".into()),
//!     text: "今天吃火锅".into(),
//!     ..Default::default()
//! }];
//! let mut seg = MaxMatchSegmenter::with_words(["火锅"]);
//! let report = analyze_with(
//!     &messages,
//!     "饭搭子",
//!     &mut seg,
//!     &AnalysisConfig::default(),
//!     &mut StdRng::seed_from_u64(1),
//! );
//! assert_eq!(report.message_count, 1);
//! ```

pub mod behavior;
pub mod collocation;
pub mod config;
pub mod corpus;
pub mod discovery;
pub mod error;
pub mod export;
pub mod message;
pub mod report;
pub mod segment;
pub mod sentiment;
pub mod single_char;
pub mod text;
pub mod tokenize;
pub mod transcript;

use std::fs::File;
use std::io::BufReader;

use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::behavior::aggregate;
use crate::collocation::merge_collocations;
use crate::corpus::Corpus;
use crate::discovery::discover_new_words;
use crate::report::{leaderboards, representative_users, top_words, word_detail};
use crate::single_char::SingleCharStats;
use crate::tokenize::tokenize_and_count;

pub use crate::config::AnalysisConfig;
pub use crate::error::{AnalysisError, Result};
pub use crate::export::{ExportFormat, csv_safe_cell, export_report};
pub use crate::message::Message;
pub use crate::report::AnalysisReport;
pub use crate::segment::{JiebaSegmenter, MaxMatchSegmenter, Segmenter};
pub use crate::transcript::{Transcript, load_transcript};

/// Weight of vocabulary configured by the user.
const CUSTOM_WORD_WEIGHT: usize = 1000;
/// Weight of words seeded from the chat name, above anything mined.
const CHAT_NAME_WORD_WEIGHT: usize = 2000;

/// Insert configured vocabulary before any mining stage: dictionary files
/// first, then custom words, then chat-name words. Returns the number of
/// words added.
pub fn seed_vocabulary(
    segmenter: &mut dyn Segmenter,
    chat_name: &str,
    cfg: &AnalysisConfig,
) -> usize {
    let mut added = 0;
    for path in &cfg.custom_dict_files {
        let loaded = File::open(path)
            .map_err(AnalysisError::from)
            .and_then(|f| segmenter.load_dict(&mut BufReader::new(f)));
        match loaded {
            Ok(n) => {
                info!("loaded {n} entries from dictionary {}", path.display());
                added += n;
            }
            Err(e) => warn!("skipping dictionary {}: {e}", path.display()),
        }
    }
    for word in cfg.custom_words.iter().filter(|w| !w.trim().is_empty()) {
        segmenter.add_word(word.trim(), CUSTOM_WORD_WEIGHT);
        added += 1;
    }
    for (keyword, words) in &cfg.chat_name_words {
        if keyword.is_empty() || !chat_name.contains(keyword.as_str()) {
            continue;
        }
        for word in words.iter().filter(|w| !w.trim().is_empty()) {
            segmenter.add_word(word.trim(), CHAT_NAME_WORD_WEIGHT);
            info!("chat name \"{chat_name}\" seeds word {word}");
            added += 1;
        }
    }
    added
}

/// Run every stage against the given segmenter and random source.
///
/// The segmenter's vocabulary is grown in place by discovery and merging.
/// The random source only drives sample down-selection.
pub fn analyze_with<R: Rng + ?Sized>(
    messages: &[Message],
    chat_name: &str,
    segmenter: &mut dyn Segmenter,
    cfg: &AnalysisConfig,
    rng: &mut R,
) -> AnalysisReport {
    info!("analyzing \"{chat_name}\": {} messages", messages.len());
    seed_vocabulary(segmenter, chat_name, cfg);

    let corpus = Corpus::build(messages, cfg);
    if corpus.messages.is_empty() {
        info!("no eligible messages, nothing to mine");
        return AnalysisReport {
            chat_name: chat_name.to_string(),
            message_count: messages.len(),
            top_words: Vec::new(),
            rankings: Vec::new(),
            hour_distribution: [0; 24],
            representative_users: Vec::new(),
            discovered_words: Vec::new(),
            merged_words: Vec::new(),
        };
    }

    let texts = corpus.texts();
    let singles = SingleCharStats::analyze(&texts);
    let discovered_words = discover_new_words(&texts, segmenter, cfg);
    let merged_words = merge_collocations(&texts, segmenter, cfg);
    let table = tokenize_and_count(&corpus.messages, &*segmenter, cfg);
    let stats = aggregate(&corpus.messages, &corpus.reply_index, cfg);

    let top = top_words(&table, &singles, cfg);
    info!(
        "word table: {} entries, {} after filtering",
        table.len(),
        top.len()
    );
    let top_words = top
        .iter()
        .map(|(word, freq)| word_detail(word, *freq, &table, &corpus, cfg, &mut *rng))
        .collect();

    AnalysisReport {
        chat_name: chat_name.to_string(),
        message_count: messages.len(),
        top_words,
        rankings: leaderboards(&stats, &corpus, cfg),
        hour_distribution: stats.hour_distribution,
        representative_users: representative_users(&table, &stats, &corpus, cfg),
        discovered_words,
        merged_words,
    }
}

/// Analyze with a fresh jieba segmenter. Samples are drawn from
/// `cfg.sample_seed` when set, otherwise from entropy.
pub fn analyze(messages: &[Message], chat_name: &str, cfg: &AnalysisConfig) -> AnalysisReport {
    let mut segmenter = JiebaSegmenter::default();
    let mut rng = match cfg.sample_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    analyze_with(messages, chat_name, &mut segmenter, cfg, &mut rng)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(sender: &str, text: &str) -> Message {
        Message {
            sender_id: Some(sender.to_string()),
            sender_name: Some(format!("用户{sender}")),
            text: text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn empty_transcript_yields_empty_report() {
        let mut seg = MaxMatchSegmenter::new();
        let report = analyze_with(
            &[],
            "空群",
            &mut seg,
            &AnalysisConfig::default(),
            &mut StdRng::seed_from_u64(0),
        );
        assert_eq!(report.message_count, 0);
        assert!(report.top_words.is_empty());
        assert!(report.rankings.is_empty());
        assert_eq!(report.hour_distribution, [0; 24]);
    }

    #[test]
    fn chat_name_words_seed_only_on_match() {
        let mut cfg = AnalysisConfig::default();
        cfg.custom_words.push("摸鱼".to_string());
        cfg.chat_name_words
            .insert("原神".to_string(), vec!["启动".to_string()]);
        cfg.chat_name_words
            .insert("星铁".to_string(), vec!["开拓".to_string()]);

        let mut seg = MaxMatchSegmenter::new();
        assert_eq!(seed_vocabulary(&mut seg, "原神交流群", &cfg), 2);
        assert_eq!(seg.weight("摸鱼"), Some(CUSTOM_WORD_WEIGHT));
        assert_eq!(seg.weight("启动"), Some(CHAT_NAME_WORD_WEIGHT));
        assert_eq!(seg.weight("开拓"), None);
    }

    #[test]
    fn dictionary_files_seed_and_missing_ones_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let dict = dir.path().join("梗.txt");
        std::fs::write(&dict, "芜湖起飞 300 n\n绝绝子\n").unwrap();

        let mut cfg = AnalysisConfig::default();
        cfg.custom_dict_files = vec![dir.path().join("missing.txt"), dict];
        cfg.custom_words.push("绝绝子".to_string());

        let mut seg = MaxMatchSegmenter::new();
        assert_eq!(seed_vocabulary(&mut seg, "群", &cfg), 3);
        assert_eq!(seg.weight("芜湖起飞"), Some(300));
        // custom words load after dictionaries and keep the higher weight
        assert_eq!(seg.weight("绝绝子"), Some(CUSTOM_WORD_WEIGHT));
    }

    #[test]
    fn malformed_dictionary_keeps_earlier_entries() {
        let dir = tempfile::tempdir().unwrap();
        let dict = dir.path().join("dict.txt");
        std::fs::write(&dict, "摸鱼 5\n划水 lots\n").unwrap();
        let mut cfg = AnalysisConfig::default();
        cfg.custom_dict_files.push(dict);

        let mut seg = MaxMatchSegmenter::new();
        assert_eq!(seed_vocabulary(&mut seg, "群", &cfg), 0);
        assert_eq!(seg.weight("摸鱼"), Some(5));
        assert_eq!(seg.weight("划水"), None);
    }

    #[test]
    fn seeded_analyze_is_reproducible() {
        let mut cfg = AnalysisConfig::default();
        cfg.sample_seed = Some(7);
        cfg.sample_count = 2;
        let msgs: Vec<Message> = (0..12)
            .map(|i| msg(&format!("u{}", i % 3), &format!("今天火锅真好吃 第{i}次")))
            .collect();

        let first = analyze(&msgs, "饭搭子", &cfg);
        let second = analyze(&msgs, "饭搭子", &cfg);
        assert_eq!(first.message_count, 12);
        assert!(!first.top_words.is_empty());
        assert_eq!(first, second);
        assert!(first.top_words.iter().all(|w| w.samples.len() <= 2));
    }

    #[test]
    fn seeded_words_reach_the_word_table() {
        let mut cfg = AnalysisConfig::default();
        cfg.custom_words.push("摸鱼".to_string());
        let msgs: Vec<Message> = (0..3).map(|_| msg("a", "摸鱼摸鱼")).collect();
        let mut seg = MaxMatchSegmenter::new();
        let report = analyze_with(&msgs, "群", &mut seg, &cfg, &mut StdRng::seed_from_u64(0));
        let moyu = report
            .top_words
            .iter()
            .find(|w| w.word == "摸鱼")
            .expect("seeded word counted");
        assert_eq!(moyu.freq, 6);
        assert_eq!(moyu.contributors[0].name, "用户a");
        assert_eq!(report.rankings.len(), 14);
    }
}
