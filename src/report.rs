//! Final filtering, ranking and report assembly.

use std::collections::HashMap;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::behavior::{BehaviorStats, Metric, UserStats};
use crate::collocation::MergedWord;
use crate::config::AnalysisConfig;
use crate::corpus::Corpus;
use crate::discovery::DiscoveredWord;
use crate::single_char::SingleCharStats;
use crate::text::{
    extract_emojis, has_id_symbol_without_cjk, is_decorative, is_decorative_only,
    is_digits_only, is_id_like, is_meaningful_sample, is_numeric_or_symbolic, is_punctuation_only,
};
use crate::tokenize::WordTable;

/// Assumed observation window for the hourly-rate estimate: 30 days of 24 hours.
const ESTIMATED_HOURS: f64 = 30.0 * 24.0;
const TOP_MENTIONS: usize = 3;
const TOP_EMOJIS: usize = 3;
const PROFILE_SAMPLES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contributor {
    pub id: String,
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordDetail {
    pub word: String,
    pub freq: u64,
    pub contributors: Vec<Contributor>,
    pub samples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankEntry {
    pub id: String,
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard {
    pub metric: Metric,
    pub title: String,
    pub entries: Vec<RankEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordCount {
    pub word: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MentionTarget {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentSummary {
    pub positive_count: u64,
    pub negative_count: u64,
    pub neutral_count: u64,
    pub positive_ratio: f64,
    pub negative_ratio: f64,
    pub neutral_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileStats {
    pub message_count: u64,
    pub char_count: u64,
    pub avg_chars_per_msg: f64,
    /// Estimate against a fixed 30-day window, not the observed span.
    pub messages_per_hour: f64,
    pub emoji_count: u64,
    pub emoji_usage_rate: f64,
    pub top_emojis: Vec<String>,
    pub sentiment: SentimentSummary,
    pub top_mention_targets: Vec<MentionTarget>,
    pub message_samples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub words: Vec<WordCount>,
    pub stats: ProfileStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub chat_name: String,
    pub message_count: usize,
    pub top_words: Vec<WordDetail>,
    pub rankings: Vec<Leaderboard>,
    pub hour_distribution: [u64; 24],
    pub representative_users: Vec<UserProfile>,
    pub discovered_words: Vec<DiscoveredWord>,
    pub merged_words: Vec<MergedWord>,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Final admission of a word-table entry.
pub fn passes_final_filter(
    word: &str,
    freq: u64,
    singles: &SingleCharStats,
    cfg: &AnalysisConfig,
) -> bool {
    let len = word.chars().count();
    if len < cfg.min_word_len || len > cfg.max_word_len || freq < cfg.min_freq {
        return false;
    }
    if cfg.whitelist.contains(word) {
        return true;
    }
    if cfg.is_stopword(word) || has_id_symbol_without_cjk(word) || is_id_like(word) {
        return false;
    }
    if len == 1 && !singles.admits(word, cfg) {
        return false;
    }
    !(is_digits_only(word) || is_punctuation_only(word) || is_decorative_only(word))
}

/// Surviving words by descending frequency; equal frequencies keep table order.
pub fn top_words(
    table: &WordTable,
    singles: &SingleCharStats,
    cfg: &AnalysisConfig,
) -> Vec<(String, u64)> {
    let mut kept: Vec<(String, u64)> = table
        .iter()
        .filter(|(w, e)| passes_final_filter(w, e.frequency, singles, cfg))
        .map(|(w, e)| (w.to_string(), e.frequency))
        .collect();
    kept.sort_by(|a, b| b.1.cmp(&a.1));
    kept.truncate(cfg.top_n);
    kept
}

/// Contributors and usage samples for one word. Samples beyond
/// `sample_count` are drawn at random from the meaningful ones.
pub fn word_detail<R: Rng + ?Sized>(
    word: &str,
    freq: u64,
    table: &WordTable,
    corpus: &Corpus<'_>,
    cfg: &AnalysisConfig,
    rng: &mut R,
) -> WordDetail {
    let Some(entry) = table.get(word) else {
        return WordDetail {
            word: word.to_string(),
            freq,
            contributors: Vec::new(),
            samples: Vec::new(),
        };
    };
    let contributors = entry
        .ranked_contributors()
        .into_iter()
        .filter(|(id, _)| !corpus.is_filtered(id, cfg))
        .take(cfg.contributor_top_n)
        .map(|(id, count)| Contributor {
            id: id.to_string(),
            name: corpus.identities.display_name(id),
            count,
        })
        .collect();
    let meaningful: Vec<&String> = entry
        .samples
        .iter()
        .filter(|s| is_meaningful_sample(s))
        .collect();
    let samples = if meaningful.len() > cfg.sample_count {
        meaningful
            .choose_multiple(rng, cfg.sample_count)
            .map(|s| s.to_string())
            .collect()
    } else {
        meaningful.into_iter().cloned().collect()
    };
    WordDetail {
        word: word.to_string(),
        freq,
        contributors,
        samples,
    }
}

pub fn leaderboards(
    stats: &BehaviorStats,
    corpus: &Corpus<'_>,
    cfg: &AnalysisConfig,
) -> Vec<Leaderboard> {
    Metric::ALL
        .iter()
        .map(|&metric| Leaderboard {
            metric,
            title: metric.title().to_string(),
            entries: stats
                .ranked(metric)
                .into_iter()
                .take(cfg.rank_top_n)
                .map(|(id, value)| RankEntry {
                    id: id.to_string(),
                    name: corpus.identities.display_name(id),
                    value,
                })
                .collect(),
        })
        .collect()
}

/// Short all-caps/digit strings such as "5C" or "VXA" read as codes, not words.
fn is_shouted_code(word: &str) -> bool {
    word.chars().count() <= 5
        && word.chars().all(|c| c.is_ascii_alphanumeric())
        && !word.chars().any(|c| c.is_ascii_lowercase())
}

/// Words that can stand for a user: multi-character, with real letters or
/// ideographs. Emoji are left to the emoji statistics.
fn is_representative(word: &str, cfg: &AnalysisConfig) -> bool {
    if cfg.is_stopword(word) || word.chars().count() < 2 {
        return false;
    }
    !(is_numeric_or_symbolic(word) || is_shouted_code(word) || word.chars().all(is_decorative))
}

fn top_emojis(samples: &[String]) -> Vec<String> {
    let mut counts: Vec<(String, u64)> = Vec::new();
    for e in samples.iter().flat_map(|s| extract_emojis(s)) {
        match counts.iter_mut().find(|(seen, _)| *seen == e) {
            Some((_, n)) => *n += 1,
            None => counts.push((e, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().take(TOP_EMOJIS).map(|(e, _)| e).collect()
}

fn profile_stats(user: &UserStats, corpus: &Corpus<'_>) -> ProfileStats {
    let messages = user.message_count;
    let ratio = |n: u64, total: u64| if total > 0 { round2(n as f64 / total as f64) } else { 0.0 };
    let sentiment_total = user.positive_count + user.negative_count + user.neutral_count;
    ProfileStats {
        message_count: messages,
        char_count: user.char_count,
        avg_chars_per_msg: user.avg_chars_per_message().unwrap_or(0.0),
        messages_per_hour: round2(messages as f64 / ESTIMATED_HOURS),
        emoji_count: user.emoji_count,
        emoji_usage_rate: ratio(user.emoji_count, messages),
        top_emojis: top_emojis(&user.samples),
        sentiment: SentimentSummary {
            positive_count: user.positive_count,
            negative_count: user.negative_count,
            neutral_count: user.neutral_count,
            positive_ratio: ratio(user.positive_count, sentiment_total),
            negative_ratio: ratio(user.negative_count, sentiment_total),
            neutral_ratio: ratio(user.neutral_count, sentiment_total),
        },
        top_mention_targets: user
            .top_mention_targets(TOP_MENTIONS)
            .into_iter()
            .map(|(id, count)| MentionTarget {
                name: corpus.identities.display_name(id),
                count,
            })
            .collect(),
        message_samples: user.samples.iter().take(PROFILE_SAMPLES).cloned().collect(),
    }
}

/// Representative vocabulary of the most active senders.
pub fn representative_users(
    table: &WordTable,
    stats: &BehaviorStats,
    corpus: &Corpus<'_>,
    cfg: &AnalysisConfig,
) -> Vec<UserProfile> {
    // sender -> [(word, count)] in word-table order
    let mut per_user: HashMap<&str, Vec<(&str, u64)>> = HashMap::new();
    for (word, entry) in table.iter() {
        if !is_representative(word, cfg) {
            continue;
        }
        for (id, &count) in &entry.contributors {
            per_user.entry(id.as_str()).or_default().push((word, count));
        }
    }

    let active = stats
        .ranked(Metric::Messages)
        .into_iter()
        .map(|(id, _)| id)
        .filter(|id| !corpus.is_filtered(id, cfg))
        .take(cfg.representative_users);

    let mut profiles = Vec::new();
    for id in active {
        let Some(words) = per_user.get_mut(id) else { continue };
        words.sort_by(|a, b| b.1.cmp(&a.1));
        let picked: Vec<WordCount> = words
            .iter()
            .take(cfg.words_per_user)
            .map(|(w, c)| WordCount {
                word: w.to_string(),
                count: *c,
            })
            .collect();
        let (Some(user), false) = (stats.get(id), picked.is_empty()) else {
            continue;
        };
        profiles.push(UserProfile {
            id: id.to_string(),
            name: corpus.identities.display_name(id),
            words: picked,
            stats: profile_stats(user, corpus),
        });
    }
    profiles
}
