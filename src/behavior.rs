//! Per-user behavioral counters, gathered in one pass over the eligible
//! messages in transcript order.

use std::collections::HashMap;

use log::info;
use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::corpus::CleanedMessage;
use crate::message::local_hour;
use crate::sentiment::{Sentiment, classify};
use crate::text::{extract_emojis, is_meaningful_sample};

const MAX_USER_SAMPLES: usize = 10;
const SAMPLE_MIN_CHARS: usize = 10;
const SAMPLE_MAX_CHARS: usize = 100;
/// Averages over fewer messages are too noisy to rank.
const MIN_MESSAGES_FOR_AVERAGE: u64 = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserStats {
    pub message_count: u64,
    pub char_count: u64,
    pub image_count: u64,
    pub forward_count: u64,
    pub reply_count: u64,
    pub replied_count: u64,
    pub mention_given: u64,
    pub mention_received: u64,
    pub emoji_count: u64,
    pub link_count: u64,
    pub night_count: u64,
    pub morning_count: u64,
    pub repeat_count: u64,
    pub positive_count: u64,
    pub negative_count: u64,
    pub neutral_count: u64,
    pub mention_targets: HashMap<String, u64>,
    pub samples: Vec<String>,
}

impl UserStats {
    pub fn avg_chars_per_message(&self) -> Option<f64> {
        (self.message_count >= MIN_MESSAGES_FOR_AVERAGE)
            .then(|| self.char_count as f64 / self.message_count as f64)
    }

    fn tally(&mut self, sentiment: Sentiment) {
        match sentiment {
            Sentiment::Positive => self.positive_count += 1,
            Sentiment::Negative => self.negative_count += 1,
            Sentiment::Neutral => self.neutral_count += 1,
        }
    }

    /// Mention targets by descending count, ties by id.
    pub fn top_mention_targets(&self, n: usize) -> Vec<(&str, u64)> {
        let mut targets: Vec<(&str, u64)> = self
            .mention_targets
            .iter()
            .map(|(id, c)| (id.as_str(), *c))
            .collect();
        targets.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        targets.truncate(n);
        targets
    }
}

/// Every behavioral counter a leaderboard can rank by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Messages,
    Characters,
    AverageLength,
    Images,
    Forwards,
    Replies,
    Replied,
    MentionsGiven,
    MentionsReceived,
    Emoji,
    Links,
    NightOwl,
    EarlyBird,
    Repeats,
}

impl Metric {
    pub const ALL: [Metric; 14] = [
        Metric::Messages,
        Metric::Characters,
        Metric::AverageLength,
        Metric::Images,
        Metric::Forwards,
        Metric::Replies,
        Metric::Replied,
        Metric::MentionsGiven,
        Metric::MentionsReceived,
        Metric::Emoji,
        Metric::Links,
        Metric::NightOwl,
        Metric::EarlyBird,
        Metric::Repeats,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Metric::Messages => "话痨榜",
            Metric::Characters => "字数榜",
            Metric::AverageLength => "长文王",
            Metric::Images => "图片狂魔",
            Metric::Forwards => "合并转发王",
            Metric::Replies => "回复狂",
            Metric::Replied => "被回复最多",
            Metric::MentionsGiven => "艾特狂",
            Metric::MentionsReceived => "被艾特最多",
            Metric::Emoji => "表情帝",
            Metric::Links => "链接分享王",
            Metric::NightOwl => "深夜党",
            Metric::EarlyBird => "早起鸟",
            Metric::Repeats => "复读机",
        }
    }

    /// `None` means the user has no value for this metric (and is not ranked).
    pub fn value(self, s: &UserStats) -> Option<f64> {
        let count = match self {
            Metric::AverageLength => return s.avg_chars_per_message(),
            Metric::Messages => s.message_count,
            Metric::Characters => s.char_count,
            Metric::Images => s.image_count,
            Metric::Forwards => s.forward_count,
            Metric::Replies => s.reply_count,
            Metric::Replied => s.replied_count,
            Metric::MentionsGiven => s.mention_given,
            Metric::MentionsReceived => s.mention_received,
            Metric::Emoji => s.emoji_count,
            Metric::Links => s.link_count,
            Metric::NightOwl => s.night_count,
            Metric::EarlyBird => s.morning_count,
            Metric::Repeats => s.repeat_count,
        };
        (count > 0).then_some(count as f64)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BehaviorStats {
    users: HashMap<String, UserStats>,
    /// First-appearance order, used to break ranking ties.
    order: Vec<String>,
    pub hour_distribution: [u64; 24],
}

impl BehaviorStats {
    fn user_mut(&mut self, id: &str) -> &mut UserStats {
        if !self.users.contains_key(id) {
            self.order.push(id.to_string());
        }
        self.users.entry(id.to_string()).or_default()
    }

    pub fn get(&self, id: &str) -> Option<&UserStats> {
        self.users.get(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UserStats)> {
        self.order
            .iter()
            .filter_map(|id| self.users.get(id).map(|s| (id.as_str(), s)))
    }

    /// Users with a value for `metric`, highest first, ties in first-appearance order.
    pub fn ranked(&self, metric: Metric) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self
            .iter()
            .filter_map(|(id, s)| metric.value(s).map(|v| (id, v)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

/// The single linear pass over eligible messages.
pub fn aggregate(
    messages: &[CleanedMessage<'_>],
    reply_index: &HashMap<String, String>,
    cfg: &AnalysisConfig,
) -> BehaviorStats {
    let mut stats = BehaviorStats::default();
    let mut prev_clean: Option<&str> = None;
    let mut prev_sender: Option<&str> = None;

    for m in messages {
        let Some(sender) = m.sender() else { continue };
        let clean = m.cleaned.as_str();
        let clean_len = clean.chars().count();

        let user = stats.user_mut(sender);
        user.message_count += 1;
        user.char_count += clean_len as u64;
        if m.signals.has_image {
            user.image_count += 1;
        }
        if m.signals.has_forward {
            user.forward_count += 1;
        }
        if m.signals.has_link {
            user.link_count += 1;
        }
        user.emoji_count += (extract_emojis(clean).len() + m.signals.sticker_count) as u64;

        let mentions: Vec<&str> = m
            .message
            .mentions
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty() && *t != "0")
            .collect();
        user.mention_given += mentions.len() as u64;
        for target in &mentions {
            *user.mention_targets.entry(target.to_string()).or_insert(0) += 1;
        }

        // a sender repeating their own text does not count
        if clean_len >= cfg.repeat_min_len
            && prev_clean == Some(clean)
            && prev_sender != Some(sender)
        {
            user.repeat_count += 1;
        }

        if clean_len >= 2 {
            user.tally(classify(clean));
            if user.samples.len() < MAX_USER_SAMPLES
                && (SAMPLE_MIN_CHARS..=SAMPLE_MAX_CHARS).contains(&clean_len)
                && is_meaningful_sample(clean)
            {
                user.samples.push(clean.to_string());
            }
        }

        let hour = m
            .message
            .timestamp
            .as_deref()
            .and_then(|ts| local_hour(ts, cfg.utc_offset_hours));
        if let Some(hour) = hour {
            if cfg.night_owl_hours.contains(&hour) {
                user.night_count += 1;
            }
            if cfg.early_bird_hours.contains(&hour) {
                user.morning_count += 1;
            }
            stats.hour_distribution[hour as usize] += 1;
        }

        if let Some(reply_to) = m.message.reply_to.as_deref() {
            stats.user_mut(sender).reply_count += 1;
            if let Some(target) = reply_index.get(reply_to) {
                stats.user_mut(target).replied_count += 1;
            }
        }
        for target in mentions {
            stats.user_mut(target).mention_received += 1;
        }

        if !clean.is_empty() {
            prev_clean = Some(clean);
        }
        prev_sender = Some(sender);
    }

    info!(
        "behavior: {} users, {} hour-stamped messages",
        stats.len(),
        stats.hour_distribution.iter().sum::<u64>()
    );
    stats
}
