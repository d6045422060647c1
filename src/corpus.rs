//! The eligible, cleaned view of a transcript that every stage reads.

use std::collections::HashMap;

use log::info;
use rayon::prelude::*;

use crate::config::AnalysisConfig;
use crate::message::{IdentityMap, Message, is_eligible};
use crate::text::{RawSignals, clean_text};

#[derive(Debug, Clone)]
pub struct CleanedMessage<'a> {
    pub message: &'a Message,
    pub cleaned: String,
    pub signals: RawSignals,
}

impl CleanedMessage<'_> {
    pub fn sender(&self) -> Option<&str> {
        self.message.sender()
    }
}

#[derive(Debug)]
pub struct Corpus<'a> {
    pub identities: IdentityMap,
    /// Eligible messages in transcript order.
    pub messages: Vec<CleanedMessage<'a>>,
    /// `message id -> sender id`; a duplicated id keeps its latest sender.
    pub reply_index: HashMap<String, String>,
}

impl<'a> Corpus<'a> {
    pub fn build(messages: &'a [Message], cfg: &AnalysisConfig) -> Self {
        let identities = IdentityMap::build(messages, cfg);
        let eligible: Vec<&Message> = messages
            .iter()
            .filter(|m| is_eligible(m, &identities, cfg))
            .collect();

        let mut reply_index = HashMap::new();
        for m in &eligible {
            if let (Some(id), Some(sender)) = (m.id.as_deref(), m.sender()) {
                reply_index.insert(id.to_string(), sender.to_string());
            }
        }

        // cleaning is per-message and order-preserving
        let cleaned: Vec<CleanedMessage<'a>> = eligible
            .par_iter()
            .map(|m| CleanedMessage {
                message: *m,
                cleaned: clean_text(&m.text),
                signals: RawSignals::from_raw(&m.text),
            })
            .collect();

        info!(
            "corpus: {} messages, {} eligible, {} with text after cleaning",
            messages.len(),
            cleaned.len(),
            cleaned.iter().filter(|m| !m.cleaned.is_empty()).count()
        );

        Corpus {
            identities,
            messages: cleaned,
            reply_index,
        }
    }

    /// Non-empty cleaned texts, the input of the vocabulary miners.
    pub fn texts(&self) -> Vec<&str> {
        self.messages
            .iter()
            .map(|m| m.cleaned.as_str())
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn is_filtered(&self, id: &str, cfg: &AnalysisConfig) -> bool {
        self.identities.is_filtered(id, cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: &str, sender: &str, text: &str) -> Message {
        Message {
            id: Some(id.to_string()),
            sender_id: Some(sender.to_string()),
            sender_name: Some(format!("name-{sender}")),
            text: text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn bots_dropped_and_order_kept() {
        let mut bot = msg("2", "b", "我是机器人");
        bot.is_bot = true;
        let msgs = vec![msg("1", "a", "你好呀"), bot, msg("3", "c", "[图片: x.png]")];
        let corpus = Corpus::build(&msgs, &AnalysisConfig::default());
        assert_eq!(corpus.messages.len(), 2);
        assert_eq!(corpus.messages[0].cleaned, "你好呀");
        assert!(corpus.messages[1].signals.has_image);
        assert_eq!(corpus.texts(), vec!["你好呀"]);
        assert!(!corpus.reply_index.contains_key("2"));
    }

    #[test]
    fn duplicate_ids_latest_sender_wins() {
        let msgs = vec![msg("9", "a", "一"), msg("9", "b", "二")];
        let corpus = Corpus::build(&msgs, &AnalysisConfig::default());
        assert_eq!(corpus.reply_index.get("9").map(String::as_str), Some("b"));
    }
}
