//! Segment every eligible message with the final vocabulary, screen each
//! token, and accumulate frequency, contributors and usage samples.

use std::collections::HashMap;

use log::info;

use crate::config::AnalysisConfig;
use crate::corpus::CleanedMessage;
use crate::segment::Segmenter;
use crate::text::{
    extract_emojis, is_decorative_only, is_emoji, is_id_like, is_meaningful_sample,
    is_numeric_or_symbolic,
};

/// Why a token was kept out of the word table. Checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    Mention,
    NumericOrSymbolic,
    IdLike,
    Decorative,
    Blacklisted,
    FunctionWord,
}

/// Token admission chain; the first failing check decides.
pub fn screen_token(token: &str, cfg: &AnalysisConfig) -> Result<(), Rejection> {
    if token.trim().is_empty() {
        return Err(Rejection::Empty);
    }
    if token.contains('@') {
        return Err(Rejection::Mention);
    }
    if is_numeric_or_symbolic(token) && !is_emoji(token) {
        return Err(Rejection::NumericOrSymbolic);
    }
    if is_id_like(token) {
        return Err(Rejection::IdLike);
    }
    if is_decorative_only(token) {
        return Err(Rejection::Decorative);
    }
    if cfg.blacklist.contains(token) {
        return Err(Rejection::Blacklisted);
    }
    if cfg.function_words.contains(token) {
        return Err(Rejection::FunctionWord);
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WordEntry {
    pub frequency: u64,
    pub contributors: HashMap<String, u64>,
    pub samples: Vec<String>,
}

impl WordEntry {
    /// Contributors by descending count, ties by sender id.
    pub fn ranked_contributors(&self) -> Vec<(&str, u64)> {
        let mut ranked: Vec<(&str, u64)> = self
            .contributors
            .iter()
            .map(|(id, n)| (id.as_str(), *n))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }
}

/// Canonical word -> entry, remembering first-insertion order.
#[derive(Debug, Clone, Default)]
pub struct WordTable {
    entries: HashMap<String, WordEntry>,
    order: Vec<String>,
}

impl WordTable {
    pub fn record(&mut self, word: &str, sender: &str, sample: Option<&str>, sample_cap: usize) {
        if !self.entries.contains_key(word) {
            self.order.push(word.to_string());
        }
        let entry = self.entries.entry(word.to_string()).or_default();
        entry.frequency += 1;
        *entry.contributors.entry(sender.to_string()).or_insert(0) += 1;
        if let Some(s) = sample {
            if entry.samples.len() < sample_cap {
                entry.samples.push(s.to_string());
            }
        }
    }

    pub fn get(&self, word: &str) -> Option<&WordEntry> {
        self.entries.get(word)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &WordEntry)> {
        self.order
            .iter()
            .filter_map(|w| self.entries.get(w).map(|e| (w.as_str(), e)))
    }
}

/// Word tokens (emoji removed) followed by the emoji glyphs of the text.
pub fn message_tokens(cleaned: &str, segmenter: &dyn Segmenter) -> Vec<String> {
    let mut tokens: Vec<String> = segmenter
        .cut(cleaned)
        .into_iter()
        .filter(|t| !is_emoji(t))
        .collect();
    tokens.extend(extract_emojis(cleaned));
    tokens
}

/// The tokenize-and-aggregate pass. Messages without a sender are skipped so
/// that every counted occurrence has a contributor.
pub fn tokenize_and_count(
    messages: &[CleanedMessage<'_>],
    segmenter: &dyn Segmenter,
    cfg: &AnalysisConfig,
) -> WordTable {
    let sample_cap = cfg.sample_count * 3;
    let mut table = WordTable::default();
    let mut rejected = 0usize;

    for m in messages {
        let Some(sender) = m.sender() else { continue };
        if m.cleaned.is_empty() {
            continue;
        }
        // the predicate is per message, evaluate it once
        let sample = is_meaningful_sample(&m.cleaned).then_some(m.cleaned.as_str());
        for token in message_tokens(&m.cleaned, segmenter) {
            let token = token.trim();
            if screen_token(token, cfg).is_err() {
                rejected += 1;
                continue;
            }
            table.record(cfg.canonical(token), sender, sample, sample_cap);
        }
    }

    info!(
        "tokenize: {} distinct words, {} tokens rejected by the filter chain",
        table.len(),
        rejected
    );
    table
}
