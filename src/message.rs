//! Message model, sender identity resolution and eligibility.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;

/// One chat message as handed to the engine. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    pub id: Option<String>,
    pub timestamp: Option<String>,
    pub sender_id: Option<String>,
    pub sender_name: Option<String>,
    /// Alternate display field (group card name).
    pub alt_name: Option<String>,
    pub text: String,
    pub reply_to: Option<String>,
    pub mentions: Vec<String>,
    pub is_bot: bool,
}

impl Message {
    pub fn sender(&self) -> Option<&str> {
        self.sender_id.as_deref().filter(|s| !s.is_empty())
    }
}

/// `sender_id -> display name`, fixed for the lifetime of a run.
#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
    names: HashMap<String, String>,
}

impl IdentityMap {
    /// The latest name differing from the raw id wins; otherwise the last
    /// alternate display name; otherwise the last seen name.
    pub fn build(messages: &[Message], cfg: &AnalysisConfig) -> Self {
        let mut seen: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut alt: HashMap<&str, &str> = HashMap::new();

        for msg in messages {
            if cfg.filter_bot_messages && msg.is_bot {
                continue;
            }
            let name = msg.sender_name.as_deref().map(str::trim).unwrap_or("");
            let alt_name = msg.alt_name.as_deref().map(str::trim).unwrap_or("");
            if cfg.is_filtered_name(name) || cfg.is_filtered_name(alt_name) {
                continue;
            }
            let Some(id) = msg.sender() else { continue };
            if !name.is_empty() {
                let names = seen.entry(id).or_default();
                if names.last() != Some(&name) {
                    names.push(name);
                }
            }
            if !alt_name.is_empty() {
                alt.insert(id, alt_name);
            }
        }

        let mut names = HashMap::new();
        for (id, history) in seen {
            let chosen = history
                .iter()
                .rev()
                .find(|n| **n != id)
                .or_else(|| alt.get(id))
                .or_else(|| history.last());
            if let Some(name) = chosen {
                names.insert(id.to_string(), name.to_string());
            }
        }
        IdentityMap { names }
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn display_name(&self, id: &str) -> String {
        self.get(id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("未知用户({id})"))
    }

    /// Whether the mapped display name of `id` hits a filtered identity.
    pub fn is_filtered(&self, id: &str, cfg: &AnalysisConfig) -> bool {
        self.get(id).is_some_and(|name| cfg.is_filtered_name(name))
    }
}

/// Bot messages and filtered senders are excluded from every stage.
pub fn is_eligible(msg: &Message, identities: &IdentityMap, cfg: &AnalysisConfig) -> bool {
    if cfg.filter_bot_messages && msg.is_bot {
        return false;
    }
    let name = msg.sender_name.as_deref().map(str::trim).unwrap_or("");
    let alt_name = msg.alt_name.as_deref().map(str::trim).unwrap_or("");
    if cfg.is_filtered_name(name) || cfg.is_filtered_name(alt_name) {
        return false;
    }
    !msg.sender().is_some_and(|id| identities.is_filtered(id, cfg))
}

/// Local hour of an ISO-8601 timestamp (or epoch seconds/milliseconds).
///
/// Naive timestamps are read as UTC. Returns `None` when unparseable.
pub fn local_hour(timestamp: &str, utc_offset_hours: i32) -> Option<u32> {
    let offset = FixedOffset::east_opt(utc_offset_hours.checked_mul(3600)?)?;
    let ts = timestamp.trim();
    let utc: DateTime<Utc> = if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        dt.with_timezone(&Utc)
    } else if let Some(naive) = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(ts, fmt).ok())
    {
        Utc.from_utc_datetime(&naive)
    } else if let Ok(epoch) = ts.parse::<i64>() {
        // 13-digit values are milliseconds
        if epoch.unsigned_abs() >= 100_000_000_000 {
            DateTime::from_timestamp_millis(epoch)?
        } else {
            DateTime::from_timestamp(epoch, 0)?
        }
    } else {
        return None;
    };
    Some(utc.with_timezone(&offset).hour())
}
