//! Single-character independence: how often a lone CJK/Latin character is
//! used as a word on its own rather than as part of a longer word.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::text::{is_boundary, is_cjk_or_latin, is_emoji};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SingleCharStat {
    pub total: u64,
    /// `solo + 0.5 * boundary`
    pub independence: f64,
    pub ratio: f64,
}

#[derive(Debug, Default)]
struct CharCounts {
    total: HashMap<char, u64>,
    solo: HashMap<char, u64>,
    boundary: HashMap<char, u64>,
}

impl CharCounts {
    fn add_text(mut self, text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let mut tracked = chars.iter().copied().filter(|c| is_cjk_or_latin(*c));
        if let (Some(only), None) = (tracked.next(), tracked.next()) {
            *self.solo.entry(only).or_insert(0) += 1;
        }
        for (i, &c) in chars.iter().enumerate() {
            if !is_cjk_or_latin(c) {
                continue;
            }
            *self.total.entry(c).or_insert(0) += 1;
            let left_ok = i == 0 || is_boundary(chars[i - 1]);
            let right_ok = i + 1 == chars.len() || is_boundary(chars[i + 1]);
            if left_ok && right_ok {
                *self.boundary.entry(c).or_insert(0) += 1;
            }
        }
        self
    }

    fn merge(mut self, other: CharCounts) -> Self {
        for (dst, src) in [
            (&mut self.total, other.total),
            (&mut self.solo, other.solo),
            (&mut self.boundary, other.boundary),
        ] {
            for (c, n) in src {
                *dst.entry(c).or_insert(0) += n;
            }
        }
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct SingleCharStats {
    stats: HashMap<char, SingleCharStat>,
}

impl SingleCharStats {
    /// Count over the cleaned corpus. Shards are summed, so the result does
    /// not depend on how rayon splits the input.
    pub fn analyze<S: AsRef<str> + Sync>(texts: &[S]) -> Self {
        let counts = texts
            .par_iter()
            .fold(CharCounts::default, |acc, t| acc.add_text(t.as_ref()))
            .reduce(CharCounts::default, CharCounts::merge);

        let stats = counts
            .total
            .iter()
            .map(|(&c, &total)| {
                let solo = counts.solo.get(&c).copied().unwrap_or(0) as f64;
                let boundary = counts.boundary.get(&c).copied().unwrap_or(0) as f64;
                let independence = solo + 0.5 * boundary;
                let ratio = if total > 0 { independence / total as f64 } else { 0.0 };
                (
                    c,
                    SingleCharStat {
                        total,
                        independence,
                        ratio,
                    },
                )
            })
            .collect();
        SingleCharStats { stats }
    }

    pub fn get(&self, c: char) -> Option<&SingleCharStat> {
        self.stats.get(&c)
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Admission rule for one-character words. Emoji always pass; other
    /// characters need enough independent uses, both absolutely and relatively.
    pub fn admits(&self, word: &str, cfg: &AnalysisConfig) -> bool {
        if is_emoji(word) {
            return true;
        }
        let mut chars = word.chars();
        let (Some(c), None) = (chars.next(), chars.next()) else {
            return false;
        };
        self.get(c).is_some_and(|s| {
            s.ratio >= cfg.single_min_solo_ratio && s.independence >= cfg.single_min_solo_count
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solo_and_boundary_counts() {
        let stats = SingleCharStats::analyze(&["草", "草，好的", "草率", "a b"]);
        let cao = stats.get('草').unwrap();
        // 3 occurrences: one solo message (both boundaries), one boundary, one inside a word
        assert_eq!(cao.total, 3);
        assert!((cao.independence - (1.0 + 0.5 * 2.0)).abs() < 1e-12);
        assert!((cao.ratio - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(stats.get('a').unwrap().independence, 0.5);
    }

    #[test]
    fn frequent_but_dependent_char_is_rejected() {
        let cfg = AnalysisConfig {
            single_min_solo_ratio: 0.1,
            single_min_solo_count: 5.0,
            ..AnalysisConfig::default()
        };
        // 的 occurs 1000 times but only inside longer runs
        let mut texts = vec!["我的书".to_string(); 1000];
        // 草 occurs 1000 times, 200 of them alone
        texts.extend(vec!["草".to_string(); 200]);
        texts.extend(vec!["草莓".to_string(); 800]);
        let stats = SingleCharStats::analyze(&texts);
        assert_eq!(stats.get('的').unwrap().total, 1000);
        assert_eq!(stats.get('草').unwrap().total, 1000);
        assert!(!stats.admits("的", &cfg));
        assert!(stats.admits("草", &cfg));
    }

    #[test]
    fn emoji_bypasses_and_unknown_rejected() {
        let stats = SingleCharStats::analyze::<&str>(&[]);
        let cfg = AnalysisConfig::default();
        assert!(stats.is_empty());
        assert!(stats.admits("😂", &cfg));
        assert!(!stats.admits("好", &cfg));
        assert!(!stats.admits("好的", &cfg));
    }
}
