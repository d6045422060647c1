//! Collocation merging: adjacent token pairs that almost always occur
//! together become a single vocabulary unit.

use std::collections::HashMap;

use log::{debug, info};
use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::segment::Segmenter;
use crate::text::is_numeric_or_symbolic;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedWord {
    pub merged: String,
    pub w1: String,
    pub w2: String,
    pub count: u64,
    /// `P(w2 | w1)` over all tokens following `w1`.
    pub probability: f64,
}

#[derive(Debug, Default)]
pub struct BigramStats {
    pairs: HashMap<(String, String), u64>,
    right_totals: HashMap<String, u64>,
}

impl BigramStats {
    pub fn collect<S: AsRef<str>>(texts: &[S], segmenter: &dyn Segmenter) -> Self {
        let mut stats = BigramStats::default();
        for text in texts {
            let tokens: Vec<String> = segmenter
                .cut(text.as_ref())
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            for pair in tokens.windows(2) {
                let (w1, w2) = (&pair[0], &pair[1]);
                if is_numeric_or_symbolic(w1) || is_numeric_or_symbolic(w2) {
                    continue;
                }
                *stats.pairs.entry((w1.clone(), w2.clone())).or_insert(0) += 1;
                *stats.right_totals.entry(w1.clone()).or_insert(0) += 1;
            }
        }
        stats
    }

    pub fn count(&self, w1: &str, w2: &str) -> u64 {
        self.pairs
            .get(&(w1.to_string(), w2.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn right_total(&self, w1: &str) -> u64 {
        self.right_totals.get(w1).copied().unwrap_or(0)
    }

    /// Pairs passing the length, count and conditional-probability gates,
    /// highest count first. A merged surface reachable from several splits
    /// keeps its strongest split.
    pub fn accepted(&self, cfg: &AnalysisConfig) -> Vec<MergedWord> {
        let mut by_surface: HashMap<String, MergedWord> = HashMap::new();
        for ((w1, w2), &count) in &self.pairs {
            let merged = format!("{w1}{w2}");
            if merged.chars().count() > cfg.merge_max_len || count < cfg.merge_min_freq {
                continue;
            }
            let total = self.right_total(w1);
            if total == 0 {
                continue;
            }
            let probability = count as f64 / total as f64;
            if probability < cfg.merge_min_prob {
                continue;
            }
            let candidate = MergedWord {
                merged: merged.clone(),
                w1: w1.clone(),
                w2: w2.clone(),
                count,
                probability,
            };
            let keep_existing = by_surface
                .get(&merged)
                .is_some_and(|e| (e.count, &e.w1) >= (candidate.count, &candidate.w1));
            if !keep_existing {
                by_surface.insert(merged, candidate);
            }
        }
        let mut merges: Vec<MergedWord> = by_surface.into_values().collect();
        merges.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.merged.cmp(&b.merged)));
        merges
    }
}

/// Find strong collocations under the current vocabulary and register them,
/// weighted by how often they occur.
pub fn merge_collocations<S: AsRef<str>>(
    texts: &[S],
    segmenter: &mut dyn Segmenter,
    cfg: &AnalysisConfig,
) -> Vec<MergedWord> {
    let merges = BigramStats::collect(texts, &*segmenter).accepted(cfg);
    for m in &merges {
        let weight = (m.count as usize).saturating_mul(cfg.merge_weight_factor);
        segmenter.add_word(&m.merged, weight);
    }
    info!("collocation merge: {} pairs merged", merges.len());
    for m in merges.iter().take(10) {
        debug!(
            "  {}: {}+{} ({}x, {:.0}%)",
            m.merged,
            m.w1,
            m.w2,
            m.count,
            m.probability * 100.0
        );
    }
    merges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::MaxMatchSegmenter;

    fn corpus() -> Vec<String> {
        let mut texts = vec!["深夜".to_string(); 38];
        texts.push("深海".to_string());
        texts.push("深蓝".to_string());
        texts
    }

    fn cfg(min_freq: u64, min_prob: f64) -> AnalysisConfig {
        AnalysisConfig {
            merge_min_freq: min_freq,
            merge_min_prob: min_prob,
            merge_max_len: 4,
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn strongly_bound_pair_merges() {
        let mut seg = MaxMatchSegmenter::new();
        let merges = merge_collocations(&corpus(), &mut seg, &cfg(38, 0.95));
        assert_eq!(merges.len(), 1);
        let m = &merges[0];
        assert_eq!(m.merged, "深夜");
        assert_eq!((m.w1.as_str(), m.w2.as_str(), m.count), ("深", "夜", 38));
        assert!((m.probability - 0.95).abs() < 1e-12);
        assert_eq!(seg.cut("深夜了"), vec!["深夜", "了"]);
        assert_eq!(seg.weight("深夜"), Some(38 * 1000));
    }

    #[test]
    fn probability_or_frequency_gate_blocks_merge() {
        let seg = MaxMatchSegmenter::new();
        let stats = BigramStats::collect(&corpus(), &seg);
        assert_eq!(stats.count("深", "夜"), 38);
        assert_eq!(stats.right_total("深"), 40);
        assert!(stats.accepted(&cfg(39, 0.5)).is_empty());
        assert!(stats.accepted(&cfg(10, 0.96)).is_empty());
    }

    #[test]
    fn accepted_merges_respect_invariants() {
        let texts: Vec<String> = (0..30)
            .map(|i| format!("哈哈 {} 绝了绝了 {}", i, if i % 2 == 0 { "好" } else { "坏" }))
            .collect();
        let c = cfg(5, 0.3);
        let stats = BigramStats::collect(&texts, &MaxMatchSegmenter::new());
        for m in stats.accepted(&c) {
            assert!(m.merged.chars().count() <= c.merge_max_len);
            assert!(m.count >= c.merge_min_freq);
            assert!(m.count as f64 / stats.right_total(&m.w1) as f64 >= c.merge_min_prob);
        }
    }

    #[test]
    fn numeric_tokens_never_pair() {
        let stats = BigramStats::collect(&["买了 3 个", "6666 好"], &MaxMatchSegmenter::new());
        assert_eq!(stats.count("了", "3"), 0);
        assert_eq!(stats.count("6666", "好"), 0);
        assert_eq!(stats.right_total("6666"), 0);
    }
}
