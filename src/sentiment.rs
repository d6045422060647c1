//! Keyword-overlap sentiment: positive and negative cue words are counted
//! and the larger side wins.

use serde::Serialize;

// Repeated cues count twice.
const POSITIVE: &[&str] = &[
    "好", "棒", "赞", "厉害", "优秀", "完美", "喜欢", "爱", "开心", "高兴", "快乐", "幸福", "不错",
    "可以", "支持", "同意", "对", "正确", "nice", "good", "great", "awesome", "哈哈", "hhh", "hh",
    "233", "666", "👍", "😊", "😄", "😁", "😆", "😃", "😍", "❤", "牛逼", "666", "太棒了", "太好了",
    "真不错", "真棒", "厉害", "强", "👍",
];

const NEGATIVE: &[&str] = &[
    "不好", "差", "烂", "垃圾", "讨厌", "烦", "生气", "愤怒", "难过", "伤心", "失望", "不行",
    "不对", "错误", "坏", "糟糕", "差劲", "无语", "服了", "bad", "terrible", "😢", "😭", "😤", "😠",
    "😡", "💔", "😞", "😔", "😩", "😫", "傻逼", "sb", "垃圾", "废物", "滚", "去死", "烦死了",
    "气死了",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

fn hits(text: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|k| text.contains(*k)).count()
}

/// Ties and texts without any cue are neutral.
pub fn classify(text: &str) -> Sentiment {
    if text.trim().chars().count() < 2 {
        return Sentiment::Neutral;
    }
    let lower = text.to_lowercase();
    let pos = hits(&lower, POSITIVE);
    let neg = hits(&lower, NEGATIVE);
    match pos.cmp(&neg) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn majority_wins() {
        assert_eq!(classify("太棒了，喜欢"), Sentiment::Positive);
        assert_eq!(classify("烦死了 真无语"), Sentiment::Negative);
        assert_eq!(classify("明天开会"), Sentiment::Neutral);
        assert_eq!(classify("Good job"), Sentiment::Positive);
    }

    #[test]
    fn ties_and_short_texts_are_neutral() {
        // "好" vs "差"
        assert_eq!(classify("好差"), Sentiment::Neutral);
        assert_eq!(classify("好"), Sentiment::Neutral);
    }

    #[test]
    fn repeated_cues_outweigh_single_ones() {
        assert_eq!(classify("厉害 烂"), Sentiment::Positive);
        assert_eq!(classify("666 烂 差"), Sentiment::Neutral);
        assert_eq!(classify("垃圾 不错"), Sentiment::Negative);
    }
}
