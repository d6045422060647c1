//! Word segmentation backends.
//!
//! The miners only rely on [`Segmenter`]: `cut` must be deterministic for a
//! given vocabulary state, and words added through `add_word` must be
//! visible to every later `cut`. Stages that grow the vocabulary take
//! `&mut dyn Segmenter`; stages that only read it take `&dyn Segmenter`.

use std::collections::HashMap;
use std::io::BufRead;
use std::num::ParseIntError;

use jieba_rs::Jieba;

use crate::error::{AnalysisError, Result};

/// Weight of dictionary entries that carry no frequency.
pub const DEFAULT_DICT_WEIGHT: usize = 1;

pub trait Segmenter {
    fn cut(&self, text: &str) -> Vec<String>;

    /// Insert or boost a vocabulary entry so later cuts keep it whole.
    fn add_word(&mut self, word: &str, weight: usize);

    /// Load a user dictionary with one `word [freq] [tag]` entry per line.
    /// Returns the number of entries read.
    ///
    /// Entries without a frequency get [`DEFAULT_DICT_WEIGHT`]. A malformed
    /// frequency stops the load; entries before it stay added.
    fn load_dict(&mut self, dict: &mut dyn BufRead) -> Result<usize> {
        read_dict(dict, |e| {
            self.add_word(e.word, e.freq.unwrap_or(DEFAULT_DICT_WEIGHT))
        })
    }
}

/// One line of a user dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictEntry<'a> {
    pub word: &'a str,
    pub freq: Option<usize>,
    pub tag: Option<&'a str>,
}

impl<'a> DictEntry<'a> {
    /// `Ok(None)` for blank lines.
    pub fn parse(line: &'a str) -> std::result::Result<Option<Self>, ParseIntError> {
        let mut parts = line.trim_start_matches('\u{feff}').split_whitespace();
        let Some(word) = parts.next() else {
            return Ok(None);
        };
        let freq = parts.next().map(str::parse::<usize>).transpose()?;
        Ok(Some(DictEntry {
            word,
            freq,
            tag: parts.next(),
        }))
    }
}

fn read_dict(dict: &mut dyn BufRead, mut add: impl FnMut(DictEntry<'_>)) -> Result<usize> {
    let mut buf = String::new();
    let mut line_no = 0;
    let mut count = 0;
    while dict.read_line(&mut buf)? > 0 {
        line_no += 1;
        let entry = DictEntry::parse(&buf).map_err(|e| {
            AnalysisError::Dictionary(format!("line {line_no} `{}`: {e}", buf.trim_end()))
        })?;
        if let Some(entry) = entry {
            add(entry);
            count += 1;
        }
        buf.clear();
    }
    Ok(count)
}

/// Dictionary + HMM segmentation via `jieba-rs`, shipped with its default dictionary.
pub struct JiebaSegmenter {
    jieba: Jieba,
    hmm: bool,
}

impl JiebaSegmenter {
    pub fn new(hmm: bool) -> Self {
        JiebaSegmenter {
            jieba: Jieba::new(),
            hmm,
        }
    }
}

impl Default for JiebaSegmenter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Segmenter for JiebaSegmenter {
    fn cut(&self, text: &str) -> Vec<String> {
        self.jieba
            .cut(text, self.hmm)
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn add_word(&mut self, word: &str, weight: usize) {
        self.jieba.add_word(word, Some(weight), None);
    }

    /// Entries without a frequency get jieba's suggested frequency, and tags are kept.
    fn load_dict(&mut self, dict: &mut dyn BufRead) -> Result<usize> {
        read_dict(dict, |e| {
            self.jieba.add_word(e.word, e.freq, e.tag);
        })
    }
}

/// Forward maximum matching over an in-memory vocabulary.
///
/// ASCII letter/digit runs and whitespace runs come out whole; CJK text takes
/// the longest vocabulary entry starting at each position and falls back to
/// single characters. Entries with weight 0 are ignored.
#[derive(Debug, Clone, Default)]
pub struct MaxMatchSegmenter {
    vocab: HashMap<String, usize>,
    max_len: usize,
}

impl MaxMatchSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seg = Self::new();
        for w in words {
            seg.add_word(w.as_ref(), 1);
        }
        seg
    }

    pub fn weight(&self, word: &str) -> Option<usize> {
        self.vocab.get(word).copied()
    }

    fn longest_match(&self, chars: &[char], start: usize) -> usize {
        let upper = self.max_len.min(chars.len() - start);
        (2..=upper)
            .rev()
            .find(|&n| {
                let cand: String = chars[start..start + n].iter().collect();
                self.vocab.get(&cand).is_some_and(|w| *w > 0)
            })
            .unwrap_or(1)
    }
}

impl Segmenter for MaxMatchSegmenter {
    fn cut(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut tokens = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            let run = |pred: fn(&char) -> bool| chars[i..].iter().take_while(|c| pred(*c)).count();
            let n = if c.is_ascii_alphanumeric() {
                run(char::is_ascii_alphanumeric)
            } else if c.is_whitespace() {
                run(|c| c.is_whitespace())
            } else {
                self.longest_match(&chars, i)
            };
            tokens.push(chars[i..i + n].iter().collect());
            i += n;
        }
        tokens
    }

    fn add_word(&mut self, word: &str, weight: usize) {
        let len = word.chars().count();
        if len == 0 {
            return;
        }
        self.max_len = self.max_len.max(len);
        let entry = self.vocab.entry(word.to_string()).or_insert(0);
        *entry = (*entry).max(weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_match_prefers_longest_entry() {
        let seg = MaxMatchSegmenter::with_words(["深夜", "深夜食堂"]);
        assert_eq!(seg.cut("去深夜食堂吃"), vec!["去", "深夜食堂", "吃"]);
        assert_eq!(seg.cut("深夜了"), vec!["深夜", "了"]);
    }

    #[test]
    fn max_match_keeps_latin_runs() {
        let seg = MaxMatchSegmenter::new();
        assert_eq!(seg.cut("打cs2 ok"), vec!["打", "cs2", " ", "ok"]);
    }

    #[test]
    fn added_words_are_visible_to_later_cuts() {
        let mut seg = MaxMatchSegmenter::new();
        assert_eq!(seg.cut("绝绝子"), vec!["绝", "绝", "子"]);
        seg.add_word("绝绝子", 1000);
        assert_eq!(seg.cut("绝绝子"), vec!["绝绝子"]);
        assert_eq!(seg.weight("绝绝子"), Some(1000));
    }

    #[test]
    fn dict_lines_split_into_word_freq_tag() {
        assert_eq!(
            DictEntry::parse("芜湖起飞 300 n\n").unwrap(),
            Some(DictEntry {
                word: "芜湖起飞",
                freq: Some(300),
                tag: Some("n"),
            })
        );
        assert_eq!(
            DictEntry::parse("\u{feff}绝绝子").unwrap().map(|e| (e.word, e.freq)),
            Some(("绝绝子", None))
        );
        assert_eq!(DictEntry::parse("  \n").unwrap(), None);
        assert!(DictEntry::parse("绝绝子 many").is_err());
    }

    #[test]
    fn max_match_loads_dict_entries() {
        let mut seg = MaxMatchSegmenter::new();
        let mut dict = "芜湖起飞 300 n\n\n绝绝子\n".as_bytes();
        assert_eq!(seg.load_dict(&mut dict).unwrap(), 2);
        assert_eq!(seg.weight("芜湖起飞"), Some(300));
        assert_eq!(seg.weight("绝绝子"), Some(DEFAULT_DICT_WEIGHT));
        assert_eq!(seg.cut("绝绝子芜湖起飞"), vec!["绝绝子", "芜湖起飞"]);
    }

    #[test]
    fn bad_frequency_names_the_line() {
        let mut seg = MaxMatchSegmenter::new();
        let mut dict = "摸鱼 5\n划水 lots\n".as_bytes();
        let err = seg.load_dict(&mut dict).unwrap_err();
        assert!(matches!(
            &err,
            AnalysisError::Dictionary(m) if m.starts_with("line 2 `划水 lots`")
        ));
        assert_eq!(seg.weight("摸鱼"), Some(5));
    }

    #[test]
    fn jieba_dict_words_stay_whole() {
        let mut seg = JiebaSegmenter::new(false);
        let mut dict = "芜湖起飞 100000\n".as_bytes();
        assert_eq!(seg.load_dict(&mut dict).unwrap(), 1);
        assert!(seg.cut("今天芜湖起飞了").contains(&"芜湖起飞".to_string()));
    }

    #[test]
    fn jieba_add_word_keeps_unit() {
        let mut seg = JiebaSegmenter::new(false);
        seg.add_word("芜湖起飞", 100_000);
        assert!(seg.cut("今天芜湖起飞了").contains(&"芜湖起飞".to_string()));
    }
}
