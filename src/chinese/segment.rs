//! Word segmentation and part-of-speech tagging for Chinese text.
//!
//! The default segmenter does forward maximum matching against an embedded
//! tagged dictionary. Anything richer (a full jieba-style model) can be
//! plugged in through [`Segmenter`].

use crate::error::Result;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

/// One segmented word with its part-of-speech tag and char offset in the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub word: String,
    pub tag: String,
    pub offset: usize,
}

impl Token {
    fn new(word: impl Into<String>, tag: impl Into<String>, offset: usize) -> Self {
        Self {
            word: word.into(),
            tag: tag.into(),
            offset,
        }
    }

    pub fn is_punctuation(&self) -> bool {
        self.tag == "w"
    }
}

pub trait Segmenter: Send + Sync {
    fn segment(&self, text: &str) -> Result<Vec<Token>>;
}

struct Dictionary {
    words: HashMap<&'static str, &'static str>,
    max_len: usize,
}

static DICTIONARY: Lazy<Dictionary> = Lazy::new(|| {
    let mut words = HashMap::new();
    let mut max_len = 1;
    for line in include_str!("dict.txt").lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        if let (Some(word), Some(tag)) = (parts.next(), parts.next()) {
            max_len = max_len.max(word.chars().count());
            words.insert(word, tag);
        }
    }
    tracing::debug!("loaded {} chinese dictionary entries", words.len());
    Dictionary { words, max_len }
});

const CJK_PUNCTUATION: &str = "，。！？；：、“”‘’（）《》【】「」『』…—·～";

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || CJK_PUNCTUATION.contains(c)
}

/// Forward-maximum-matching segmenter over the embedded dictionary.
#[derive(Debug, Default, Clone, Copy)]
pub struct DictionarySegmenter;

impl DictionarySegmenter {
    pub fn new() -> Self {
        DictionarySegmenter
    }

    /// Tag for a known word, if the dictionary has it.
    fn lookup(word: &str) -> Option<&'static str> {
        DICTIONARY.words.get(word).copied()
    }
}

impl Segmenter for DictionarySegmenter {
    fn segment(&self, text: &str) -> Result<Vec<Token>> {
        let chars: Vec<char> = text.chars().collect();
        let mut tokens = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            if c.is_whitespace() {
                i += 1;
                continue;
            }

            let run = |pred: fn(&char) -> bool| chars[i..].iter().take_while(|c| pred(c)).count();

            if c.is_ascii_digit() {
                let n = run(|c| c.is_ascii_digit() || *c == '.');
                tokens.push(Token::new(chars[i..i + n].iter().collect::<String>(), "m", i));
                i += n;
                continue;
            }
            if c.is_ascii_alphabetic() {
                let n = run(|c| c.is_ascii_alphabetic());
                tokens.push(Token::new(chars[i..i + n].iter().collect::<String>(), "eng", i));
                i += n;
                continue;
            }
            if is_punctuation(c) {
                tokens.push(Token::new(c.to_string(), "w", i));
                i += 1;
                continue;
            }

            let longest = DICTIONARY.max_len.min(chars.len() - i);
            let matched = (1..=longest).rev().find_map(|len| {
                let candidate: String = chars[i..i + len].iter().collect();
                Self::lookup(&candidate).map(|tag| (candidate, tag, len))
            });
            match matched {
                Some((word, tag, len)) => {
                    tokens.push(Token::new(word, tag, i));
                    i += len;
                }
                None => {
                    tokens.push(Token::new(c.to_string(), "x", i));
                    i += 1;
                }
            }
        }

        tracing::debug!("segmented {} chars into {} tokens", chars.len(), tokens.len());
        Ok(tokens)
    }
}
