//! Word list with part-of-speech tags, used both as the spelling dictionary
//! and as the tagger's first lookup.

use crate::error::Result;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

static BASE: Lazy<Arc<Lexicon>> = Lazy::new(|| {
    let mut lexicon = Lexicon::empty();
    lexicon.extend_from_str(include_str!("lexicon.txt"));
    tracing::debug!("loaded {} english lexicon entries", lexicon.len());
    Arc::new(lexicon)
});

/// Lowercased, with typographic apostrophes folded to ASCII.
fn key(word: &str) -> String {
    word.to_lowercase().replace('\u{2019}', "'")
}

#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    /// Lowercased word -> tags, most likely first. Empty when the word list gave none.
    tags: HashMap<String, Vec<String>>,
    /// Insertion order; ties in spelling suggestions follow it
    order: Vec<String>,
}

impl Lexicon {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The embedded base lexicon, shared.
    pub fn base() -> Arc<Lexicon> {
        Arc::clone(&BASE)
    }

    /// Base lexicon plus an optional user word list.
    pub fn load(extra: Option<&Path>) -> Result<Arc<Lexicon>> {
        let Some(path) = extra else {
            return Ok(Self::base());
        };
        let content = std::fs::read_to_string(path)?;
        let mut lexicon = Lexicon::clone(&BASE);
        let before = lexicon.len();
        lexicon.extend_from_str(&content);
        tracing::info!(
            "added {} words from {}",
            lexicon.len() - before,
            path.display()
        );
        Ok(Arc::new(lexicon))
    }

    /// One entry per line: `word [TAG...]`. Blank lines and `#` comments are skipped.
    /// Tags for an already known word are appended.
    pub fn extend_from_str(&mut self, content: &str) {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else { continue };
            let word = key(word);
            let new_tags: Vec<String> = parts.map(str::to_string).collect();
            match self.tags.get_mut(&word) {
                Some(tags) => {
                    for tag in new_tags {
                        if !tags.contains(&tag) {
                            tags.push(tag);
                        }
                    }
                }
                None => {
                    self.order.push(word.clone());
                    self.tags.insert(word, new_tags);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.tags.contains_key(&key(word))
    }

    pub fn tags(&self, word: &str) -> Option<&[String]> {
        self.tags.get(&key(word)).map(Vec::as_slice)
    }

    /// Most likely tag, if the word is known and tagged.
    pub fn primary_tag(&self, word: &str) -> Option<&str> {
        self.tags(word)
            .and_then(|tags| tags.first())
            .map(String::as_str)
    }

    pub fn has_tag(&self, word: &str, tag: &str) -> bool {
        self.tags(word).is_some_and(|tags| tags.iter().any(|t| t == tag))
    }

    /// Up to `limit` known words within `max_distance` edits of `word`,
    /// closest first, ties in lexicon order.
    pub fn suggest(&self, word: &str, max_distance: usize, limit: usize) -> Vec<String> {
        let word = key(word);
        let mut scored: Vec<(usize, usize, &String)> = self
            .order
            .iter()
            .enumerate()
            .filter(|(_, candidate)| {
                candidate.chars().count().abs_diff(word.chars().count()) <= max_distance
            })
            .map(|(i, candidate)| (strsim::levenshtein(&word, candidate), i, candidate))
            .filter(|(distance, _, _)| *distance <= max_distance)
            .collect();
        scored.sort_by_key(|(distance, i, _)| (*distance, *i));
        scored
            .into_iter()
            .take(limit)
            .map(|(_, _, candidate)| candidate.clone())
            .collect()
    }
}
