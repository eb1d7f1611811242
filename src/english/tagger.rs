//! Part-of-speech tagging with Penn Treebank tags.

use super::lexicon::Lexicon;
use crate::error::Result;
use std::sync::Arc;

pub trait Tagger: Send + Sync {
    /// One `(word, tag)` pair per input word, in order.
    fn tag(&self, words: &[&str]) -> Result<Vec<(String, String)>>;
}

pub fn is_noun(tag: &str) -> bool {
    matches!(tag, "NN" | "NNS" | "NNP" | "NNPS")
}

pub fn is_verb(tag: &str) -> bool {
    tag.starts_with("VB") || tag == "MD"
}

/// Verb tag carried by a contraction's clitic, as in `it's`, `we're` or `I'll`.
/// `n't` forms are verbs in their own right and return `None`.
pub fn clitic_verb(word: &str) -> Option<&'static str> {
    let word = word.to_lowercase().replace('\u{2019}', "'");
    let (_, clitic) = word.split_once('\'')?;
    match clitic {
        "s" => Some("VBZ"),
        "re" | "m" | "ve" => Some("VBP"),
        "ll" | "d" => Some("MD"),
        _ => None,
    }
}

/// Lexicon lookup, suffix guesses for unknown words, then contextual repairs.
pub struct LexiconTagger {
    lexicon: Arc<Lexicon>,
}

impl LexiconTagger {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }

    fn guess(word: &str) -> &'static str {
        let lower = word.to_lowercase();
        if word.chars().any(|c| c.is_ascii_digit()) {
            "CD"
        } else if lower.ends_with("ing") && lower.len() > 4 {
            "VBG"
        } else if lower.ends_with("ed") && lower.len() > 3 {
            "VBD"
        } else if lower.ends_with("ly") && lower.len() > 3 {
            "RB"
        } else if lower.ends_with('s') && !lower.ends_with("ss") && lower.len() > 3 {
            "NNS"
        } else if word.chars().next().is_some_and(char::is_uppercase) {
            "NNP"
        } else {
            "NN"
        }
    }

    fn initial(&self, word: &str) -> String {
        self.lexicon
            .primary_tag(word)
            .unwrap_or_else(|| Self::guess(word))
            .to_string()
    }
}

impl Tagger for LexiconTagger {
    fn tag(&self, words: &[&str]) -> Result<Vec<(String, String)>> {
        let mut tags: Vec<String> = words.iter().map(|w| self.initial(w)).collect();

        for i in 1..tags.len() {
            let prev = tags[i - 1].as_str();
            let word = words[i];
            if (prev == "DT" || prev == "PRP$") && tags[i].starts_with("VB") {
                // "the play", "my walk"
                tags[i] = "NN".to_string();
            } else if (prev == "TO" || prev == "MD")
                && is_noun(&tags[i])
                && self.lexicon.has_tag(word, "VB")
            {
                // "to book", "can walk"
                tags[i] = "VB".to_string();
            }
        }

        Ok(words
            .iter()
            .zip(tags)
            .map(|(w, t)| (w.to_string(), t))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        LexiconTagger::new(Lexicon::base())
            .tag(&words)
            .unwrap()
            .into_iter()
            .map(|(_, t)| t)
            .collect()
    }

    #[test]
    fn test_known_words_use_lexicon() {
        assert_eq!(tags("The boy reads a book"), ["DT", "NN", "VBZ", "DT", "NN"]);
        assert_eq!(tags("He are happy"), ["PRP", "VBP", "JJ"]);
    }

    #[test]
    fn test_unknown_words_use_suffix_rules() {
        assert_eq!(
            tags("42 zorping blorped snarkly flumps Zed wug"),
            ["CD", "VBG", "VBD", "RB", "NNS", "NNP", "NN"]
        );
    }

    #[test]
    fn test_clitic_verbs() {
        assert_eq!(clitic_verb("It's"), Some("VBZ"));
        assert_eq!(clitic_verb("we\u{2019}re"), Some("VBP"));
        assert_eq!(clitic_verb("I'll"), Some("MD"));
        assert_eq!(clitic_verb("don't"), None);
        assert_eq!(clitic_verb("boy"), None);
    }

    #[test]
    fn test_context_repairs() {
        // play is VB first in the lexicon
        assert_eq!(tags("the play"), ["DT", "NN"]);
        assert_eq!(tags("I want to walk"), ["PRP", "VB", "TO", "VB"]);
        assert_eq!(tags("we can run"), ["PRP", "MD", "VB"]);
    }
}
