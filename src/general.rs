//! Subject-agnostic fallback: repeated words and unterminated sentences.

use crate::aggregate::{self, GeneralPolicy, SuggestionEntry, SuggestionTable};
use crate::analyzer::{AnalyzerOutput, SubjectAnalyzer};
use crate::error::Result;
use crate::types::{Finding, FindingKind, Subject, Suggestion};
use once_cell::sync::Lazy;
use regex::Regex;

const TERMINATORS: &[char] = &['.', '!', '?', '。', '！', '？'];

static SENTENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:[0-9]\.[0-9]|[^.!?。！？])+[.!?。！？]*").expect("sentence regex")
});

pub static GENERAL_SUGGESTIONS: SuggestionTable = SuggestionTable {
    bucket: aggregate::by_sub_kind,
    entries: &[
        SuggestionEntry {
            bucket: "repetition",
            kind: "grammar",
            message: "Read each sentence back to catch repeated words",
        },
        SuggestionEntry {
            bucket: "incomplete",
            kind: "structure",
            message: "Finish every sentence and end it with a punctuation mark",
        },
    ],
    fallback: "Check the marked sentences carefully",
    general: "Keep practising to consolidate what you have learned",
    general_policy: GeneralPolicy::Always,
    show_share: false,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct GeneralAnalyzer;

impl GeneralAnalyzer {
    pub fn new() -> Self {
        GeneralAnalyzer
    }
}

/// Sentences with their terminators, paired with their char offset.
fn sentences(text: &str) -> Vec<(usize, &str)> {
    SENTENCE_RE
        .find_iter(text)
        .filter_map(|m| {
            let s = m.as_str();
            let trimmed = s.trim_start();
            let start = m.start() + (s.len() - trimmed.len());
            let trimmed = trimmed.trim_end();
            (!trimmed.is_empty()).then(|| (text[..start].chars().count(), trimmed))
        })
        .collect()
}

fn normalize(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase()
}

/// Repeated words in first-seen order, and the sentence with later copies dropped.
fn deduplicate(sentence: &str) -> (Vec<String>, String) {
    let body = sentence.trim_end_matches(TERMINATORS);
    let ending = &sentence[body.len()..];

    let mut seen: Vec<String> = Vec::new();
    let mut repeated: Vec<String> = Vec::new();
    let mut kept: Vec<&str> = Vec::new();
    for word in body.split_whitespace() {
        let key = normalize(word);
        if key.is_empty() {
            kept.push(word);
            continue;
        }
        if seen.contains(&key) {
            if !repeated.contains(&key) {
                repeated.push(key);
            }
            continue;
        }
        seen.push(key);
        kept.push(word);
    }
    (repeated, format!("{}{}", kept.join(" "), ending))
}

fn check_sentence(position: usize, sentence: &str) -> Vec<Finding> {
    let mut findings = Vec::new();

    let (repeated, fixed) = deduplicate(sentence);
    if !repeated.is_empty() {
        findings.push(
            Finding::new(
                FindingKind::Grammar,
                sentence,
                format!("Repeated words: {}", repeated.join(", ")),
            )
            .with_sub_kind("repetition")
            .with_correction(fixed)
            .at(position),
        );
    }

    if !sentence.ends_with(TERMINATORS) {
        findings.push(
            Finding::new(
                FindingKind::Structure,
                sentence,
                "Incomplete sentence: it does not end with terminal punctuation",
            )
            .with_sub_kind("incomplete")
            .at(position),
        );
    }
    findings
}

impl SubjectAnalyzer for GeneralAnalyzer {
    fn subject(&self) -> Subject {
        Subject::General
    }

    fn suggestion_table(&self) -> &'static SuggestionTable {
        &GENERAL_SUGGESTIONS
    }

    fn analyze(&self, text: &str) -> Result<AnalyzerOutput> {
        let sentences = sentences(text);
        let findings: Vec<Finding> = sentences
            .iter()
            .flat_map(|(position, sentence)| check_sentence(*position, sentence))
            .collect();
        tracing::debug!(
            "general: {} sentence(s), {} finding(s)",
            sentences.len(),
            findings.len()
        );
        Ok(AnalyzerOutput {
            findings,
            unit_count: sentences.len(),
            extra_suggestions: vec![
                Suggestion::new("writing", "Check the text for accuracy and completeness"),
                Suggestion::new("writing", "Keep handwriting clear so every word can be recognized"),
            ],
            ..Default::default()
        })
    }
}
