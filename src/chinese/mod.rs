//! Chinese writing checks: punctuation spacing, redundant sentence endings,
//! repeated words and 的/地/得 usage.

pub mod segment;

use crate::aggregate::{self, GeneralPolicy, SuggestionEntry, SuggestionTable};
use crate::analyzer::{AnalyzerOutput, SubjectAnalyzer};
use crate::error::{EduCheckError, Result};
use crate::types::{Finding, FindingKind, Subject, Suggestion};
use once_cell::sync::Lazy;
use regex::Regex;
use segment::{DictionarySegmenter, Segmenter, Token};
use serde::Serialize;
use std::sync::Arc;

/// Particles that legitimately repeat (`看了了` is rare, `走着走着` is not).
const REPEATABLE: &[&str] = &["的", "地", "得", "着", "了", "过"];

/// Verb, verb-derived and adjective-derived tags.
const VERB_LIKE: &[&str] = &["v", "vd", "vn", "a", "ad"];

const SPACED_PUNCTUATION: &str = "，。！？；：、";

static REDUNDANT_END_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[。！？][。！？]").expect("sentence end regex"));

fn chinese_bucket(f: &Finding) -> &str {
    match f.kind {
        FindingKind::Punctuation => "punctuation",
        _ => f.bucket(),
    }
}

pub static CHINESE_SUGGESTIONS: SuggestionTable = SuggestionTable {
    bucket: chinese_bucket,
    entries: &[
        SuggestionEntry {
            bucket: "punctuation",
            kind: "punctuation",
            message: "注意标点符号的正确使用，避免不必要的空格和重复标点",
        },
        SuggestionEntry {
            bucket: "usage",
            kind: "grammar",
            message: "注意“的、地、得”的用法：“的”用于名词性修饰，“地”用于状语修饰，“得”用于补语修饰",
        },
        SuggestionEntry {
            bucket: "repetition",
            kind: "grammar",
            message: "注意避免不必要的词语重复",
        },
    ],
    fallback: "注意检查文字的准确性和完整性",
    general: "建议多读多写，积累词汇量，提高语言表达能力",
    general_policy: GeneralPolicy::Always,
    show_share: false,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChineseReport {
    pub punctuation_errors: Vec<Finding>,
    pub grammar_errors: Vec<Finding>,
    pub suggestions: Vec<Suggestion>,
}

pub struct ChineseAnalyzer {
    segmenter: Arc<dyn Segmenter>,
}

impl Default for ChineseAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChineseAnalyzer {
    pub fn new() -> Self {
        Self::with_segmenter(Arc::new(DictionarySegmenter::new()))
    }

    pub fn with_segmenter(segmenter: Arc<dyn Segmenter>) -> Self {
        Self { segmenter }
    }

    /// Run every check and derive suggestions. Fails only when segmentation does.
    pub fn analyze_text(&self, text: &str) -> Result<ChineseReport> {
        let tokens = self.segmenter.segment(text).map_err(|e| match e {
            EduCheckError::Capability { .. } => e,
            other => EduCheckError::capability("segmenter", other.to_string()),
        })?;
        let punctuation_errors = check_punctuation(text);
        let mut grammar_errors = check_repetition(&tokens);
        grammar_errors.extend(check_particles(&tokens));
        grammar_errors.sort_by_key(|f| f.span.position);

        let all: Vec<Finding> = punctuation_errors
            .iter()
            .chain(grammar_errors.iter())
            .cloned()
            .collect();
        let suggestions = aggregate::suggestions(
            &all,
            unit_count(text),
            &CHINESE_SUGGESTIONS,
            Vec::new(),
        );

        Ok(ChineseReport {
            punctuation_errors,
            grammar_errors,
            suggestions,
        })
    }
}

impl SubjectAnalyzer for ChineseAnalyzer {
    fn subject(&self) -> Subject {
        Subject::Chinese
    }

    fn suggestion_table(&self) -> &'static SuggestionTable {
        &CHINESE_SUGGESTIONS
    }

    fn analyze(&self, text: &str) -> Result<AnalyzerOutput> {
        let report = self.analyze_text(text)?;
        let mut findings = report.punctuation_errors;
        findings.extend(report.grammar_errors);
        Ok(AnalyzerOutput {
            findings,
            unit_count: unit_count(text),
            ..Default::default()
        })
    }
}

/// Characters, ignoring whitespace.
fn unit_count(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

fn is_space(c: char) -> bool {
    c == ' ' || c == '\u{3000}'
}

pub fn check_punctuation(text: &str) -> Vec<Finding> {
    let chars: Vec<char> = text.chars().collect();
    let mut findings = Vec::new();

    for (i, &c) in chars.iter().enumerate() {
        if !SPACED_PUNCTUATION.contains(c) {
            continue;
        }
        let before = i > 0 && is_space(chars[i - 1]);
        let after = chars.get(i + 1).is_some_and(|n| is_space(*n));
        if before || after {
            let start = if before { i - 1 } else { i };
            let end = if after { i + 2 } else { i + 1 };
            findings.push(
                Finding::new(
                    FindingKind::Punctuation,
                    chars[start..end].iter().collect::<String>(),
                    "中文标点符号前后不需要空格",
                )
                .with_sub_kind("spacing")
                .with_correction(c.to_string())
                .at(i),
            );
        }
    }

    for m in REDUNDANT_END_RE.find_iter(text) {
        let first = m.as_str().chars().next().map(String::from).unwrap_or_default();
        findings.push(
            Finding::new(FindingKind::Punctuation, m.as_str(), "不应重复使用句末标点符号")
                .with_sub_kind("redundant")
                .with_correction(first)
                .at(text[..m.start()].chars().count()),
        );
    }

    findings.sort_by_key(|f| f.span.position);
    findings
}

pub fn check_repetition(tokens: &[Token]) -> Vec<Finding> {
    tokens
        .windows(2)
        .filter(|w| {
            w[0].word == w[1].word
                && !w[0].is_punctuation()
                && !REPEATABLE.contains(&w[0].word.as_str())
        })
        .map(|w| {
            Finding::new(
                FindingKind::Grammar,
                format!("{}{}", w[0].word, w[1].word),
                format!("词语“{}”重复使用", w[0].word),
            )
            .with_sub_kind("repetition")
            .with_correction(w[0].word.clone())
            .at(w[0].offset)
        })
        .collect()
}

fn is_verb_like(token: &Token) -> bool {
    VERB_LIKE.contains(&token.tag.as_str())
}

fn usage_finding(
    prev: Option<&Token>,
    particle: &Token,
    next: Option<&Token>,
    replacement: &str,
    message: &str,
) -> Finding {
    let prev_word = prev.map(|t| t.word.as_str()).unwrap_or_default();
    let next_word = next.map(|t| t.word.as_str()).unwrap_or_default();
    Finding::new(
        FindingKind::Grammar,
        format!("{}{}{}", prev_word, particle.word, next_word),
        message,
    )
    .with_sub_kind("usage")
    .with_correction(format!("{}{}{}", prev_word, replacement, next_word))
    .at(particle.offset)
}

/// 的 modifies nouns, 地 modifies verbs, 得 follows a verb or adjective.
/// Heuristic: false positives are expected.
pub fn check_particles(tokens: &[Token]) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        let prev = i.checked_sub(1).and_then(|j| tokens.get(j));
        let next = tokens.get(i + 1);
        match token.word.as_str() {
            "的" => {
                if next.is_some_and(is_verb_like) {
                    findings.push(usage_finding(
                        prev,
                        token,
                        next,
                        "地",
                        "在此处可能应该用“地”或“得”",
                    ));
                }
            }
            "地" => {
                if next.is_some_and(|n| !is_verb_like(n)) {
                    findings.push(usage_finding(
                        prev,
                        token,
                        next,
                        "的",
                        "在此处可能应该用“的”或“得”",
                    ));
                }
            }
            "得" => {
                if prev.is_some_and(|p| !is_verb_like(p)) {
                    let replacement = if next.is_some_and(is_verb_like) {
                        "地"
                    } else {
                        "的"
                    };
                    findings.push(usage_finding(
                        prev,
                        token,
                        next,
                        replacement,
                        "在此处可能应该用“的”或“地”",
                    ));
                }
            }
            _ => {}
        }
    }
    findings
}
