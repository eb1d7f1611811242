//! Lexical extraction of candidate equations from recognized text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use unicode_normalization::UnicodeNormalization;

/// Digits, decimal points, parentheses, joined by arithmetic operators or `=`.
static NUMERIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"-?[0-9.()]+(?:\s*[-+*/×÷=]\s*-?[0-9.()]+)+").expect("numeric expression regex")
});

/// Same shape, with ASCII letters and `^` allowed inside operands.
static ALGEBRAIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"-?[A-Za-z0-9.()^]+(?:\s*[-+*/×÷=]\s*-?[A-Za-z0-9.()^]+)+")
        .expect("algebraic expression regex")
});

/// Three letters in a row is a word, not a product of variables.
static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]{3,}").expect("word regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Expression {
    pub raw_question: String,
    pub left_side: String,
    pub right_side: String,
    pub is_algebraic: bool,
    /// Byte offset of the match in the normalized text
    #[serde(skip)]
    pub offset: usize,
}

impl Expression {
    fn from_match(raw: &str, offset: usize, is_algebraic: bool) -> Option<Self> {
        let question = raw.trim();
        let parts: Vec<&str> = question.split('=').map(str::trim).collect();
        if parts.len() != 2 {
            return None;
        }
        let has_operand = |s: &str| s.chars().any(|c| c.is_ascii_alphanumeric());
        if !has_operand(parts[0]) || !has_operand(parts[1]) {
            return None;
        }
        Some(Expression {
            raw_question: question.to_string(),
            left_side: parts[0].to_string(),
            right_side: parts[1].to_string(),
            is_algebraic,
            offset,
        })
    }
}

/// NFKC folds full-width digits and operators (`５＋３＝９`) to ASCII.
pub fn normalize(text: &str) -> String {
    text.nfkc().collect()
}

/// Extract every `left = right` candidate from `text`. Never fails: spans that
/// do not split into exactly two non-empty sides are dropped.
pub fn extract(text: &str) -> Vec<Expression> {
    let text = normalize(text);

    let algebraic: Vec<(usize, usize, &str)> = ALGEBRAIC_RE
        .find_iter(&text)
        .map(|m| (m.start(), m.end(), m.as_str()))
        .filter(|(_, _, s)| s.chars().any(|c| c.is_ascii_alphabetic()) && !WORD_RE.is_match(s))
        .collect();

    let mut expressions: Vec<Expression> = Vec::new();

    for m in NUMERIC_RE.find_iter(&text) {
        // A numeric run inside a letter-bearing span is only a fragment of it.
        let fragment = algebraic
            .iter()
            .any(|(s, e, _)| *s <= m.start() && m.end() <= *e && (*s, *e) != (m.start(), m.end()));
        if fragment {
            continue;
        }
        if let Some(expr) = Expression::from_match(m.as_str(), m.start(), false) {
            expressions.push(expr);
        }
    }

    for (start, _, raw) in &algebraic {
        if expressions
            .iter()
            .any(|e| e.raw_question == raw.trim() && !e.is_algebraic)
        {
            continue;
        }
        if let Some(expr) = Expression::from_match(raw, *start, true) {
            expressions.push(expr);
        }
    }

    expressions.sort_by_key(|e| e.offset);
    tracing::debug!("extracted {} expression(s)", expressions.len());
    expressions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions(text: &str) -> Vec<(String, bool)> {
        extract(text)
            .into_iter()
            .map(|e| (e.raw_question, e.is_algebraic))
            .collect()
    }

    #[test]
    fn test_numeric_expressions() {
        let exprs = extract("1. 5+3=9  2. 12 - 4 = 8");
        assert_eq!(exprs.len(), 2);
        assert_eq!(exprs[0].left_side, "5+3");
        assert_eq!(exprs[0].right_side, "9");
        assert!(!exprs[0].is_algebraic);
        assert_eq!(exprs[1].left_side, "12 - 4");
        assert_eq!(exprs[1].right_side, "8");
    }

    #[test]
    fn test_spans_without_equals_are_dropped() {
        assert!(extract("3+4 and 5*6").is_empty());
        assert!(extract("1=2=3").is_empty());
        assert!(extract("no maths here").is_empty());
    }

    #[test]
    fn test_algebraic_does_not_duplicate_numeric() {
        assert_eq!(questions("5+3=8"), vec![("5+3=8".to_string(), false)]);
    }

    #[test]
    fn test_algebraic_expression_swallows_numeric_fragment() {
        assert_eq!(questions("2x+3=7"), vec![("2x+3=7".to_string(), true)]);
        assert_eq!(questions("x + x = 2x"), vec![("x + x = 2x".to_string(), true)]);
    }

    #[test]
    fn test_words_are_not_variables() {
        assert_eq!(questions("Tom-Jerry=5"), Vec::<(String, bool)>::new());
        assert_eq!(questions("答案：7×8=56"), vec![("7×8=56".to_string(), false)]);
    }

    #[test]
    fn test_full_width_input_is_normalized() {
        let exprs = extract("５＋３＝９");
        assert_eq!(exprs.len(), 1);
        assert_eq!(exprs[0].raw_question, "5+3=9");
    }

    #[test]
    fn test_negative_right_side() {
        let exprs = extract("3-5=-2");
        assert_eq!(exprs.len(), 1);
        assert_eq!(exprs[0].right_side, "-2");
    }
}
