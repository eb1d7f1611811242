//! Correctness checks for extracted expressions, plus the standalone
//! arithmetic fact checker.

use super::eval::{evaluate, format_number, simplify};
use super::extract::Expression;
use crate::types::{Finding, FindingKind};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

pub const UNVERIFIED_ANSWER: &str = "unable to verify";

/// Outcome of checking one expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    pub is_correct: bool,
    pub correct_answer: String,
    pub explanation: String,
    /// False when the evaluator could not make sense of the expression
    pub verified: bool,
}

impl Validation {
    fn unverified(what: &str) -> Self {
        Validation {
            is_correct: false,
            correct_answer: UNVERIFIED_ANSWER.to_string(),
            explanation: format!("The {} could not be parsed or evaluated", what),
            verified: false,
        }
    }
}

/// Check one expression. Evaluator failures are recovered into an
/// "unable to verify" outcome instead of failing the batch.
pub fn validate(expr: &Expression, tolerance: f64) -> Validation {
    if expr.is_algebraic {
        return validate_algebraic(expr);
    }

    let sides = evaluate(&expr.left_side).and_then(|l| Ok((l, evaluate(&expr.right_side)?)));
    match sides {
        Ok((left, right)) => {
            let is_correct = (left - right).abs() < tolerance;
            let shown = format_number(left);
            Validation {
                is_correct,
                correct_answer: if is_correct {
                    expr.right_side.clone()
                } else {
                    shown.clone()
                },
                explanation: if is_correct {
                    "Calculation is correct".to_string()
                } else {
                    format!(
                        "Calculation error: {} = {}, not {}",
                        expr.left_side, shown, expr.right_side
                    )
                },
                verified: true,
            }
        }
        Err(e) => {
            tracing::warn!("could not evaluate '{}': {}", expr.raw_question, e);
            Validation::unverified("expression")
        }
    }
}

fn validate_algebraic(expr: &Expression) -> Validation {
    let sides = simplify(&expr.left_side).and_then(|l| Ok((l, simplify(&expr.right_side)?)));
    match sides {
        Ok((left, right)) => {
            let is_correct = left == right;
            Validation {
                is_correct,
                correct_answer: if is_correct {
                    expr.right_side.clone()
                } else {
                    left.clone()
                },
                explanation: if is_correct {
                    "Algebraic expression is correct".to_string()
                } else {
                    format!(
                        "Algebraic error: {} simplifies to {}, not {}",
                        expr.left_side, left, expr.right_side
                    )
                },
                verified: true,
            }
        }
        Err(e) => {
            tracing::warn!("could not simplify '{}': {}", expr.raw_question, e);
            Validation::unverified("algebraic expression")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Addition,
    Subtraction,
    Multiplication,
    Division,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Addition => "addition",
            Operation::Subtraction => "subtraction",
            Operation::Multiplication => "multiplication",
            Operation::Division => "division",
        }
    }

    /// The true value of `a op b`, or None when it is undefined or overflows.
    fn apply(&self, a: u64, b: u64) -> Option<f64> {
        match self {
            Operation::Addition => a.checked_add(b).map(|v| v as f64),
            Operation::Subtraction => Some(a as f64 - b as f64),
            Operation::Multiplication => a.checked_mul(b).map(|v| v as f64),
            Operation::Division => (b != 0).then(|| a as f64 / b as f64),
        }
    }
}

struct ConceptRule {
    pattern: Regex,
    operation: Operation,
    message: &'static str,
}

static CONCEPT_RULES: Lazy<Vec<ConceptRule>> = Lazy::new(|| {
    let rule = |pattern: &str, operation, message| ConceptRule {
        pattern: Regex::new(pattern).expect("concept rule regex"),
        operation,
        message,
    };
    vec![
        rule(
            r"([0-9]+)\s*\+\s*([0-9]+)\s*=\s*([0-9]+)",
            Operation::Addition,
            "Addition error",
        ),
        rule(
            r"([0-9]+)\s*-\s*([0-9]+)\s*=\s*([0-9]+)",
            Operation::Subtraction,
            "Subtraction error",
        ),
        rule(
            r"([0-9]+)\s*[×*]\s*([0-9]+)\s*=\s*([0-9]+)",
            Operation::Multiplication,
            "Multiplication error",
        ),
        rule(
            r"([0-9]+)\s*[÷/]\s*([0-9]+)\s*=\s*([0-9]+)",
            Operation::Division,
            "Division error",
        ),
    ]
});

const FACT_TOLERANCE: f64 = 1e-4;

const OPERATORS: &str = "+-*/×÷=";

/// A fact embedded in a longer chain (`10+5-3=12`) or a decimal (`2.5+1=3`)
/// is not a standalone fact.
fn is_isolated(text: &str, start: usize, end: usize) -> bool {
    if text[..start]
        .chars()
        .next_back()
        .is_some_and(|c| c == '.' || c.is_ascii_digit())
    {
        return false;
    }
    let before = text[..start].chars().rev().find(|c| !c.is_whitespace());
    if before.is_some_and(|c| OPERATORS.contains(c)) {
        return false;
    }
    let mut rest = text[end..].chars();
    if rest.next() == Some('.') && rest.next().is_some_and(|c| c.is_ascii_digit()) {
        return false;
    }
    let after = text[end..].chars().find(|c| !c.is_whitespace());
    !after.is_some_and(|c| OPERATORS.contains(c))
}

/// Flag numerically wrong `a op b = c` facts anywhere in `text`, independent
/// of the extractor. Correct facts produce nothing.
pub fn detect_concept_errors(text: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    for rule in CONCEPT_RULES.iter() {
        for caps in rule.pattern.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            if !is_isolated(text, whole.start(), whole.end()) {
                continue;
            }
            let nums: Option<Vec<u64>> = (1..=3)
                .map(|i| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok()))
                .collect();
            let Some(nums) = nums else { continue };
            let (a, b, c) = (nums[0], nums[1], nums[2]);

            let expected = rule.operation.apply(a, b);
            let wrong = match expected {
                Some(v) => (v - c as f64).abs() >= FACT_TOLERANCE,
                None => rule.operation == Operation::Division,
            };
            if !wrong {
                continue;
            }

            let lhs = whole.as_str().split('=').next().unwrap_or_default().trim();
            let mut finding = Finding::new(
                FindingKind::Concept,
                whole.as_str(),
                match expected {
                    Some(v) => format!(
                        "{}: {} = {}, not {}",
                        rule.message,
                        lhs,
                        format_number(v),
                        c
                    ),
                    None => format!("{}: division by zero is undefined", rule.message),
                },
            )
            .with_sub_kind(rule.operation.as_str())
            .at(text[..whole.start()].chars().count());
            if let Some(v) = expected {
                finding = finding.with_correction(format_number(v));
            }
            findings.push(finding);
        }
    }
    findings.sort_by_key(|f| f.span.position);
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::extract::extract;

    fn check(text: &str) -> Validation {
        let exprs = extract(text);
        assert_eq!(exprs.len(), 1, "expected one expression in {:?}", text);
        validate(&exprs[0], 1e-4)
    }

    #[test]
    fn test_numeric_validation() {
        let ok = check("1+1=2");
        assert!(ok.is_correct);
        assert_eq!(ok.correct_answer, "2");

        let bad = check("5+3=9");
        assert!(!bad.is_correct);
        assert!(bad.verified);
        assert_eq!(bad.correct_answer, "8");
        assert!(bad.explanation.contains("5+3 = 8"));
    }

    #[test]
    fn test_floating_point_tolerance() {
        assert!(check("0.1+0.2=0.3").is_correct);
        assert!(check("1/3=0.33333").is_correct);
        assert!(!check("1/3=0.33").is_correct);
    }

    #[test]
    fn test_algebraic_validation() {
        assert!(check("x+x=2x").is_correct);
        let bad = check("2x+3x=6x");
        assert!(!bad.is_correct);
        assert_eq!(bad.correct_answer, "5x");
    }

    #[test]
    fn test_unverifiable_expression() {
        let v = check("5/0=1");
        assert!(!v.is_correct);
        assert!(!v.verified);
        assert_eq!(v.correct_answer, UNVERIFIED_ANSWER);
    }

    #[test]
    fn test_correct_facts_are_not_flagged() {
        for text in ["2+3=5", "9-4=5", "6×7=42", "8÷2=4", "12 * 3 = 36", "0+0=0"] {
            assert!(detect_concept_errors(text).is_empty(), "{}", text);
        }
    }

    #[test]
    fn test_wrong_facts_are_flagged_once_with_operation() {
        let cases = [
            ("5+3=9", "addition"),
            ("9-4=6", "subtraction"),
            ("6×7=41", "multiplication"),
            ("7÷2=3", "division"),
            ("5÷0=0", "division"),
        ];
        for (text, op) in cases {
            let found = detect_concept_errors(text);
            assert_eq!(found.len(), 1, "{}", text);
            assert_eq!(found[0].sub_kind.as_deref(), Some(op));
            assert_eq!(found[0].kind, FindingKind::Concept);
        }
        assert_eq!(
            detect_concept_errors("5+3=9")[0].correction.as_deref(),
            Some("8")
        );
    }

    #[test]
    fn test_facts_inside_chains_are_ignored() {
        assert!(detect_concept_errors("10+5-3=12").is_empty());
        assert!(detect_concept_errors("2+3=4+1").is_empty());
        assert!(detect_concept_errors("2.5+1=3").is_empty());
    }

    #[test]
    fn test_facts_found_inside_prose() {
        let found = detect_concept_errors("小明算出 3+4=8，对吗？还有 2×5=10。");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].span.text, "3+4=8");
        assert_eq!(found[0].span.position, Some(5));
    }
}
