//! Math module: expression extraction, evaluation, validation and the math analyzer.

pub mod eval;
pub mod extract;
pub mod validate;

use crate::aggregate::{self, GeneralPolicy, SuggestionEntry, SuggestionTable};
use crate::analyzer::{AnalyzerOutput, SubjectAnalyzer};
use crate::config::MathConfig;
use crate::error::Result;
use crate::types::{Finding, FindingKind, Subject, Suggestion};
use extract::Expression;
use serde::Serialize;
use std::collections::BTreeMap;
use validate::Validation;

pub static MATH_SUGGESTIONS: SuggestionTable = SuggestionTable {
    bucket: aggregate::by_sub_kind,
    entries: &[
        SuggestionEntry {
            bucket: "addition",
            kind: "addition",
            message: "Practise addition and pay attention to carrying; start with basic addition drills",
        },
        SuggestionEntry {
            bucket: "subtraction",
            kind: "subtraction",
            message: "Practise subtraction and pay attention to borrowing; start with basic subtraction drills",
        },
        SuggestionEntry {
            bucket: "multiplication",
            kind: "multiplication",
            message: "Practise multiplication and review the times tables",
        },
        SuggestionEntry {
            bucket: "division",
            kind: "division",
            message: "Practise division and follow each step of the method",
        },
        SuggestionEntry {
            bucket: "unverified",
            kind: "format",
            message: "Write each expression clearly so every step can be checked",
        },
        SuggestionEntry {
            bucket: "calculation",
            kind: "calculation",
            message: "Check each calculation step and the operator signs",
        },
    ],
    fallback: "Review the related concepts and worked examples",
    general: "Keep practising to consolidate basic calculation skills",
    general_policy: GeneralPolicy::WhenErrors,
    show_share: true,
};

/// One extracted expression with its verdict.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionOutcome {
    pub expression: Expression,
    #[serde(flatten)]
    pub validation: Validation,
    pub concept_errors: Vec<Finding>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MathStatistics {
    pub total: usize,
    pub correct: usize,
    /// Operation type -> number of wrong expressions of that type
    pub error_types: BTreeMap<String, usize>,
}

/// Full per-expression report for callers that want more than findings.
#[derive(Debug, Clone, Serialize)]
pub struct MathReport {
    pub results: Vec<ExpressionOutcome>,
    pub statistics: MathStatistics,
    pub suggestions: Vec<Suggestion>,
}

pub struct MathAnalyzer {
    tolerance: f64,
}

impl Default for MathAnalyzer {
    fn default() -> Self {
        Self::new(&MathConfig::default())
    }
}

impl MathAnalyzer {
    pub fn new(config: &MathConfig) -> Self {
        Self {
            tolerance: config.tolerance,
        }
    }

    fn outcomes(&self, text: &str) -> Vec<ExpressionOutcome> {
        extract::extract(text)
            .into_iter()
            .map(|expression| {
                let validation = validate::validate(&expression, self.tolerance);
                let concept_errors = validate::detect_concept_errors(&expression.raw_question);
                ExpressionOutcome {
                    expression,
                    validation,
                    concept_errors,
                }
            })
            .collect()
    }

    fn outcome_finding(outcome: &ExpressionOutcome) -> Finding {
        let v = &outcome.validation;
        let mut finding = Finding::new(
            FindingKind::Calculation,
            outcome.expression.raw_question.clone(),
            v.explanation.clone(),
        )
        .with_correction(v.correct_answer.clone());
        if !v.verified {
            finding = finding.with_sub_kind("unverified");
        } else if let Some(op) = outcome.concept_errors.first().and_then(|c| c.sub_kind.clone()) {
            finding = finding.with_sub_kind(op);
        }
        finding
    }

    /// Per-expression report: totals, wrong answers bucketed by operation type,
    /// one suggestion per bucket and a practice suggestion when anything is wrong.
    pub fn report(&self, text: &str) -> MathReport {
        let results = self.outcomes(text);
        let mut statistics = MathStatistics {
            total: results.len(),
            correct: results.iter().filter(|r| r.validation.is_correct).count(),
            error_types: BTreeMap::new(),
        };
        for r in results.iter().filter(|r| !r.validation.is_correct) {
            for c in &r.concept_errors {
                *statistics
                    .error_types
                    .entry(c.bucket().to_string())
                    .or_insert(0) += 1;
            }
        }
        let findings: Vec<Finding> = results
            .iter()
            .filter(|r| !r.validation.is_correct)
            .map(Self::outcome_finding)
            .collect();
        let suggestions =
            aggregate::suggestions(&findings, statistics.total, &MATH_SUGGESTIONS, Vec::new());
        MathReport {
            results,
            statistics,
            suggestions,
        }
    }
}

impl SubjectAnalyzer for MathAnalyzer {
    fn subject(&self) -> Subject {
        Subject::Math
    }

    fn suggestion_table(&self) -> &'static SuggestionTable {
        &MATH_SUGGESTIONS
    }

    fn analyze(&self, text: &str) -> Result<AnalyzerOutput> {
        let outcomes = self.outcomes(text);
        let mut findings: Vec<Finding> = outcomes
            .iter()
            .filter(|o| !o.validation.is_correct)
            .map(Self::outcome_finding)
            .collect();

        // Facts the extractor did not already judge are units of their own.
        let stray: Vec<Finding> = validate::detect_concept_errors(&extract::normalize(text))
            .into_iter()
            .filter(|c| {
                !outcomes
                    .iter()
                    .any(|o| o.expression.raw_question.contains(c.span.text.as_str()))
            })
            .collect();

        let unit_count = outcomes.len() + stray.len();
        let correct = outcomes.iter().filter(|o| o.validation.is_correct).count();
        tracing::debug!(
            "math: {} expression(s), {} correct, {} stray fact error(s)",
            outcomes.len(),
            correct,
            stray.len()
        );
        findings.extend(stray);

        Ok(AnalyzerOutput {
            summary: Some(format!(
                "Checked {} expression(s): {} correct, {} incorrect.",
                unit_count,
                correct,
                unit_count - correct
            )),
            findings,
            unit_count,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrong_sum_is_one_addition_finding() {
        let out = MathAnalyzer::default().analyze("5+3=9").unwrap();
        assert_eq!(out.unit_count, 1);
        assert_eq!(out.findings.len(), 1);
        let f = &out.findings[0];
        assert_eq!(f.kind, FindingKind::Calculation);
        assert_eq!(f.sub_kind.as_deref(), Some("addition"));
        assert_eq!(f.correction.as_deref(), Some("8"));
    }

    #[test]
    fn test_clean_sheet_has_no_findings() {
        let out = MathAnalyzer::default()
            .analyze("1+1=2\n3×4=12\n(2+3)*2=10")
            .unwrap();
        assert_eq!(out.unit_count, 3);
        assert!(out.findings.is_empty());
    }

    #[test]
    fn test_report_buckets_by_operation() {
        let report = MathAnalyzer::default().report("5+3=9  9-4=6  2+2=4  6×7=41");
        assert_eq!(report.statistics.total, 4);
        assert_eq!(report.statistics.correct, 1);
        assert_eq!(report.statistics.error_types.get("addition"), Some(&1));
        assert_eq!(report.statistics.error_types.get("subtraction"), Some(&1));
        assert_eq!(report.statistics.error_types.get("multiplication"), Some(&1));
        let kinds: Vec<&str> = report.suggestions.iter().map(|s| s.kind.as_str()).collect();
        assert_eq!(
            kinds,
            vec!["addition", "subtraction", "multiplication", "general"]
        );
        assert!(report.suggestions[0].message.contains("25.0%"));
    }

    #[test]
    fn test_no_general_suggestion_when_all_correct() {
        let report = MathAnalyzer::default().report("2+2=4");
        assert!(report.suggestions.is_empty());
    }

    #[test]
    fn test_unparsable_expression_is_reported_not_fatal() {
        let out = MathAnalyzer::default().analyze("7/0=1 and 1+1=2").unwrap();
        assert_eq!(out.unit_count, 2);
        assert_eq!(out.findings.len(), 1);
        assert_eq!(out.findings[0].sub_kind.as_deref(), Some("unverified"));
        assert_eq!(
            out.findings[0].correction.as_deref(),
            Some(validate::UNVERIFIED_ANSWER)
        );
    }
}
