//! Shared "bucket the findings, then derive suggestions" routine.
//!
//! Every analyzer produces findings plus a unit count; the subject only decides
//! how findings are bucketed and which message each bucket maps to.

use crate::analyzer::AnalyzerOutput;
use crate::types::{AnalysisResult, Finding, Mistake, Statistics, Subject, Suggestion};
use std::collections::BTreeMap;

/// When the closing general suggestion is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneralPolicy {
    Always,
    WhenErrors,
}

/// One bucket key mapped to the suggestion it produces.
#[derive(Debug, Clone, Copy)]
pub struct SuggestionEntry {
    pub bucket: &'static str,
    pub kind: &'static str,
    pub message: &'static str,
}

/// Subject-specific parameters for [`aggregate`].
pub struct SuggestionTable {
    pub bucket: fn(&Finding) -> &str,
    pub entries: &'static [SuggestionEntry],
    /// Used for buckets missing from `entries`
    pub fallback: &'static str,
    pub general: &'static str,
    pub general_policy: GeneralPolicy,
    /// Append the bucket's share of units to the message
    pub show_share: bool,
}

impl SuggestionTable {
    fn entry(&self, bucket: &str) -> Option<&SuggestionEntry> {
        self.entries.iter().find(|e| e.bucket == bucket)
    }
}

pub fn by_kind(f: &Finding) -> &str {
    f.kind.as_str()
}

pub fn by_sub_kind(f: &Finding) -> &str {
    f.bucket()
}

/// `1 - errors/units` as a whole percentage, clamped to [0, 100]. Zero units is 0.
pub fn correct_rate(error_count: usize, unit_count: usize) -> u8 {
    if unit_count == 0 {
        return 0;
    }
    let rate = (1.0 - error_count as f64 / unit_count as f64) * 100.0;
    rate.round().clamp(0.0, 100.0) as u8
}

/// Count findings per bucket, preserving first-seen order.
pub fn bucket_counts<'a>(
    findings: &'a [Finding],
    bucket: fn(&Finding) -> &str,
) -> Vec<(&'a str, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for f in findings {
        let key = bucket(f);
        match counts.iter_mut().find(|(k, _)| *k == key) {
            Some((_, n)) => *n += 1,
            None => counts.push((key, 1)),
        }
    }
    counts
}

/// Derive the suggestion list: one per bucket (deduplicated by message), then
/// `extra`, then the general suggestion according to the table's policy.
pub fn suggestions(
    findings: &[Finding],
    unit_count: usize,
    table: &SuggestionTable,
    extra: Vec<Suggestion>,
) -> Vec<Suggestion> {
    let mut out: Vec<Suggestion> = Vec::new();
    for (bucket, count) in bucket_counts(findings, table.bucket) {
        let (kind, base) = match table.entry(bucket) {
            Some(e) => (e.kind, e.message),
            None => (bucket, table.fallback),
        };
        let message = if table.show_share && unit_count > 0 {
            let pct = count as f64 / unit_count as f64 * 100.0;
            format!("{} ({:.1}% of questions)", base, pct)
        } else {
            base.to_string()
        };
        if !out.iter().any(|s| s.kind == kind && s.message == message) {
            out.push(Suggestion::new(kind, message));
        }
    }
    out.extend(extra);

    let any_error = findings.iter().any(Finding::is_error);
    if table.general_policy == GeneralPolicy::Always || any_error {
        out.push(Suggestion::new("general", table.general));
    }
    out
}

pub fn statistics(findings: &[Finding], unit_count: usize) -> Statistics {
    let error_count = findings.iter().filter(|f| f.is_error()).count();
    let mut by_kind: BTreeMap<String, usize> = BTreeMap::new();
    for f in findings {
        *by_kind.entry(f.bucket().to_string()).or_insert(0) += 1;
    }
    Statistics {
        unit_count,
        error_count,
        warning_count: findings.len() - error_count,
        by_kind,
    }
}

/// Turn an analyzer's raw output into the caller-facing result.
pub fn assemble(subject: Subject, output: AnalyzerOutput, table: &SuggestionTable) -> AnalysisResult {
    let AnalyzerOutput {
        findings,
        unit_count,
        vocabulary,
        extra_suggestions,
        summary,
    } = output;

    let statistics = statistics(&findings, unit_count);
    let correct_rate = correct_rate(statistics.error_count, unit_count);
    let suggestions = suggestions(&findings, unit_count, table, extra_suggestions);
    let summary = summary.unwrap_or_else(|| {
        format!(
            "{} analysis completed: {} issue(s) found across {} unit(s), correct rate {}%.",
            subject, statistics.error_count, unit_count, correct_rate
        )
    });
    let mistakes = findings
        .iter()
        .filter(|f| f.is_error())
        .map(Mistake::from)
        .collect();

    AnalysisResult {
        subject,
        correct_rate,
        mistakes,
        findings,
        vocabulary,
        suggestions,
        statistics,
        summary,
    }
}
