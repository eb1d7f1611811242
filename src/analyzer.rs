//! SubjectAnalyzer trait and common helpers.

use crate::aggregate::SuggestionTable;
use crate::error::{EduCheckError, Result};
use crate::types::{Finding, Subject, Suggestion, VocabularyProfile};

/// Raw analyzer output before aggregation.
#[derive(Debug, Clone, Default)]
pub struct AnalyzerOutput {
    pub findings: Vec<Finding>,
    /// Denominator for the correct rate (questions, characters or sentences)
    pub unit_count: usize,
    pub vocabulary: Option<VocabularyProfile>,
    /// Subject-specific suggestions placed before the general one
    pub extra_suggestions: Vec<Suggestion>,
    pub summary: Option<String>,
}

pub trait SubjectAnalyzer: Send + Sync {
    fn subject(&self) -> Subject;

    fn suggestion_table(&self) -> &'static SuggestionTable;

    fn analyze(&self, text: &str) -> Result<AnalyzerOutput>;

    fn analyze_multiple_choice(&self, text: &str) -> Result<AnalyzerOutput> {
        self.analyze(text)
    }

    fn analyze_true_false(&self, text: &str) -> Result<AnalyzerOutput> {
        self.analyze(text)
    }

    fn analyze_calculation(&self, text: &str) -> Result<AnalyzerOutput> {
        self.analyze(text)
    }

    fn analyze_explanation(&self, text: &str) -> Result<AnalyzerOutput> {
        self.analyze(text)
    }
}

/// Reject question content no analyzer can make sense of: blank text, or the
/// NUL / replacement characters a broken OCR pass leaves behind.
pub(crate) fn ensure_well_formed(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(EduCheckError::malformed("question content is empty"));
    }
    if let Some(bad) = text.chars().find(|c| *c == '\0' || *c == '\u{FFFD}') {
        return Err(EduCheckError::malformed(format!(
            "question content contains unreadable character {:?}",
            bad
        )));
    }
    Ok(())
}
