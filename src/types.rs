//! Shared data model: findings, subjects, results and the request/response shapes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Top-level category of a detected issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    Spelling,
    Grammar,
    Punctuation,
    Structure,
    Concept,
    Calculation,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::Spelling => "spelling",
            FindingKind::Grammar => "grammar",
            FindingKind::Punctuation => "punctuation",
            FindingKind::Structure => "structure",
            FindingKind::Concept => "concept",
            FindingKind::Calculation => "calculation",
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Warnings are style notes; only errors count against the correct rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

/// Where a finding came from: the offending fragment, plus a char offset when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

/// A single detected issue. Built once by an analyzer and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub kind: FindingKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_kind: Option<String>,
    pub span: Span,
    pub correction: Option<String>,
    pub explanation: String,
    #[serde(default)]
    pub severity: Severity,
    /// Ranked replacement candidates (spelling only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<String>,
}

impl Finding {
    pub fn new(kind: FindingKind, text: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            kind,
            sub_kind: None,
            span: Span {
                text: text.into(),
                position: None,
            },
            correction: None,
            explanation: explanation.into(),
            severity: Severity::Error,
            candidates: Vec::new(),
        }
    }

    pub fn with_sub_kind(mut self, sub_kind: impl Into<String>) -> Self {
        self.sub_kind = Some(sub_kind.into());
        self
    }

    pub fn at(mut self, position: usize) -> Self {
        self.span.position = Some(position);
        self
    }

    pub fn with_correction(mut self, correction: impl Into<String>) -> Self {
        self.correction = Some(correction.into());
        self
    }

    pub fn with_candidates(mut self, candidates: Vec<String>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn as_warning(mut self) -> Self {
        self.severity = Severity::Warning;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Sub-kind when present, otherwise the kind name.
    pub fn bucket(&self) -> &str {
        self.sub_kind.as_deref().unwrap_or(self.kind.as_str())
    }
}

/// Subjects the dispatcher knows how to route. Anything unrecognized is `General`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Math,
    Chinese,
    English,
    General,
}

impl Subject {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "math" | "maths" | "mathematics" | "数学" => Subject::Math,
            "chinese" | "语文" => Subject::Chinese,
            "english" | "英语" => Subject::English,
            _ => Subject::General,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Math => "math",
            Subject::Chinese => "chinese",
            Subject::English => "english",
            Subject::General => "general",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

impl Suggestion {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyProfile {
    pub total_words: usize,
    pub unique_words: usize,
    pub pos_distribution: BTreeMap<String, usize>,
    pub complexity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub unit_count: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub by_kind: BTreeMap<String, usize>,
}

/// Caller-facing projection of an error finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mistake {
    pub question: String,
    pub correct: String,
    pub explanation: String,
}

impl From<&Finding> for Mistake {
    fn from(f: &Finding) -> Self {
        Mistake {
            question: f.span.text.clone(),
            correct: f
                .correction
                .clone()
                .or_else(|| f.candidates.first().cloned())
                .unwrap_or_default(),
            explanation: f.explanation.clone(),
        }
    }
}

/// Final output of one `(subject, text)` analysis. Owned by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub subject: Subject,
    pub correct_rate: u8,
    pub mistakes: Vec<Mistake>,
    pub findings: Vec<Finding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocabulary: Option<VocabularyProfile>,
    pub suggestions: Vec<Suggestion>,
    pub statistics: Statistics,
    pub summary: String,
}

/// Wire shape: either a full result with `success: true` or `{success: false, error}`.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
    pub success: bool,
    #[serde(flatten)]
    pub result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<crate::error::Result<AnalysisResult>> for AnalysisResponse {
    fn from(outcome: crate::error::Result<AnalysisResult>) -> Self {
        match outcome {
            Ok(result) => AnalysisResponse {
                success: true,
                result: Some(result),
                error: None,
            },
            Err(e) => AnalysisResponse {
                success: false,
                result: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// How a single question should be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    Calculation,
    Explanation,
    Text(String),
}

impl From<String> for QuestionType {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "multiple_choice" => QuestionType::MultipleChoice,
            "true_false" => QuestionType::TrueFalse,
            "calculation" => QuestionType::Calculation,
            "explanation" => QuestionType::Explanation,
            _ => QuestionType::Text(s),
        }
    }
}

impl From<QuestionType> for String {
    fn from(t: QuestionType) -> Self {
        match t {
            QuestionType::MultipleChoice => "multiple_choice".to_string(),
            QuestionType::TrueFalse => "true_false".to_string(),
            QuestionType::Calculation => "calculation".to_string(),
            QuestionType::Explanation => "explanation".to_string(),
            QuestionType::Text(s) => s,
        }
    }
}

impl Default for QuestionType {
    fn default() -> Self {
        QuestionType::Text(String::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub number: u32,
    pub content: String,
    #[serde(rename = "type", default)]
    pub question_type: QuestionType,
}

impl Question {
    pub fn new(number: u32, content: impl Into<String>, question_type: QuestionType) -> Self {
        Self {
            number,
            content: content.into(),
            question_type,
        }
    }
}

/// Input contract from the outer application.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub subject: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub questions: Option<Vec<Question>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_parsing_is_case_insensitive_and_bilingual() {
        assert_eq!(Subject::parse("MATH"), Subject::Math);
        assert_eq!(Subject::parse(" 数学 "), Subject::Math);
        assert_eq!(Subject::parse("Chinese"), Subject::Chinese);
        assert_eq!(Subject::parse("语文"), Subject::Chinese);
        assert_eq!(Subject::parse("english"), Subject::English);
        assert_eq!(Subject::parse("英语"), Subject::English);
        assert_eq!(Subject::parse("art"), Subject::General);
        assert_eq!(Subject::parse(""), Subject::General);
    }

    #[test]
    fn question_type_accepts_unknown_values() {
        let q: Question =
            serde_json::from_str(r#"{"number": 1, "content": "1+1=2", "type": "essay"}"#).unwrap();
        assert_eq!(q.question_type, QuestionType::Text("essay".into()));

        let q: Question =
            serde_json::from_str(r#"{"number": 2, "content": "x", "type": "true_false"}"#).unwrap();
        assert_eq!(q.question_type, QuestionType::TrueFalse);
    }

    #[test]
    fn failed_response_serializes_without_result_fields() {
        let resp = AnalysisResponse::from(Err(crate::error::EduCheckError::capability(
            "tagger", "offline",
        )));
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["success"], false);
        assert!(v.get("correctRate").is_none());
        assert!(v["error"].as_str().unwrap().contains("tagger"));
    }

    #[test]
    fn mistake_falls_back_to_first_candidate() {
        let f = Finding::new(FindingKind::Spelling, "teh", "Possible spelling error")
            .with_candidates(vec!["the".into(), "ten".into()]);
        let m = Mistake::from(&f);
        assert_eq!(m.correct, "the");
        assert_eq!(f.bucket(), "spelling");
    }
}
