//! Per-question batch analysis.

use super::Dispatcher;
use crate::aggregate;
use crate::analyzer::{SubjectAnalyzer, ensure_well_formed};
use crate::error::Result;
use crate::types::{AnalysisResult, Question, QuestionType, Subject, Suggestion};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

/// Outcome for one question: the full result, or the reason it failed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_number: u32,
    pub success: bool,
    #[serde(flatten)]
    pub result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QuestionResult {
    fn ok(question_number: u32, result: AnalysisResult) -> Self {
        Self {
            question_number,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    fn failed(question_number: u32, message: String) -> Self {
        Self {
            question_number,
            success: false,
            result: None,
            error: Some(message),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatistics {
    pub total_questions: usize,
    pub successful_analyses: usize,
    /// Error finding kind -> count across all successful questions
    pub error_types: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMetadata {
    pub subject: String,
    pub total_questions: usize,
    pub analyzed_questions: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub success: bool,
    pub results: Vec<QuestionResult>,
    pub statistics: BatchStatistics,
    pub suggestions: Vec<Suggestion>,
    pub summary: String,
    pub metadata: BatchMetadata,
}

/// Run the type-specific analysis for one question and assemble its result.
pub fn route_question(analyzer: &dyn SubjectAnalyzer, question: &Question) -> Result<AnalysisResult> {
    let content = question.content.as_str();
    ensure_well_formed(content)?;
    let output = match question.question_type {
        QuestionType::MultipleChoice => analyzer.analyze_multiple_choice(content)?,
        QuestionType::TrueFalse => analyzer.analyze_true_false(content)?,
        QuestionType::Calculation => analyzer.analyze_calculation(content)?,
        QuestionType::Explanation => analyzer.analyze_explanation(content)?,
        QuestionType::Text(_) => analyzer.analyze(content)?,
    };
    Ok(aggregate::assemble(
        analyzer.subject(),
        output,
        analyzer.suggestion_table(),
    ))
}

fn error_type_suggestion(subject: Subject, error_type: &str) -> &'static str {
    match (subject, error_type) {
        (Subject::Chinese, "grammar") => "建议多做语法练习，特别注意“的、地、得”的用法",
        (Subject::Chinese, "punctuation") => "注意标点符号的正确使用，可以通过多读多写来提高",
        (Subject::Chinese, "spelling") => "建议多查字典，巩固生字的写法",
        (Subject::Chinese, _) => "建议针对性练习，提高相关能力",
        (Subject::Math, "calculation") => "Do more calculation practice and follow the order of operations",
        (Subject::Math, "concept") => "Strengthen the underlying concepts by working through examples",
        (Subject::English, "grammar") => "Review English grammar rules systematically",
        (Subject::English, "spelling") => "Practise spelling words and learn the common spelling rules",
        (Subject::English, "structure") => "Practise writing complete, well-formed sentences",
        _ => "Practise the areas where mistakes repeat",
    }
}

fn general_suggestion(subject: Subject) -> &'static str {
    match subject {
        Subject::Chinese => "建议多读优秀文章，培养语感，提高写作能力",
        Subject::Math => "Do more exercises to build logical thinking",
        Subject::English => "Listen and speak more to build an English environment",
        Subject::General => "Keep practising to consolidate what you have learned",
    }
}

impl Dispatcher {
    /// Analyze every question concurrently. Failures are recorded per question and
    /// never abort the batch; results keep the input order.
    pub async fn analyze_questions(&self, subject: &str, questions: Vec<Question>) -> BatchReport {
        let parsed = Subject::parse(subject);
        let analyzer = self.analyzer(parsed);
        info!(
            "Starting batch analysis for subject '{}': {} question(s)",
            subject,
            questions.len()
        );

        let tasks = questions.iter().cloned().map(|question| {
            let analyzer: Arc<dyn SubjectAnalyzer> = Arc::clone(&analyzer);
            tokio::task::spawn_blocking(move || {
                let outcome = route_question(analyzer.as_ref(), &question);
                (question.number, outcome)
            })
        });
        let joined = join_all(tasks).await;

        let results: Vec<QuestionResult> = joined
            .into_iter()
            .zip(questions.iter())
            .map(|(joined, question)| match joined {
                Ok((number, Ok(result))) => QuestionResult::ok(number, result),
                Ok((number, Err(e))) => {
                    error!("Error analyzing question {}: {}", number, e);
                    QuestionResult::failed(number, e.to_string())
                }
                Err(e) => {
                    error!("Analysis task for question {} failed: {}", question.number, e);
                    QuestionResult::failed(question.number, format!("Internal error: {}", e))
                }
            })
            .collect();

        let statistics = statistics(&results);
        let suggestions = suggestions(parsed, &statistics, self.batch_config().suggestion_share);
        let summary = format!(
            "Analysed {} {} question(s): {} succeeded ({:.1}% success rate). Review the per-question results and suggestions.",
            statistics.total_questions,
            parsed,
            statistics.successful_analyses,
            success_rate(&statistics)
        );
        info!(
            "Finished batch analysis: {}/{} question(s) succeeded",
            statistics.successful_analyses, statistics.total_questions
        );

        BatchReport {
            success: true,
            metadata: BatchMetadata {
                subject: subject.to_string(),
                total_questions: questions.len(),
                analyzed_questions: results.len(),
                timestamp: Utc::now(),
            },
            results,
            statistics,
            suggestions,
            summary,
        }
    }
}

fn statistics(results: &[QuestionResult]) -> BatchStatistics {
    let mut stats = BatchStatistics {
        total_questions: results.len(),
        successful_analyses: results.iter().filter(|r| r.success).count(),
        error_types: BTreeMap::new(),
    };
    for result in results.iter().filter_map(|r| r.result.as_ref()) {
        for finding in result.findings.iter().filter(|f| f.is_error()) {
            *stats
                .error_types
                .entry(finding.kind.to_string())
                .or_insert(0) += 1;
        }
    }
    stats
}

fn success_rate(stats: &BatchStatistics) -> f64 {
    if stats.total_questions == 0 {
        0.0
    } else {
        stats.successful_analyses as f64 / stats.total_questions as f64 * 100.0
    }
}

/// One suggestion per error type seen in more than `share` of the questions,
/// then the subject's general suggestion.
fn suggestions(subject: Subject, stats: &BatchStatistics, share: f64) -> Vec<Suggestion> {
    let threshold = stats.total_questions as f64 * share;
    let mut out: Vec<Suggestion> = stats
        .error_types
        .iter()
        .filter(|(_, count)| **count as f64 > threshold)
        .map(|(kind, _)| Suggestion::new(kind.as_str(), error_type_suggestion(subject, kind)))
        .collect();
    out.push(Suggestion::new("general", general_suggestion(subject)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_batch_keeps_order_and_isolates_failures() {
        let questions = vec![
            Question::new(1, "5+3=9", QuestionType::Calculation),
            Question::new(2, "   ", QuestionType::Calculation),
            Question::new(3, "9-4=6", QuestionType::Text("fill_in".into())),
        ];
        let report = Dispatcher::new().analyze_questions("math", questions).await;

        let numbers: Vec<u32> = report.results.iter().map(|r| r.question_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(report.results[0].success);
        assert!(!report.results[1].success);
        assert!(report.results[1].error.as_deref().unwrap().contains("Malformed"));
        assert!(report.results[2].success);

        assert_eq!(report.statistics.total_questions, 3);
        assert_eq!(report.statistics.successful_analyses, 2);
        assert_eq!(report.statistics.error_types.get("calculation"), Some(&2));
        assert_eq!(report.metadata.analyzed_questions, 3);

        let kinds: Vec<&str> = report.suggestions.iter().map(|s| s.kind.as_str()).collect();
        assert_eq!(kinds, vec!["calculation", "general"]);
    }

    #[test]
    fn test_rare_error_types_get_no_suggestion() {
        let mut stats = BatchStatistics {
            total_questions: 10,
            successful_analyses: 10,
            error_types: BTreeMap::new(),
        };
        stats.error_types.insert("grammar".into(), 3);
        stats.error_types.insert("punctuation".into(), 4);
        let s = suggestions(Subject::Chinese, &stats, 0.3);
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].kind, "punctuation");
        assert_eq!(s[1].kind, "general");
    }

    #[test]
    fn test_route_question_uses_type_specific_path() {
        let analyzer = crate::math::MathAnalyzer::default();
        let q = Question::new(7, "2+2=4", QuestionType::TrueFalse);
        let result = route_question(&analyzer, &q).unwrap();
        assert_eq!(result.correct_rate, 100);

        let bad = Question::new(8, "2+\u{FFFD}=4", QuestionType::TrueFalse);
        assert!(route_question(&analyzer, &bad).is_err());
    }
}
