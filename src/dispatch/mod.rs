//! Subject routing: picks the analyzer for a subject and turns its output
//! into an [`AnalysisResult`].

pub mod batch;

use crate::aggregate;
use crate::analyzer::SubjectAnalyzer;
use crate::chinese::ChineseAnalyzer;
use crate::config::{BatchConfig, Config};
use crate::english::EnglishAnalyzer;
use crate::error::Result;
use crate::general::GeneralAnalyzer;
use crate::math::MathAnalyzer;
use crate::types::{AnalysisRequest, AnalysisResponse, AnalysisResult, Subject};
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::info;

static ANALYZERS: Lazy<Vec<Arc<dyn SubjectAnalyzer>>> = Lazy::new(|| {
    vec![
        Arc::new(MathAnalyzer::default()),
        Arc::new(ChineseAnalyzer::default()),
        Arc::new(EnglishAnalyzer::default()),
        Arc::new(GeneralAnalyzer),
    ]
});

/// Holds one analyzer per subject. Cheap to clone; analyzers are shared.
#[derive(Clone)]
pub struct Dispatcher {
    analyzers: Vec<Arc<dyn SubjectAnalyzer>>,
    batch: BatchConfig,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Built-in analyzers with default settings.
    pub fn new() -> Self {
        Self {
            analyzers: ANALYZERS.clone(),
            batch: BatchConfig::default(),
        }
    }

    /// Analyzers built from `config`; fails if the configured dictionary cannot be read.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            analyzers: vec![
                Arc::new(MathAnalyzer::new(&config.math)),
                Arc::new(ChineseAnalyzer::new()),
                Arc::new(EnglishAnalyzer::new(&config.english)?),
                Arc::new(GeneralAnalyzer),
            ],
            batch: config.batch.clone(),
        })
    }

    /// Replace the analyzer registered for the same subject.
    pub fn with_analyzer(mut self, analyzer: Arc<dyn SubjectAnalyzer>) -> Self {
        let subject = analyzer.subject();
        self.analyzers.retain(|a| a.subject() != subject);
        self.analyzers.push(analyzer);
        self
    }

    /// The analyzer for `subject`, or the general one.
    pub fn analyzer(&self, subject: Subject) -> Arc<dyn SubjectAnalyzer> {
        self.analyzers
            .iter()
            .find(|a| a.subject() == subject)
            .or_else(|| self.analyzers.iter().find(|a| a.subject() == Subject::General))
            .cloned()
            .unwrap_or_else(|| Arc::new(GeneralAnalyzer))
    }

    pub(crate) fn batch_config(&self) -> &BatchConfig {
        &self.batch
    }

    /// Analyze one block of recognized text. Unknown subjects use the general analyzer.
    pub fn analyze_homework(&self, subject: &str, text: &str) -> Result<AnalysisResult> {
        let analyzer = self.analyzer(Subject::parse(subject));
        info!(
            "Starting homework analysis for subject '{}' ({} chars) with {} analyzer",
            subject,
            text.chars().count(),
            analyzer.subject()
        );
        let output = analyzer.analyze(text)?;
        let result = aggregate::assemble(analyzer.subject(), output, analyzer.suggestion_table());
        info!(
            "Finished {} analysis: {} finding(s), correct rate {}%",
            result.subject,
            result.findings.len(),
            result.correct_rate
        );
        Ok(result)
    }

    /// Same as [`Self::analyze_homework`], in the wire shape.
    pub fn respond(&self, subject: &str, text: &str) -> AnalysisResponse {
        let outcome = self.analyze_homework(subject, text);
        if let Err(e) = &outcome {
            tracing::error!("Homework analysis failed: {}", e);
        }
        AnalysisResponse::from(outcome)
    }

    /// Handle a request: a batch when questions are present, single text otherwise.
    pub async fn handle(&self, request: AnalysisRequest) -> serde_json::Value {
        let rendered = match request.questions {
            Some(questions) => {
                serde_json::to_value(self.analyze_questions(&request.subject, questions).await)
            }
            None => serde_json::to_value(self.respond(&request.subject, &request.text)),
        };
        rendered.unwrap_or_else(|e| {
            serde_json::json!({ "success": false, "error": format!("Serialization error: {}", e) })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_routing() {
        let d = Dispatcher::new();
        assert_eq!(d.analyzer(Subject::Math).subject(), Subject::Math);
        assert_eq!(d.analyzer(Subject::Chinese).subject(), Subject::Chinese);
        assert_eq!(d.analyzer(Subject::English).subject(), Subject::English);
        assert_eq!(d.analyzer(Subject::General).subject(), Subject::General);
    }

    #[test]
    fn test_unknown_subject_uses_general() {
        let result = Dispatcher::new().analyze_homework("art", "Draw a cat.").unwrap();
        assert_eq!(result.subject, Subject::General);
        assert_eq!(result.correct_rate, 100);
    }

    #[test]
    fn test_with_analyzer_replaces_subject() {
        let d = Dispatcher::new().with_analyzer(Arc::new(MathAnalyzer::new(
            &crate::config::MathConfig { tolerance: 0.5 },
        )));
        let result = d.analyze_homework("math", "1/3=0.4").unwrap();
        assert_eq!(result.correct_rate, 100);
        assert_eq!(d.analyzers.len(), 4);
    }

    #[tokio::test]
    async fn test_handle_single_text_request() {
        let request: AnalysisRequest =
            serde_json::from_str(r#"{"subject": "math", "text": "5+3=9"}"#).unwrap();
        let value = Dispatcher::new().handle(request).await;
        assert_eq!(value["success"], true);
        assert_eq!(value["correctRate"], 0);
        assert_eq!(value["mistakes"][0]["correct"], "8");
    }
}
