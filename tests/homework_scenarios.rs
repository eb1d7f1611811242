//! End-to-end scenarios through the public dispatcher API.

use educheck::chinese::ChineseAnalyzer;
use educheck::chinese::segment::{Segmenter, Token};
use educheck::math::validate::detect_concept_errors;
use educheck::types::{AnalysisResponse, Question, QuestionType};
use educheck::{Dispatcher, EduCheckError, FindingKind, Subject};
use std::sync::Arc;

#[test]
fn wrong_sum_scores_zero_with_addition_finding() {
    let result = Dispatcher::new().analyze_homework("math", "5+3=9").unwrap();
    assert_eq!(result.correct_rate, 0);
    assert_eq!(result.findings.len(), 1);
    assert_eq!(result.findings[0].bucket(), "addition");
    assert_eq!(result.mistakes.len(), 1);
    assert_eq!(result.mistakes[0].correct, "8");
    assert!(result.suggestions.iter().any(|s| s.kind == "addition"));
    assert_eq!(result.suggestions.last().unwrap().kind, "general");
}

#[test]
fn chinese_de_before_verb_gets_grammar_suggestion() {
    let result = Dispatcher::new()
        .analyze_homework("chinese", "他快速的跑着")
        .unwrap();
    let usage = result
        .findings
        .iter()
        .find(|f| f.kind == FindingKind::Grammar && f.bucket() == "usage")
        .expect("usage finding");
    assert!(usage.span.text.contains('的'));
    assert!(result.suggestions.iter().any(|s| s.kind == "grammar"));
}

#[test]
fn english_agreement_error() {
    let result = Dispatcher::new()
        .analyze_homework("english", "He are happy")
        .unwrap();
    let agreement = result
        .findings
        .iter()
        .find(|f| f.bucket() == "agreement")
        .expect("agreement finding");
    assert_eq!(agreement.span.text, "He are");
    assert!(result.vocabulary.is_some());
}

#[test]
fn unsupported_subject_is_still_a_result() {
    let response = Dispatcher::new().respond("art", "Draw a tree with green leaves");
    assert!(response.success);
    let result = response.result.unwrap();
    assert_eq!(result.subject, Subject::General);
    assert!(result.correct_rate <= 100);
    assert_eq!(result.findings[0].bucket(), "incomplete");
}

#[test]
fn clean_inputs_score_full_marks() {
    let d = Dispatcher::new();
    for (subject, text) in [
        ("math", "1+1=2"),
        ("语文", "我喜欢读书。"),
        ("english", "The boy reads a book."),
        ("english", "It's a sunny day."),
        ("english", "Tom is my friend."),
        ("english", "The price is 3.5 dollars."),
    ] {
        let result = d.analyze_homework(subject, text).unwrap();
        assert!(result.findings.is_empty(), "{}: {:?}", subject, result.findings);
        assert!(result.mistakes.is_empty());
        assert_eq!(result.correct_rate, 100, "{}", subject);
    }
}

#[test]
fn empty_input_scores_zero() {
    let d = Dispatcher::new();
    for subject in ["math", "chinese", "english", "art"] {
        let result = d.analyze_homework(subject, "").unwrap();
        assert_eq!(result.correct_rate, 0, "{}", subject);
        assert!(result.findings.is_empty());
    }
}

#[test]
fn analysis_is_idempotent() {
    let d = Dispatcher::new();
    let inputs = [
        ("math", "5+3=9  12÷4=3  x+x=2x"),
        ("chinese", "他很很开心地玩耍， 我们也跑得快。。"),
        ("english", "She ate a apple. Yesterday is my birthday. He can played."),
        ("art", "Draw draw the sky"),
    ];
    for (subject, text) in inputs {
        let first = d.analyze_homework(subject, text).unwrap();
        let second = d.analyze_homework(subject, text).unwrap();
        assert_eq!(first, second, "{}", subject);
    }
}

#[test]
fn correct_rate_stays_in_bounds() {
    let d = Dispatcher::new();
    let texts = [
        ("math", "1+1=3 2+2=5 3+3=7"),
        ("chinese", "，，，。。。！！"),
        ("english", "Xyz qwv. Hapy dgo runz."),
        ("art", "a a a"),
    ];
    for (subject, text) in texts {
        let result = d.analyze_homework(subject, text).unwrap();
        assert!(result.correct_rate <= 100);
    }
}

#[test]
fn concept_checker_flags_each_wrong_fact_once() {
    for a in 0..12u64 {
        for b in 1..12u64 {
            let right = [
                format!("{}+{}={}", a, b, a + b),
                format!("{}×{}={}", a, b, a * b),
                format!("{}-{}={}", a + b, b, a),
            ];
            for text in &right {
                assert!(detect_concept_errors(text).is_empty(), "{}", text);
            }
            let wrong = format!("{}+{}={}", a, b, a + b + 1);
            let found = detect_concept_errors(&wrong);
            assert_eq!(found.len(), 1, "{}", wrong);
            assert_eq!(found[0].bucket(), "addition");
        }
    }
}

struct OfflineSegmenter;

impl Segmenter for OfflineSegmenter {
    fn segment(&self, _text: &str) -> educheck::Result<Vec<Token>> {
        Err(EduCheckError::capability("segmenter", "dictionary unavailable"))
    }
}

#[test]
fn capability_failure_fails_the_whole_call() {
    let d = Dispatcher::new().with_analyzer(Arc::new(ChineseAnalyzer::with_segmenter(Arc::new(
        OfflineSegmenter,
    ))));
    let response: AnalysisResponse = d.respond("chinese", "他快速的跑着");
    assert!(!response.success);
    assert!(response.result.is_none());
    assert!(response.error.unwrap().contains("segmenter"));
}

#[tokio::test]
async fn batch_with_malformed_middle_question() {
    let questions = vec![
        Question::new(1, "5+3=9", QuestionType::Calculation),
        Question::new(2, "7\u{FFFD}+1=8", QuestionType::Calculation),
        Question::new(3, "6×7=41", QuestionType::Text("fill_blank".into())),
    ];
    let report = Dispatcher::new().analyze_questions("数学", questions).await;

    assert_eq!(report.results.len(), 3);
    assert!(report.results[0].success);
    assert!(!report.results[1].success);
    assert_eq!(report.results[1].question_number, 2);
    assert!(report.results[1].error.is_some());
    assert!(report.results[2].success);
    for i in [0, 2] {
        let result = report.results[i].result.as_ref().unwrap();
        assert_eq!(result.findings.len(), 1);
    }

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["results"][1]["success"], false);
    assert_eq!(json["results"][1]["questionNumber"], 2);
    assert_eq!(json["results"][0]["correctRate"], 0);
    assert_eq!(json["metadata"]["totalQuestions"], 3);
}

#[test]
fn runaway_math_lines_are_unverified_not_fatal() {
    let d = Dispatcher::new();
    let deep = format!("{}1{}=1", "(".repeat(100_000), ")".repeat(100_000));
    for text in [
        "((((((((x^16)^16)^16)^16)^16)^16)^16)^16)=x",
        "(a+b+c+d+e+f+g+h+i+j+k+l)^16=1",
        deep.as_str(),
    ] {
        let result = d.analyze_homework("math", text).unwrap();
        assert!(!result.findings.is_empty());
        assert!(
            result
                .findings
                .iter()
                .all(|f| f.sub_kind.as_deref() == Some("unverified"))
        );
        assert_eq!(result.correct_rate, 0);
    }
}

#[tokio::test]
async fn deeply_nested_question_does_not_sink_the_batch() {
    let deep = format!("{}2{}=2", "(".repeat(50_000), ")".repeat(50_000));
    let questions = vec![
        Question::new(1, "2+2=4", QuestionType::Calculation),
        Question::new(2, deep, QuestionType::Calculation),
        Question::new(3, "3×3=9", QuestionType::Calculation),
    ];
    let report = Dispatcher::new().analyze_questions("math", questions).await;

    assert_eq!(report.statistics.successful_analyses, 3);
    assert_eq!(report.results[0].result.as_ref().unwrap().correct_rate, 100);
    assert_eq!(report.results[1].result.as_ref().unwrap().correct_rate, 0);
    assert_eq!(report.results[2].result.as_ref().unwrap().correct_rate, 100);
}
