//! English checks: spelling against a lexicon, pattern and tag based grammar
//! rules, sentence structure and a vocabulary profile.

pub mod lexicon;
pub mod tagger;

use crate::aggregate::{self, GeneralPolicy, SuggestionEntry, SuggestionTable};
use crate::analyzer::{AnalyzerOutput, SubjectAnalyzer};
use crate::config::EnglishConfig;
use crate::error::{EduCheckError, Result};
use crate::types::{Finding, FindingKind, Subject, Suggestion, VocabularyProfile};
use lexicon::Lexicon;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tagger::{LexiconTagger, Tagger, clitic_verb, is_noun, is_verb};

/// A `.` between two digits is a decimal point, not a sentence end.
static SENTENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:[0-9]\.[0-9]|[^.!?])+").expect("sentence regex"));

static WORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9]+(?:\.[0-9]+)+|[A-Za-z0-9]+(?:['\x{2019}][A-Za-z]+)?").expect("word regex")
});

pub static ENGLISH_SUGGESTIONS: SuggestionTable = SuggestionTable {
    bucket: aggregate::by_kind,
    entries: &[
        SuggestionEntry {
            bucket: "spelling",
            kind: "spelling",
            message: "Focus on improving spelling accuracy: use a dictionary and practise commonly misspelled words",
        },
        SuggestionEntry {
            bucket: "grammar",
            kind: "grammar",
            message: "Review basic grammar rules: study grammar patterns and do grammar exercises",
        },
        SuggestionEntry {
            bucket: "structure",
            kind: "structure",
            message: "Work on sentence structure: practise writing clear, complete sentences",
        },
    ],
    fallback: "Review the marked sentences carefully",
    general: "Regular reading and writing practice will help improve overall English skills",
    general_policy: GeneralPolicy::Always,
    show_share: false,
};

const VOCABULARY_KIND: &str = "vocabulary";
const VOCABULARY_SUGGESTION: &str = "Try to use more varied and advanced vocabulary";

struct GrammarPattern {
    sub_kind: &'static str,
    regex: Regex,
    message: &'static str,
    /// Known false positives for this pattern
    skip: fn(&Captures<'_>, &Lexicon) -> bool,
    correction: fn(&Captures<'_>) -> Option<String>,
}

fn group<'t>(caps: &Captures<'t>, i: usize) -> &'t str {
    caps.get(i).map(|m| m.as_str()).unwrap_or_default()
}

fn never(_: &Captures<'_>, _: &Lexicon) -> bool {
    false
}

fn no_correction(_: &Captures<'_>) -> Option<String> {
    None
}

static GRAMMAR_PATTERNS: Lazy<Vec<GrammarPattern>> = Lazy::new(|| {
    let re = |pattern: &str| Regex::new(pattern).expect("grammar pattern regex");
    vec![
        GrammarPattern {
            sub_kind: "agreement",
            regex: re(r"(?i)\b(I|he|she|it)\s+(are|were|have\s+been)\b"),
            message: "Subject-verb agreement error",
            skip: |caps, _| {
                group(caps, 1).eq_ignore_ascii_case("i") && group(caps, 2).to_lowercase().starts_with("have")
            },
            correction: |caps| {
                let subject = group(caps, 1);
                let first_person = subject.eq_ignore_ascii_case("i");
                let verb = group(caps, 2).to_lowercase();
                let fixed = match verb.as_str() {
                    "are" if first_person => "am",
                    "are" => "is",
                    "were" => "was",
                    _ => "has been",
                };
                Some(format!("{} {}", subject, fixed))
            },
        },
        GrammarPattern {
            sub_kind: "article",
            regex: re(r"(?i)\b(a)\s+([aeiou][a-z]*)"),
            message: "Article usage error: use \"an\" before vowel sounds",
            skip: |caps, _| {
                let next = group(caps, 2).to_lowercase();
                ["uni", "use", "usu", "uti", "eu", "one", "once"]
                    .iter()
                    .any(|p| next.starts_with(p))
            },
            correction: |caps| {
                let article = if group(caps, 1) == "A" { "An" } else { "an" };
                Some(format!("{} {}", article, group(caps, 2)))
            },
        },
        GrammarPattern {
            sub_kind: "tense",
            regex: re(r"(?i)\b(yesterday|last\s+week|last\s+year)\s+([a-z]+s|is|are)\b"),
            message: "Tense consistency error: use past tense for past events",
            skip: |caps, lexicon| {
                let word = group(caps, 2).to_lowercase();
                word == "was"
                    || (lexicon.contains(&word)
                        && !lexicon.has_tag(&word, "VBZ")
                        && !lexicon.has_tag(&word, "VBP"))
            },
            correction: no_correction,
        },
        GrammarPattern {
            sub_kind: "preposition",
            regex: re(r"(?i)\b(arrive[sd]?|arriving|reach(?:es|ed|ing)?)\s+to\b"),
            message: "Preposition error",
            skip: never,
            correction: |caps| {
                let verb = group(caps, 1);
                if verb.to_lowercase().starts_with("arriv") {
                    Some(format!("{} at", verb))
                } else {
                    Some(verb.to_string())
                }
            },
        },
        GrammarPattern {
            sub_kind: "modal",
            regex: re(r"(?i)\b(must|should|would|could|might|may|can|will)\s+([a-z]+ed|[a-z]+s)\b"),
            message: "Modal verb error: use base form after modal verbs",
            skip: |caps, lexicon| {
                let word = group(caps, 2).to_lowercase();
                ["is", "has", "this", "his", "us"].contains(&word.as_str())
                    || word.ends_with("ss")
                    || word.ends_with("us")
                    || (lexicon.contains(&word)
                        && !["VBD", "VBN", "VBZ"].iter().any(|t| lexicon.has_tag(&word, t)))
            },
            correction: no_correction,
        },
    ]
});

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorStatistics {
    pub total: usize,
    pub by_type: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnglishStatistics {
    /// Sentences with at least one word
    pub sentences: usize,
    pub errors: ErrorStatistics,
    pub vocabulary: VocabularyProfile,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnglishReport {
    pub errors: Vec<Finding>,
    pub statistics: EnglishStatistics,
    pub suggestions: Vec<Suggestion>,
    pub summary: String,
}

struct Sentence<'a> {
    text: &'a str,
    /// Byte offset in the full text
    start: usize,
    words: Vec<(usize, &'a str)>,
}

pub struct EnglishAnalyzer {
    lexicon: Arc<Lexicon>,
    tagger: Arc<dyn Tagger>,
    config: EnglishConfig,
}

impl Default for EnglishAnalyzer {
    fn default() -> Self {
        let lexicon = Lexicon::base();
        Self {
            tagger: Arc::new(LexiconTagger::new(Arc::clone(&lexicon))),
            lexicon,
            config: EnglishConfig::default(),
        }
    }
}

impl EnglishAnalyzer {
    /// Loads the configured extra word list on top of the base lexicon.
    pub fn new(config: &EnglishConfig) -> Result<Self> {
        let lexicon = Lexicon::load(config.dictionary_path.as_deref())
            .map_err(|e| EduCheckError::capability("dictionary", e.to_string()))?;
        Ok(Self {
            tagger: Arc::new(LexiconTagger::new(Arc::clone(&lexicon))),
            lexicon,
            config: config.clone(),
        })
    }

    pub fn with_tagger(mut self, tagger: Arc<dyn Tagger>) -> Self {
        self.tagger = tagger;
        self
    }

    fn sentences<'a>(&self, text: &'a str) -> Vec<Sentence<'a>> {
        SENTENCE_RE
            .find_iter(text)
            .map(|m| Sentence {
                text: m.as_str(),
                start: m.start(),
                words: WORD_RE
                    .find_iter(m.as_str())
                    .map(|w| (m.start() + w.start(), w.as_str()))
                    .collect(),
            })
            .filter(|s| !s.words.is_empty())
            .collect()
    }

    fn tag(&self, words: &[&str]) -> Result<Vec<(String, String)>> {
        let tagged = self.tagger.tag(words).map_err(|e| match e {
            EduCheckError::Capability { .. } => e,
            other => EduCheckError::capability("tagger", other.to_string()),
        })?;
        if tagged.len() != words.len() {
            return Err(EduCheckError::capability(
                "tagger",
                format!("expected {} tags, got {}", words.len(), tagged.len()),
            ));
        }
        Ok(tagged)
    }

    /// Unknown words with close dictionary matches. Capitalized words are taken
    /// as names when they sit mid-sentence, or open it right before a verb.
    fn check_spelling(
        &self,
        text: &str,
        sentence: &Sentence<'_>,
        tagged: &[(String, String)],
    ) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (i, &(offset, word)) in sentence.words.iter().enumerate() {
            if word.chars().any(|c| c.is_ascii_digit()) || self.lexicon.contains(word) {
                continue;
            }
            let name_position = i > 0 || tagged.get(1).is_some_and(|(_, t)| is_verb(t));
            if looks_like_name(word) && name_position {
                continue;
            }
            let candidates = self.lexicon.suggest(
                word,
                self.config.max_edit_distance,
                self.config.max_spelling_suggestions,
            );
            if candidates.is_empty() {
                continue;
            }
            findings.push(
                Finding::new(
                    FindingKind::Spelling,
                    word,
                    format!(
                        "Possible spelling error in \"{}\". Did you mean: {}?",
                        word,
                        candidates.join(", ")
                    ),
                )
                .at(char_offset(text, offset))
                .with_candidates(candidates),
            );
        }
        findings
    }

    fn check_patterns(&self, text: &str, sentence: &Sentence<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        for pattern in GRAMMAR_PATTERNS.iter() {
            for caps in pattern.regex.captures_iter(sentence.text) {
                let Some(whole) = caps.get(0) else { continue };
                if (pattern.skip)(&caps, &self.lexicon) {
                    continue;
                }
                let mut finding = Finding::new(FindingKind::Grammar, whole.as_str(), pattern.message)
                    .with_sub_kind(pattern.sub_kind)
                    .at(char_offset(text, sentence.start + whole.start()));
                if let Some(fixed) = (pattern.correction)(&caps) {
                    finding = finding.with_correction(fixed);
                }
                findings.push(finding);
            }
        }
        findings
    }

    fn check_tags(
        &self,
        text: &str,
        sentence: &Sentence<'_>,
        tagged: &[(String, String)],
    ) -> Vec<Finding> {
        let mut findings = Vec::new();

        for (i, pair) in tagged.windows(2).enumerate() {
            let ((word, tag), (next, next_tag)) = (&pair[0], &pair[1]);
            if tag == "JJ" && !is_noun(next_tag) {
                findings.push(
                    Finding::new(
                        FindingKind::Grammar,
                        format!("{} {}", word, next),
                        "Incorrect adjective placement",
                    )
                    .with_sub_kind("collocation")
                    .at(char_offset(text, sentence.words[i].0)),
                );
            }
        }

        let trimmed = sentence.text.trim();
        let start = sentence.start + (sentence.text.len() - sentence.text.trim_start().len());
        // A contraction supplies both: "it's", "that's", "we'll".
        let has_subject = tagged
            .iter()
            .any(|(w, t)| is_noun(t) || t == "PRP" || t == "EX" || clitic_verb(w).is_some());
        let has_verb = tagged
            .iter()
            .any(|(w, t)| is_verb(t) || clitic_verb(w).is_some());
        if !has_subject || !has_verb {
            findings.push(
                Finding::new(
                    FindingKind::Structure,
                    trimmed,
                    "Incomplete sentence structure: missing subject or verb",
                )
                .with_sub_kind("incomplete")
                .at(char_offset(text, start)),
            );
        }
        if tagged.len() > self.config.long_sentence_tokens {
            findings.push(
                Finding::new(
                    FindingKind::Structure,
                    trimmed,
                    "Very long sentence: consider breaking it into smaller ones",
                )
                .with_sub_kind("length")
                .at(char_offset(text, start))
                .as_warning(),
            );
        }
        findings
    }

    /// Full report with spelling, grammar, structure, vocabulary and summary.
    pub fn analyze_text(&self, text: &str) -> Result<EnglishReport> {
        let sentences = self.sentences(text);
        let mut errors = Vec::new();
        let mut grammar = Vec::new();
        let mut structure = Vec::new();
        let mut all_tags: Vec<(String, String)> = Vec::new();

        for sentence in &sentences {
            let words: Vec<&str> = sentence.words.iter().map(|(_, w)| *w).collect();
            let tagged = self.tag(&words)?;
            errors.extend(self.check_spelling(text, sentence, &tagged));
            grammar.extend(self.check_patterns(text, sentence));
            for finding in self.check_tags(text, sentence, &tagged) {
                match finding.kind {
                    FindingKind::Structure => structure.push(finding),
                    _ => grammar.push(finding),
                }
            }
            all_tags.extend(tagged);
        }
        errors.extend(grammar);
        errors.extend(structure);

        let vocabulary = vocabulary_profile(&all_tags);
        let extra = self.extra_suggestions(&vocabulary);
        let suggestions = aggregate::suggestions(&errors, sentences.len(), &ENGLISH_SUGGESTIONS, extra);

        let mut error_stats = ErrorStatistics::default();
        for f in errors.iter().filter(|f| f.is_error()) {
            error_stats.total += 1;
            *error_stats.by_type.entry(f.kind.to_string()).or_insert(0) += 1;
        }
        let summary = summary(error_stats.total, &vocabulary);
        tracing::debug!(
            "english: {} sentence(s), {} word(s), {} error(s)",
            sentences.len(),
            vocabulary.total_words,
            error_stats.total
        );

        Ok(EnglishReport {
            errors,
            statistics: EnglishStatistics {
                sentences: sentences.len(),
                errors: error_stats,
                vocabulary,
            },
            suggestions,
            summary,
        })
    }

    fn extra_suggestions(&self, vocabulary: &VocabularyProfile) -> Vec<Suggestion> {
        if vocabulary.total_words > 0 && vocabulary.complexity < self.config.low_complexity_threshold {
            vec![Suggestion::new(VOCABULARY_KIND, VOCABULARY_SUGGESTION)]
        } else {
            Vec::new()
        }
    }
}

impl SubjectAnalyzer for EnglishAnalyzer {
    fn subject(&self) -> Subject {
        Subject::English
    }

    fn suggestion_table(&self) -> &'static SuggestionTable {
        &ENGLISH_SUGGESTIONS
    }

    fn analyze(&self, text: &str) -> Result<AnalyzerOutput> {
        let report = self.analyze_text(text)?;
        let extra_suggestions = report
            .suggestions
            .into_iter()
            .filter(|s| s.kind == VOCABULARY_KIND)
            .collect();
        Ok(AnalyzerOutput {
            findings: report.errors,
            unit_count: report.statistics.sentences,
            vocabulary: Some(report.statistics.vocabulary),
            extra_suggestions,
            summary: Some(report.summary),
        })
    }
}

fn looks_like_name(word: &str) -> bool {
    let mut chars = word.chars();
    chars.next().is_some_and(char::is_uppercase) && chars.all(char::is_lowercase)
}

fn char_offset(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}

/// Token counts, tag distribution and a complexity score in [0, 1].
pub fn vocabulary_profile(tagged: &[(String, String)]) -> VocabularyProfile {
    let total_words = tagged.len();
    let unique: HashSet<String> = tagged.iter().map(|(w, _)| w.to_lowercase()).collect();
    let mut pos_distribution = BTreeMap::new();
    for (_, tag) in tagged {
        *pos_distribution.entry(tag.clone()).or_insert(0) += 1;
    }
    let complexity = if total_words == 0 {
        0.0
    } else {
        let mean_len =
            tagged.iter().map(|(w, _)| w.chars().count()).sum::<usize>() as f64 / total_words as f64;
        let unique_ratio = unique.len() as f64 / total_words as f64;
        let score = 0.5 * (mean_len / 10.0).min(1.0) + 0.5 * unique_ratio;
        (score * 100.0).round() / 100.0
    };
    VocabularyProfile {
        total_words,
        unique_words: unique.len(),
        pos_distribution,
        complexity,
    }
}

fn summary(error_count: usize, vocabulary: &VocabularyProfile) -> String {
    let error_rate = if vocabulary.total_words == 0 {
        0.0
    } else {
        error_count as f64 / vocabulary.total_words as f64 * 100.0
    };
    format!(
        "Analysis completed with {} errors found ({:.1}% error rate). Vocabulary complexity score: {:.2}. Used {} unique words out of {} total words.",
        error_count, error_rate, vocabulary.complexity, vocabulary.unique_words, vocabulary.total_words
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(text: &str) -> EnglishReport {
        EnglishAnalyzer::default().analyze_text(text).unwrap()
    }

    fn sub_kinds(report: &EnglishReport) -> Vec<&str> {
        report.errors.iter().map(|f| f.bucket()).collect()
    }

    #[test]
    fn test_clean_sentence() {
        let r = report("The boy reads a book.");
        assert!(r.errors.is_empty(), "{:?}", r.errors);
        assert_eq!(r.statistics.vocabulary.total_words, 5);
        assert_eq!(r.statistics.vocabulary.unique_words, 5);
        assert_eq!(r.statistics.vocabulary.complexity, 0.66);
        assert_eq!(r.suggestions.len(), 1);
        assert_eq!(r.suggestions[0].kind, "general");
        assert_eq!(
            r.summary,
            "Analysis completed with 0 errors found (0.0% error rate). Vocabulary complexity score: 0.66. Used 5 unique words out of 5 total words."
        );
    }

    #[test]
    fn test_agreement_error() {
        let r = report("He are happy.");
        assert_eq!(sub_kinds(&r), vec!["agreement"]);
        let f = &r.errors[0];
        assert_eq!(f.span.text, "He are");
        assert_eq!(f.span.position, Some(0));
        assert_eq!(f.correction.as_deref(), Some("He is"));
        assert!(r.suggestions.iter().any(|s| s.kind == "grammar"));
    }

    #[test]
    fn test_agreement_skips_first_person_perfect() {
        let r = report("I have been busy.");
        assert!(!sub_kinds(&r).contains(&"agreement"));
    }

    #[test]
    fn test_article_preposition_and_modal_patterns() {
        let r = report("She ate a apple. We arrived to the park. He can played football.");
        let kinds = sub_kinds(&r);
        assert!(kinds.contains(&"article"));
        assert!(kinds.contains(&"preposition"));
        assert!(kinds.contains(&"modal"));
        let article = r.errors.iter().find(|f| f.bucket() == "article").unwrap();
        assert_eq!(article.correction.as_deref(), Some("an apple"));
        let prep = r.errors.iter().find(|f| f.bucket() == "preposition").unwrap();
        assert_eq!(prep.correction.as_deref(), Some("arrived at"));
    }

    #[test]
    fn test_article_false_positives_skipped() {
        let r = report("She has a uniform. He is a university student.");
        assert!(!sub_kinds(&r).contains(&"article"));
    }

    #[test]
    fn test_tense_pattern() {
        let r = report("Yesterday is my birthday.");
        assert!(sub_kinds(&r).contains(&"tense"));
        let r = report("Yesterday was my birthday.");
        assert!(!sub_kinds(&r).contains(&"tense"));
    }

    #[test]
    fn test_spelling_with_candidates() {
        let r = report("The boy reads a bok.");
        assert_eq!(sub_kinds(&r), vec!["spelling"]);
        let f = &r.errors[0];
        assert_eq!(f.span.text, "bok");
        assert_eq!(f.span.position, Some(16));
        assert!(f.candidates.contains(&"book".to_string()));
        assert!(f.candidates.len() <= 3);
    }

    #[test]
    fn test_words_with_digits_and_far_words_are_not_spelling_errors() {
        let r = report("The boy reads 3rd book. The boy reads xylophonist.");
        assert!(!sub_kinds(&r).contains(&"spelling"));
    }

    #[test]
    fn test_adjective_not_before_noun() {
        let r = report("The happy is boy.");
        let f = r.errors.iter().find(|f| f.bucket() == "collocation").unwrap();
        assert_eq!(f.span.text, "happy is");
        assert_eq!(f.span.position, Some(4));
    }

    #[test]
    fn test_structure_checks() {
        let r = report("Very quickly.");
        assert_eq!(sub_kinds(&r), vec!["incomplete"]);

        let long = format!("The boy reads {}.", vec!["the book"; 20].join(" and "));
        let r = report(&long);
        let f = r.errors.iter().find(|f| f.bucket() == "length").unwrap();
        assert!(!f.is_error());
        assert_eq!(r.statistics.errors.total, 0);
    }

    #[test]
    fn test_low_complexity_suggestion() {
        let r = report("I am. I am. I am. I am.");
        assert!(r.statistics.vocabulary.complexity < 0.3);
        let kinds: Vec<&str> = r.suggestions.iter().map(|s| s.kind.as_str()).collect();
        assert_eq!(kinds, vec!["vocabulary", "general"]);
    }

    #[test]
    fn test_contractions_and_decimals_are_clean() {
        for text in [
            "It's a sunny day.",
            "It\u{2019}s a sunny day.",
            "The price is 3.5 dollars.",
            "We'll go to the zoo.",
        ] {
            let r = report(text);
            assert!(r.errors.is_empty(), "{}: {:?}", text, r.errors);
            assert_eq!(r.statistics.sentences, 1, "{}", text);
        }
        let r = report("The price is 3.5 dollars.");
        assert_eq!(r.statistics.vocabulary.total_words, 5);
    }

    #[test]
    fn test_names_are_not_spelling_errors() {
        let r = report("Tom is my friend. I met Tim at the park.");
        assert!(!sub_kinds(&r).contains(&"spelling"), "{:?}", r.errors);
        let r = report("Teh boy reads a book.");
        assert_eq!(sub_kinds(&r), vec!["spelling"]);
    }

    #[test]
    fn test_vocabulary_suggestion_reaches_the_output() {
        let out = EnglishAnalyzer::default().analyze("I am. I am. I am. I am.").unwrap();
        assert_eq!(out.unit_count, 4);
        let kinds: Vec<&str> = out.extra_suggestions.iter().map(|s| s.kind.as_str()).collect();
        assert_eq!(kinds, vec!["vocabulary"]);
    }

    #[test]
    fn test_empty_text() {
        let out = EnglishAnalyzer::default().analyze("").unwrap();
        assert_eq!(out.unit_count, 0);
        assert!(out.findings.is_empty());
        assert_eq!(out.vocabulary.unwrap().total_words, 0);
    }

    struct BrokenTagger;

    impl Tagger for BrokenTagger {
        fn tag(&self, _words: &[&str]) -> Result<Vec<(String, String)>> {
            Err(EduCheckError::Internal {
                message: "model not loaded".into(),
            })
        }
    }

    #[test]
    fn test_tagger_failure_is_capability_error() {
        let analyzer = EnglishAnalyzer::default().with_tagger(Arc::new(BrokenTagger));
        let err = analyzer.analyze("The boy reads.").unwrap_err();
        assert!(matches!(err, EduCheckError::Capability { capability: "tagger", .. }));
    }
}
