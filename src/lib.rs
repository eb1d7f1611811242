pub mod aggregate;
pub mod analyzer;
pub mod chinese;
pub mod config;
pub mod dispatch;
pub mod english;
pub mod error;
pub mod general;
pub mod math;
pub mod types;

pub use analyzer::{AnalyzerOutput, SubjectAnalyzer};
pub use dispatch::Dispatcher;
pub use error::{EduCheckError, Result};
pub use types::{AnalysisResponse, AnalysisResult, Finding, FindingKind, Subject};
