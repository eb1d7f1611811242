use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure loaded from educheck.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub math: MathConfig,
    pub english: EnglishConfig,
    pub batch: BatchConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Tolerances for the arithmetic validator
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MathConfig {
    pub tolerance: f64,
}

impl Default for MathConfig {
    fn default() -> Self {
        Self { tolerance: 1e-4 }
    }
}

/// English analyzer knobs: dictionary source, spelling search, style thresholds
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EnglishConfig {
    /// Extra word list (one word per line, optional POS tag after whitespace)
    pub dictionary_path: Option<PathBuf>,
    pub max_edit_distance: usize,
    pub max_spelling_suggestions: usize,
    pub long_sentence_tokens: usize,
    pub low_complexity_threshold: f64,
}

impl Default for EnglishConfig {
    fn default() -> Self {
        Self {
            dictionary_path: None,
            max_edit_distance: 2,
            max_spelling_suggestions: 3,
            long_sentence_tokens: 30,
            low_complexity_threshold: 0.3,
        }
    }
}

/// Per-question batch behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Caller-side timeout around a whole batch; 0 disables it
    pub timeout_ms: u64,
    /// An error bucket earns its own batch suggestion above this share of questions
    pub suggestion_share: f64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            suggestion_share: 0.3,
        }
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: "educheck=info".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env() -> Self {
        Self {
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "educheck=info".to_string()),
        }
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables
    /// Uses EDUCHECK_CONFIG environment variable or defaults to "educheck.toml"
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(env_path) = std::env::var("EDUCHECK_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::from_path(".env");
        }

        let config_path =
            std::env::var("EDUCHECK_CONFIG").unwrap_or_else(|_| "educheck.toml".to_string());

        let mut config: Config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            toml::from_str(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();
        config.runtime = RuntimeConfig::load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Env-first overrides; unparsable values are ignored with a warning
    pub fn apply_env_overrides(&mut self) {
        if let Some(tol) = env_parse::<f64>("EDUCHECK_MATH_TOLERANCE") {
            self.math.tolerance = tol;
        }
        if let Ok(path) = std::env::var("EDUCHECK_DICTIONARY")
            && !path.trim().is_empty()
        {
            self.english.dictionary_path = Some(PathBuf::from(path));
        }
        if let Some(d) = env_parse::<usize>("EDUCHECK_MAX_EDIT_DISTANCE") {
            self.english.max_edit_distance = d;
        }
        if let Some(n) = env_parse::<usize>("EDUCHECK_MAX_SPELLING_SUGGESTIONS") {
            self.english.max_spelling_suggestions = n;
        }
        if let Some(n) = env_parse::<usize>("EDUCHECK_LONG_SENTENCE_TOKENS") {
            self.english.long_sentence_tokens = n;
        }
        if let Some(t) = env_parse::<f64>("EDUCHECK_LOW_COMPLEXITY") {
            self.english.low_complexity_threshold = t;
        }
        if let Some(ms) = env_parse::<u64>("EDUCHECK_BATCH_TIMEOUT_MS") {
            self.batch.timeout_ms = ms;
        }
    }

    /// Validate and clamp values
    pub fn validate(&mut self) -> anyhow::Result<()> {
        if !(self.math.tolerance > 0.0 && self.math.tolerance < 1.0) {
            anyhow::bail!(
                "math.tolerance must be in (0, 1), got {}",
                self.math.tolerance
            );
        }
        if self.english.max_edit_distance == 0 {
            self.english.max_edit_distance = 1;
        } else if self.english.max_edit_distance > 4 {
            tracing::warn!(
                "max_edit_distance {} exceeds max 4, clamping to 4",
                self.english.max_edit_distance
            );
            self.english.max_edit_distance = 4;
        }
        self.english.max_spelling_suggestions = self.english.max_spelling_suggestions.clamp(1, 10);
        if self.english.long_sentence_tokens == 0 {
            anyhow::bail!("english.long_sentence_tokens must be > 0");
        }
        if !(0.0..=1.0).contains(&self.english.low_complexity_threshold) {
            anyhow::bail!("english.low_complexity_threshold must be between 0.0 and 1.0");
        }
        if !(0.0..=1.0).contains(&self.batch.suggestion_share) {
            anyhow::bail!("batch.suggestion_share must be between 0.0 and 1.0");
        }
        if let Some(path) = &self.english.dictionary_path
            && !path.exists()
        {
            tracing::warn!(
                "Dictionary file {} does not exist, using the built-in lexicon only",
                path.display()
            );
            self.english.dictionary_path = None;
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring unparsable value for {}: {:?}", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [english]
            long_sentence_tokens = 20
            "#,
        )
        .unwrap();
        assert_eq!(config.english.long_sentence_tokens, 20);
        assert_eq!(config.english.max_edit_distance, 2);
        assert_eq!(config.math.tolerance, 1e-4);
        assert_eq!(config.batch.timeout_ms, 30_000);
    }

    #[test]
    fn test_validate_clamps_edit_distance() {
        let mut config = Config::default();
        config.english.max_edit_distance = 9;
        config.english.max_spelling_suggestions = 0;
        config.validate().unwrap();
        assert_eq!(config.english.max_edit_distance, 4);
        assert_eq!(config.english.max_spelling_suggestions, 1);
    }

    #[test]
    fn test_validate_rejects_bad_tolerance() {
        let mut config = Config::default();
        config.math.tolerance = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_dictionary_falls_back() {
        let mut config = Config::default();
        config.english.dictionary_path = Some(PathBuf::from("/nonexistent/words.txt"));
        config.validate().unwrap();
        assert!(config.english.dictionary_path.is_none());
    }
}
