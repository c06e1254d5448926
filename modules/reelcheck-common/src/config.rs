use std::path::PathBuf;

use crate::error::ReelCheckError;

pub const DEFAULT_CLAUDE_MODEL: &str = "claude-haiku-4-5-20251001";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_PERPLEXITY_MODEL: &str = "sonar-pro";
pub const DEFAULT_ARTIFACT_DIR: &str = "./reels";
pub const DEFAULT_SCRAPE_CONCURRENCY: usize = 4;

/// Application configuration loaded from environment variables.
/// Contains secrets plus the few knobs that differ between deployments.
#[derive(Debug, Clone)]
pub struct Config {
    // AI / LLM
    pub anthropic_api_key: String,
    pub gemini_api_key: String,
    pub openai_api_key: Option<String>,
    pub perplexity_api_key: Option<String>,

    // Search
    pub serper_api_key: String,

    // Models
    pub claude_model: String,
    pub gemini_model: String,
    pub perplexity_model: String,

    // Media + retrieval
    pub artifact_dir: PathBuf,
    pub scrape_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ReelCheckError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. `from_env` delegates here; tests pass a map.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ReelCheckError> {
        let required = |key: &str| -> Result<String, ReelCheckError> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ReelCheckError::Config(format!("{key} environment variable is required")))
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let scrape_concurrency = match optional("SCRAPE_CONCURRENCY") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    ReelCheckError::Config(format!("SCRAPE_CONCURRENCY must be a positive integer, got {raw:?}"))
                })?,
            None => DEFAULT_SCRAPE_CONCURRENCY,
        };

        let config = Self {
            anthropic_api_key: required("ANTHROPIC_API_KEY")?,
            gemini_api_key: required("GEMINI_API_KEY")?,
            openai_api_key: optional("OPENAI_API_KEY"),
            perplexity_api_key: optional("PERPLEXITY_API_KEY"),
            serper_api_key: required("SERPER_API_KEY")?,
            claude_model: optional("CLAUDE_MODEL").unwrap_or_else(|| DEFAULT_CLAUDE_MODEL.to_string()),
            gemini_model: optional("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            perplexity_model: optional("PERPLEXITY_MODEL")
                .unwrap_or_else(|| DEFAULT_PERPLEXITY_MODEL.to_string()),
            artifact_dir: optional("REELCHECK_ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACT_DIR)),
            scrape_concurrency,
        };

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let head: String = val.chars().take(5).collect();
            format!("{}...({} chars)", head, val.chars().count())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => preview(v),
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  ANTHROPIC_API_KEY: {}", preview(&self.anthropic_api_key));
        tracing::info!("  GEMINI_API_KEY: {}", preview(&self.gemini_api_key));
        tracing::info!("  OPENAI_API_KEY: {}", preview_opt(&self.openai_api_key));
        tracing::info!("  PERPLEXITY_API_KEY: {}", preview_opt(&self.perplexity_api_key));
        tracing::info!("  SERPER_API_KEY: {}", preview(&self.serper_api_key));
        tracing::info!("  ARTIFACT_DIR: {}", self.artifact_dir.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("ANTHROPIC_API_KEY", "sk-ant-test"),
        ("GEMINI_API_KEY", "gem-test"),
        ("SERPER_API_KEY", "serper-test"),
    ];

    #[test]
    fn defaults_apply_when_only_required_keys_set() {
        let config = Config::from_lookup(lookup(REQUIRED)).unwrap();
        assert_eq!(config.claude_model, DEFAULT_CLAUDE_MODEL);
        assert_eq!(config.gemini_model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.perplexity_model, DEFAULT_PERPLEXITY_MODEL);
        assert_eq!(config.artifact_dir, PathBuf::from("./reels"));
        assert_eq!(config.scrape_concurrency, 4);
        assert!(config.openai_api_key.is_none());
        assert!(config.perplexity_api_key.is_none());
    }

    #[test]
    fn missing_required_key_is_config_error() {
        let err = Config::from_lookup(lookup(&REQUIRED[..2])).unwrap_err();
        assert!(matches!(err, ReelCheckError::Config(ref m) if m.contains("SERPER_API_KEY")));
    }

    #[test]
    fn blank_optional_key_counts_as_unset() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("OPENAI_API_KEY", "   "));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn bad_scrape_concurrency_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SCRAPE_CONCURRENCY", "zero"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SCRAPE_CONCURRENCY", "0"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn overrides_are_read() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("CLAUDE_MODEL", "claude-sonnet-4-5"));
        pairs.push(("REELCHECK_ARTIFACT_DIR", "/tmp/reels"));
        pairs.push(("SCRAPE_CONCURRENCY", "8"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.claude_model, "claude-sonnet-4-5");
        assert_eq!(config.artifact_dir, PathBuf::from("/tmp/reels"));
        assert_eq!(config.scrape_concurrency, 8);
    }
}
