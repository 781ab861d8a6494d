use crate::error::{BrowserError, Result};

pub const API_KEY_VAR: &str = "LLM_API_KEY";
pub const API_BASE_VAR: &str = "LLM_API_BASE";
pub const MODEL_VAR: &str = "LLM_MODEL";

/// Connection settings for the chat-completions endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub api_key: String,

    /// Base URL, always ending in `/`
    pub api_base: String,

    pub model: String,

    pub max_tokens: u32,

    pub temperature: f32,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: normalize_base(&api_base.into()),
            model: model.into(),
            max_tokens: 2048,
            temperature: 0.1,
        }
    }

    /// Read `LLM_API_KEY`, `LLM_API_BASE` and `LLM_MODEL` from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from an arbitrary variable lookup.
    ///
    /// Values are trimmed and stripped of surrounding quotes; a missing or blank value is a
    /// `MissingConfig` error naming the variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|v| clean_value(&v))
                .filter(|v| !v.is_empty())
                .ok_or_else(|| BrowserError::MissingConfig(name.to_string()))
        };

        let api_key = read(API_KEY_VAR)?;
        let api_base = read(API_BASE_VAR)?;
        let model = read(MODEL_VAR)?;

        Ok(Self::new(api_key, api_base, model))
    }

    /// Full URL of the chat-completions route
    pub fn completions_url(&self) -> String {
        format!("{}chat/completions", self.api_base)
    }
}

fn clean_value(raw: &str) -> String {
    raw.trim().trim_matches(|c| c == '"' || c == '\'').trim().to_string()
}

fn normalize_base(base: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    format!("{}/", trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_from_lookup_cleans_values() {
        let config = LlmConfig::from_lookup(lookup(&[
            (API_KEY_VAR, " \"sk-test\" "),
            (API_BASE_VAR, "'https://llm.test/v1'"),
            (MODEL_VAR, "qwen3"),
        ]))
        .unwrap();

        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.api_base, "https://llm.test/v1/");
        assert_eq!(config.model, "qwen3");
        assert_eq!(config.completions_url(), "https://llm.test/v1/chat/completions");
    }

    #[test]
    fn test_missing_variable_is_named() {
        let err = LlmConfig::from_lookup(lookup(&[(API_KEY_VAR, "k"), (MODEL_VAR, "m")])).unwrap_err();
        assert!(matches!(err, BrowserError::MissingConfig(ref v) if v == API_BASE_VAR));
    }

    #[test]
    fn test_blank_variable_is_missing() {
        let err =
            LlmConfig::from_lookup(lookup(&[(API_KEY_VAR, "\"\""), (API_BASE_VAR, "http://x"), (MODEL_VAR, "m")]))
                .unwrap_err();
        assert!(matches!(err, BrowserError::MissingConfig(ref v) if v == API_KEY_VAR));
    }

    #[test]
    fn test_base_keeps_single_trailing_slash() {
        assert_eq!(LlmConfig::new("k", "http://x/v1//", "m").api_base, "http://x/v1/");
    }
}
