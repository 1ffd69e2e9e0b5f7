//! Configuration for the completion provider

/// Default model when `LLM_MODEL` is unset
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
/// Fixed sampling temperature when `LLM_TEMPERATURE` is unset
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    /// `OpenAI`-compatible base URL (e.g. a gateway); `/chat/completions` is appended
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    /// Total attempts per completion, including the first
    pub max_attempts: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            api_key: get("OPENAI_API_KEY").filter(|k| !k.is_empty()),
            base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            model: get("LLM_MODEL").unwrap_or(defaults.model),
            temperature: get("LLM_TEMPERATURE")
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.temperature),
            max_attempts: get("LLM_MAX_ATTEMPTS")
                .and_then(|n| n.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_attempts),
        }
    }
}
