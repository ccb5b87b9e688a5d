//! Configuration module

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Trained model artifact (JSON)
    pub model_path: PathBuf,

    /// Directory holding the crop requirement and rotation CSVs
    pub data_dir: PathBuf,

    /// Gemini API key; advisory is disabled when absent
    pub gemini_api_key: Option<String>,

    pub gemini_model: String,

    pub gemini_base_url: String,

    /// Upper bound on a single advisory call
    pub advice_timeout: Duration,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Predictions returned when a request omits `top_k`
    pub default_top_k: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset, blank or unparsable values fall back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let parsed = |key: &str| var(key).and_then(|v| v.parse::<u64>().ok());

        Self {
            port: var("PORT").and_then(|p| p.parse().ok()).unwrap_or(5000),

            model_path: var("MODEL_PATH")
                .unwrap_or_else(|| "models/crop_model.json".to_string())
                .into(),

            data_dir: var("DATA_DIR").unwrap_or_else(|| "data".to_string()).into(),

            gemini_api_key: var("GEMINI_API_KEY"),

            gemini_model: var("GEMINI_MODEL")
                .unwrap_or_else(|| "gemini-2.5-flash".to_string()),

            gemini_base_url: var("GEMINI_BASE_URL")
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string()),

            advice_timeout: Duration::from_secs(parsed("ADVICE_TIMEOUT_SECS").unwrap_or(30).max(1)),

            cors_origins: var("CORS_ORIGINS")
                .unwrap_or_else(|| "*".to_string())
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),

            default_top_k: parsed("DEFAULT_TOP_K").map(|k| k as usize).unwrap_or(3).max(1),
        }
    }

    /// Whether any origin is allowed
    pub fn cors_allows_any(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }
}
