//! Service configuration: defaults, then an optional TOML file, then `KAVACH__*` env vars.
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | app_name | KAVACH | Name reported by the gateway. |
//! | host / port | 127.0.0.1 / 8000 | Gateway bind address. |
//! | llm_mode | mock | `mock` (offline placeholder) or `openrouter`. |
//! | api_base | https://openrouter.ai/api/v1 | OpenAI-compatible endpoint. |
//! | fast_model / reasoning_model | gemini flash / pro | Models per [`ModelTier`](crate::inference::ModelTier). |
//! | inference_timeout_secs | 60 | Bound on every inference call. |
//! | session_conflict_policy | queue | `queue` or `reject` concurrent turns on one session. |

use crate::error::InferenceError;
use crate::inference::{InferenceGateway, OpenRouterGateway, PlaceholderGateway};
use crate::session::ConflictPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config/kavach.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmMode {
    Mock,
    OpenRouter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KavachConfig {
    pub app_name: String,
    pub host: String,
    pub port: u16,
    pub llm_mode: LlmMode,
    pub api_base: String,
    pub fast_model: String,
    pub reasoning_model: String,
    pub inference_timeout_secs: u64,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    pub session_conflict_policy: ConflictPolicy,
}

impl KavachConfig {
    /// Load from `$KAVACH_CONFIG` (or `config/kavach.toml`) and the environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = std::env::var("KAVACH_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    /// Load with an explicit config file path; a missing file just means defaults.
    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("app_name", "KAVACH")?
            .set_default("host", "127.0.0.1")?
            .set_default("port", 8000_i64)?
            .set_default("llm_mode", "mock")?
            .set_default("api_base", "https://openrouter.ai/api/v1")?
            .set_default("fast_model", "google/gemini-2.5-flash")?
            .set_default("reasoning_model", "google/gemini-2.5-pro")?
            .set_default("inference_timeout_secs", 60_i64)?
            .set_default("session_conflict_policy", "queue")?;

        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        builder
            .add_source(config::Environment::with_prefix("KAVACH").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.inference_timeout_secs.max(1))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Build the inference gateway for `llm_mode`. OpenRouter mode needs an API key from
    /// `KAVACH_API_KEY` or `OPENROUTER_API_KEY`.
    pub fn build_gateway(&self) -> Result<Arc<dyn InferenceGateway>, InferenceError> {
        match self.llm_mode {
            LlmMode::Mock => Ok(Arc::new(PlaceholderGateway::new())),
            LlmMode::OpenRouter => {
                let key = api_key_from_env().ok_or_else(|| {
                    InferenceError::Config(
                        "openrouter mode requires KAVACH_API_KEY or OPENROUTER_API_KEY".to_string(),
                    )
                })?;
                let gateway = OpenRouterGateway::new(key)?
                    .with_api_base(&self.api_base)
                    .with_models(&self.fast_model, &self.reasoning_model)
                    .with_sampling(self.temperature, self.max_tokens);
                Ok(Arc::new(gateway))
            }
        }
    }
}

fn api_key_from_env() -> Option<String> {
    std::env::var("KAVACH_API_KEY")
        .ok()
        .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = KavachConfig::load_from(Path::new("does/not/exist.toml")).unwrap();
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.llm_mode, LlmMode::Mock);
        assert_eq!(cfg.session_conflict_policy, ConflictPolicy::Queue);
        assert_eq!(cfg.inference_timeout(), Duration::from_secs(60));
        assert!(cfg.temperature.is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "port = 9100\nsession_conflict_policy = \"reject\"\ninference_timeout_secs = 15\ntemperature = 0.4"
        )
        .unwrap();
        let cfg = KavachConfig::load_from(file.path()).unwrap();
        assert_eq!(cfg.port, 9100);
        assert_eq!(cfg.session_conflict_policy, ConflictPolicy::Reject);
        assert_eq!(cfg.inference_timeout_secs, 15);
        assert_eq!(cfg.temperature, Some(0.4));
        assert_eq!(cfg.bind_addr(), "127.0.0.1:9100");
    }

    #[test]
    fn mock_mode_builds_without_key() {
        let cfg = KavachConfig::load_from(Path::new("does/not/exist.toml")).unwrap();
        assert!(cfg.build_gateway().is_ok());
    }
}
