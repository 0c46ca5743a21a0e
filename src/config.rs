//! Configuration from environment variables

use crate::llm::GeminiSettings;
use crate::persona::WORM_PERSONA;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
    #[error("Failed to read persona file {path}: {source}")]
    PersonaFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub persona: String,
    pub request_timeout: Duration,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match var("WORMGPT_PORT") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "WORMGPT_PORT",
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let timeout_secs = match var("WORMGPT_REQUEST_TIMEOUT_SECS") {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "WORMGPT_REQUEST_TIMEOUT_SECS",
                        value,
                    })
                }
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        let persona = match var("WORMGPT_PERSONA_FILE") {
            Some(value) => {
                let path = PathBuf::from(&value);
                let persona = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::PersonaFile { path, source })?;
                let persona = persona.trim_end();
                if persona.trim_start().is_empty() {
                    return Err(ConfigError::InvalidValue {
                        name: "WORMGPT_PERSONA_FILE",
                        value,
                    });
                }
                persona.to_string()
            }
            None => WORM_PERSONA.to_string(),
        };

        Ok(Self {
            api_key: var("GEMINI_API_KEY").or_else(|| var("API_KEY")),
            base_url: var("WORMGPT_GATEWAY").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            text_model: var("WORMGPT_TEXT_MODEL").unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            image_model: var("WORMGPT_IMAGE_MODEL")
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            persona,
            request_timeout: Duration::from_secs(timeout_secs),
            port,
        })
    }

    pub fn gemini_settings(&self) -> GeminiSettings {
        GeminiSettings {
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            text_model: self.text_model.clone(),
            image_model: self.image_model.clone(),
            persona: self.persona.clone(),
            timeout: self.request_timeout,
        }
    }
}
