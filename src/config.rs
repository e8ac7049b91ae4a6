use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "clinical-assistant";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DATA_URL_ENV: &str = "CLINICAL_ASSISTANT_DATA_URL";
pub const KNOWLEDGE_URL_ENV: &str = "CLINICAL_ASSISTANT_KNOWLEDGE_URL";
pub const EMR_URL_ENV: &str = "CLINICAL_ASSISTANT_EMR_URL";

const DEFAULT_DATA_URL: &str = "http://localhost:8080/assistant/data";
const DEFAULT_KNOWLEDGE_URL: &str = "http://localhost:8080/assistant/knowledge";
const DEFAULT_EMR_URL: &str = "http://localhost:8080/emr";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "clinical_assistant_lib=debug,clinical_assistant=debug,warn"
    } else {
        "clinical_assistant_lib=info,clinical_assistant=info,warn"
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{var} must be an http(s) URL, got {value:?}")]
    InvalidUrl { var: &'static str, value: String },
}

/// Collaborator endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantConfig {
    pub data_lookup_url: String,
    pub knowledge_url: String,
    pub emr_url: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            data_lookup_url: DEFAULT_DATA_URL.to_string(),
            knowledge_url: DEFAULT_KNOWLEDGE_URL.to_string(),
            emr_url: DEFAULT_EMR_URL.to_string(),
        }
    }
}

impl AssistantConfig {
    /// Read endpoints from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |var: &'static str, default: &str| -> Result<String, ConfigError> {
            match lookup(var).map(|v| v.trim().to_string()) {
                Some(value) if !value.is_empty() => {
                    if value.starts_with("http://") || value.starts_with("https://") {
                        Ok(value)
                    } else {
                        Err(ConfigError::InvalidUrl { var, value })
                    }
                }
                _ => Ok(default.to_string()),
            }
        };

        let config = Self {
            data_lookup_url: read(DATA_URL_ENV, DEFAULT_DATA_URL)?,
            knowledge_url: read(KNOWLEDGE_URL_ENV, DEFAULT_KNOWLEDGE_URL)?,
            emr_url: read(EMR_URL_ENV, DEFAULT_EMR_URL)?,
        };
        tracing::debug!(?config, "Assistant configuration loaded");
        Ok(config)
    }
}
