use crate::error::{Result, StampError};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const TEMPERATURE: f32 = 0.7;

/// Places an API key may come from, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    ApiKey,
    GeminiApiKey,
    GoogleApiKey,
    ReactAppApiKey,
    NextPublicApiKey,
    ViteApiKey,
}

impl CredentialSource {
    pub const ALL: [CredentialSource; 6] = [
        CredentialSource::ApiKey,
        CredentialSource::GeminiApiKey,
        CredentialSource::GoogleApiKey,
        CredentialSource::ReactAppApiKey,
        CredentialSource::NextPublicApiKey,
        CredentialSource::ViteApiKey,
    ];

    pub fn var_name(&self) -> &'static str {
        match self {
            CredentialSource::ApiKey => "API_KEY",
            CredentialSource::GeminiApiKey => "GEMINI_API_KEY",
            CredentialSource::GoogleApiKey => "GOOGLE_API_KEY",
            CredentialSource::ReactAppApiKey => "REACT_APP_API_KEY",
            CredentialSource::NextPublicApiKey => "NEXT_PUBLIC_API_KEY",
            CredentialSource::ViteApiKey => "VITE_API_KEY",
        }
    }
}

pub fn missing_credential_error() -> StampError {
    StampError::Auth(format!(
        "API key not found.\nSet {} (or one of {}) in your environment or in a .env file.",
        CredentialSource::ApiKey.var_name(),
        CredentialSource::ALL[1..]
            .iter()
            .map(|s| s.var_name())
            .collect::<Vec<_>>()
            .join(", ")
    ))
}

/// Returns the first non-blank key found through `lookup`, walking
/// [`CredentialSource::ALL`] in order.
pub fn resolve_api_key<F>(lookup: F) -> Result<(CredentialSource, String)>
where
    F: Fn(&str) -> Option<String>,
{
    CredentialSource::ALL
        .iter()
        .find_map(|source| {
            lookup(source.var_name())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(|v| (*source, v))
        })
        .ok_or_else(missing_credential_error)
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub temperature: f32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            temperature: TEMPERATURE,
        }
    }
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let api_key = match resolve_api_key(|name| env::var(name).ok()) {
            Ok((source, key)) => {
                log::debug!("Using API key from {}", source.var_name());
                Some(key)
            }
            Err(_) => None,
        };
        let model = env::var("STAMPGEN_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let endpoint =
            env::var("STAMPGEN_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());

        GeminiConfig {
            api_key,
            model,
            endpoint,
            temperature: TEMPERATURE,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// The configured key, or the typed absence callers surface as [`StampError::Auth`].
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(missing_credential_error)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub data_dir: Option<PathBuf>,
    pub ephemeral: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            gemini: GeminiConfig::default(),
            data_dir: None,
            ephemeral: false,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let data_dir = env::var("STAMPGEN_DATA_DIR").ok().map(PathBuf::from);

        Config {
            gemini: GeminiConfig::from_env(),
            data_dir,
            ephemeral: false,
        }
    }

    pub fn with_gemini(mut self, gemini: GeminiConfig) -> Self {
        self.gemini = gemini;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn with_ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }

    /// Explicit directory if set, otherwise `<user data dir>/stampgen`.
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|d| d.join("stampgen"))
            .ok_or_else(|| StampError::Config("could not determine a data directory".into()))
    }
}
