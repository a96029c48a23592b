use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const SETTINGS_DIRECTORY_NAME: &str = "aboraya";
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Gemini connection settings.
///
/// Resolved from the platform config directory's JSON file merged with
/// `GEMINI_*` environment variables, the latter taking precedence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub system_instruction: Option<String>,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            system_instruction: None,
        }
    }
}

impl GeminiSettings {
    /// Loads settings, falling back to defaults if extraction fails.
    pub fn load() -> Self {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = Self::settings_path() {
            figment = figment.merge(Json::file(path));
        }
        figment = figment.merge(Env::prefixed("GEMINI_"));

        match figment.extract() {
            Ok(settings) => settings,
            Err(error) => {
                tracing::warn!(%error, "failed to load settings; using defaults");
                Self::default()
            }
        }
    }

    pub fn settings_path() -> Option<PathBuf> {
        dirs::config_dir()
            .map(|directory| directory.join(SETTINGS_DIRECTORY_NAME).join(SETTINGS_FILE_NAME))
    }

    /// True once an API key is present.
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

fn default_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}
