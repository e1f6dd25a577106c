use std::env;
use std::time::Duration;

use crate::constants::TARGET_PARTICLES;
use crate::shape::PresetShape;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variables checked for the API key, in order.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Connection settings for the Gemini shape generator.
#[derive(Debug, Clone, PartialEq)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_owned(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl GeminiConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            api_key: API_KEY_VARS.iter().find_map(|name| get(*name)),
            model: get("GEMINI_MODEL").unwrap_or(defaults.model),
            base_url: get("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            timeout: get("GEMINI_TIMEOUT_SECS")
                .and_then(|v| v.trim().parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Everything the application needs at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct MorphConfig {
    pub particle_count: usize,
    pub initial_shape: PresetShape,
    pub gemini: GeminiConfig,
}

impl Default for MorphConfig {
    fn default() -> Self {
        Self {
            particle_count: TARGET_PARTICLES,
            initial_shape: PresetShape::default(),
            gemini: GeminiConfig::default(),
        }
    }
}

impl MorphConfig {
    pub fn from_env() -> Self {
        Self {
            gemini: GeminiConfig::from_env(),
            ..Self::default()
        }
    }
}
