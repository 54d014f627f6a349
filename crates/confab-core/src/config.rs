use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, WidgetError};

/// Top-level configuration for the widget engine.
///
/// Loaded from `~/.confab/config.toml` by default. Each section corresponds
/// to one component or cross-cutting concern; every field has a default so a
/// partial file (or no file) yields a working configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub responder: ResponderConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub voice_input: VoiceInputConfig,
    #[serde(default)]
    pub voice_output: VoiceOutputConfig,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            responder: ResponderConfig::default(),
            input: InputConfig::default(),
            voice_input: VoiceInputConfig::default(),
            voice_output: VoiceOutputConfig::default(),
        }
    }
}

impl WidgetConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: WidgetConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| WidgetError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Delay before the greeting replaces its typing indicator, in ms.
    pub greeting_delay_ms: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            greeting_delay_ms: 350,
        }
    }
}

/// Remote responder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponderConfig {
    /// Endpoint accepting `{"message": ...}` and returning `{"response": ...}`.
    pub endpoint: String,
    /// Seconds to wait for a reply before failing the placeholder.
    pub timeout_secs: u64,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/chatbot/".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Text input settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Maximum user message length in chars; longer input is rejected.
    pub max_message_chars: usize,
    /// Period of the "Thinking..." dot animation, in ms.
    pub typing_tick_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            max_message_chars: 1000,
            typing_tick_ms: 500,
        }
    }
}

/// Voice capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceInputConfig {
    /// Seconds of silence before listening gives up.
    pub silence_timeout_secs: u64,
}

impl Default for VoiceInputConfig {
    fn default() -> Self {
        Self {
            silence_timeout_secs: 6,
        }
    }
}

/// Speech synthesis settings passed to each utterance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceOutputConfig {
    /// BCP-47 language tag.
    pub language: String,
    /// Speaking rate multiplier.
    pub rate: f32,
    /// Voice pitch multiplier.
    pub pitch: f32,
}

impl Default for VoiceOutputConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            rate: 1.0,
            pitch: 1.0,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
