use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crossterm::event::KeyModifiers;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TARGET_LANGUAGE: &str = "Korean";
pub const DEFAULT_FONT_SIZE: u16 = 16;
pub const FONT_SIZE_RANGE: std::ops::RangeInclusive<u16> = 5..=100;

const CONFIG_DIR: &str = "term-gloss";
const CONFIG_FILE: &str = "settings.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("`{0}` must not be empty")]
    Empty(&'static str),
    #[error("failed to encode settings: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// Which producer answers translation requests.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Built-in echo producer, useful without any model access.
    #[default]
    Mock,
    /// An external command that reads the text on stdin and streams the
    /// translation on stdout.
    Command,
}

/// Modifier that must be held when releasing a selection to open the tooltip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerModifier {
    #[default]
    Ctrl,
    Alt,
    Shift,
}

impl TriggerModifier {
    pub fn key_modifiers(self) -> KeyModifiers {
        match self {
            TriggerModifier::Ctrl => KeyModifiers::CONTROL,
            TriggerModifier::Alt => KeyModifiers::ALT,
            TriggerModifier::Shift => KeyModifiers::SHIFT,
        }
    }

    pub fn is_held(self, modifiers: KeyModifiers) -> bool {
        modifiers.contains(self.key_modifiers())
    }

    pub fn label(self) -> &'static str {
        match self {
            TriggerModifier::Ctrl => "Ctrl",
            TriggerModifier::Alt => "Alt",
            TriggerModifier::Shift => "Shift",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub provider: Provider,
    pub model: String,
    pub api_key: String,
    pub target_language: String,
    pub content_font_size: u16,
    /// Command line for `Provider::Command`.
    pub command: Option<String>,
    pub trigger_modifier: TriggerModifier,
    pub log_level: Level,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: DEFAULT_MODEL.to_string(),
            api_key: String::new(),
            target_language: DEFAULT_TARGET_LANGUAGE.to_string(),
            content_font_size: DEFAULT_FONT_SIZE,
            command: None,
            trigger_modifier: TriggerModifier::default(),
            log_level: Level::INFO,
        }
    }
}

impl Settings {
    /// `$XDG_CONFIG_HOME/term-gloss/settings.toml` or the platform equivalent.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load settings from `path`, or from the default location when `None`.
    ///
    /// A missing file is not an error and yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) => path,
                None => {
                    tracing::debug!("no config directory; using default settings");
                    return Ok(Self::default());
                }
            },
        };
        match fs::read_to_string(&path) {
            Ok(raw) => {
                tracing::debug!(path = %path.display(), "loaded settings file");
                Ok(Self::parse(&raw))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "settings file not found; using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(SettingsError::Read { path, source }),
        }
    }

    /// Parse settings text. Anything that is not a TOML table yields the
    /// defaults; individual bad fields fall back one by one.
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<toml::Table>() {
            Ok(table) => Self::from_table(&table),
            Err(err) => {
                tracing::warn!(%err, "settings file is not valid TOML; using defaults");
                Self::default()
            }
        }
    }

    /// Trim the free-text fields and reject the ones that must be filled in.
    pub fn validated(mut self) -> Result<Self, SettingsError> {
        for (name, value) in [
            ("model", &mut self.model),
            ("api_key", &mut self.api_key),
            ("target_language", &mut self.target_language),
        ] {
            *value = value.trim().to_string();
            if value.is_empty() {
                return Err(SettingsError::Empty(name));
            }
        }
        Ok(self)
    }

    /// Validate and write these settings to `path` as TOML, creating the
    /// parent directory when needed.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let settings = self.clone().validated()?;
        let file = SettingsFile {
            provider: settings.provider,
            model: &settings.model,
            api_key: &settings.api_key,
            target_language: &settings.target_language,
            content_font_size: settings.content_font_size,
            command: settings.command.as_deref(),
            trigger_modifier: settings.trigger_modifier,
            log_level: settings.log_level.to_string().to_lowercase(),
        };
        let raw = toml::to_string(&file)?;
        let write_err = |source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, raw).map_err(write_err)?;
        tracing::info!(path = %path.display(), "saved settings");
        Ok(())
    }

    fn from_table(table: &toml::Table) -> Self {
        let defaults = Self::default();
        let content_font_size = field(table, "content_font_size", defaults.content_font_size);
        let content_font_size = if FONT_SIZE_RANGE.contains(&content_font_size) {
            content_font_size
        } else {
            tracing::warn!(
                value = content_font_size,
                "content_font_size out of range; using default"
            );
            defaults.content_font_size
        };
        let log_level = field::<String>(table, "log_level", defaults.log_level.to_string());
        let log_level = Level::from_str(&log_level).unwrap_or_else(|_| {
            tracing::warn!(value = %log_level, "unknown log_level; using default");
            defaults.log_level
        });
        Self {
            provider: field(table, "provider", defaults.provider),
            model: field(table, "model", defaults.model),
            api_key: field(table, "api_key", defaults.api_key),
            target_language: field(table, "target_language", defaults.target_language),
            content_font_size,
            command: field(table, "command", defaults.command),
            trigger_modifier: field(table, "trigger_modifier", defaults.trigger_modifier),
            log_level,
        }
    }
}

/// On-disk shape written by `Settings::save`.
#[derive(Serialize)]
struct SettingsFile<'a> {
    provider: Provider,
    model: &'a str,
    api_key: &'a str,
    target_language: &'a str,
    content_font_size: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<&'a str>,
    trigger_modifier: TriggerModifier,
    log_level: String,
}

fn field<T: DeserializeOwned>(table: &toml::Table, key: &str, default: T) -> T {
    let Some(value) = table.get(key) else {
        return default;
    };
    value.clone().try_into().unwrap_or_else(|err| {
        tracing::warn!(key, %err, "invalid setting; using default");
        default
    })
}
