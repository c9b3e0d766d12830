use crate::advisor::{DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_CONFIG_PATH: &str = ".retrofit/secrets.toml";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const GATE_PASSWORD_ENV: &str = "RETROFIT_GATE_PASSWORD";

#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    #[serde(rename = "OPENAI_API_KEY", alias = "api_key", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate_password: Option<String>,
    pub branding_image: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 120,
            max_attempts: 1,
            gate_password: None,
            branding_image: PathBuf::from("logo.png"),
            output_dir: PathBuf::from("."),
        }
    }
}

impl Settings {
    /// Fills unset secrets from the environment; file values win.
    pub fn with_env_fallback(self) -> Self {
        self.with_fallback_from(|key| std::env::var(key).ok())
    }

    pub fn with_fallback_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if self.api_key.as_deref().map_or(true, str::is_empty) {
            self.api_key = lookup(API_KEY_ENV).filter(|v| !v.is_empty());
        }
        if self.gate_password.is_none() {
            self.gate_password = lookup(GATE_PASSWORD_ENV).filter(|v| !v.is_empty());
        }
        self
    }

    /// Copy safe to print: secrets replaced by a mask.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.api_key = copy.api_key.as_deref().map(mask);
        copy.gate_password = copy.gate_password.as_ref().map(|_| "***".to_string());
        copy
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shown = self.redacted();
        f.debug_struct("Settings")
            .field("api_key", &shown.api_key)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .field("gate_password", &shown.gate_password)
            .field("branding_image", &self.branding_image)
            .field("output_dir", &self.output_dir)
            .finish()
    }
}

fn mask(secret: &str) -> String {
    let visible: String = secret.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    if secret.chars().count() <= 8 {
        "***".to_string()
    } else {
        format!("***{}", visible)
    }
}

pub struct SettingsLoader;

impl SettingsLoader {
    /// File contents only; a missing file yields the defaults.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Settings> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "keine Konfigurationsdatei, Standardwerte");
            return Ok(Settings::default());
        }
        let data = fs::read_to_string(path)
            .with_context(|| format!("Konfiguration {:?} nicht lesbar", path))?;
        let settings: Settings = toml::from_str(&data)
            .with_context(|| format!("ungültiges TOML in {:?}", path))?;
        Ok(settings)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Settings> {
        Ok(Self::load_file(path)?.with_env_fallback())
    }
}

pub struct SettingsWriter;

impl SettingsWriter {
    pub fn save_to_path(path: impl AsRef<Path>, settings: &Settings) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Ordner {:?} konnte nicht angelegt werden", parent))?;
        }
        let data = toml::to_string_pretty(settings)?;
        fs::write(path, data)
            .with_context(|| format!("Konfiguration {:?} nicht schreibbar", path))?;
        Ok(())
    }

    /// Replaces the stored API key, keeping every other value of the file.
    pub fn rewrite_api_key(path: impl AsRef<Path>, api_key: &str) -> Result<()> {
        let path = path.as_ref();
        let mut settings = SettingsLoader::load_file(path)?;
        settings.api_key = Some(api_key.trim().to_string());
        Self::save_to_path(path, &settings)?;
        info!(path = %path.display(), "API-Schlüssel in der Konfiguration ersetzt");
        Ok(())
    }
}
