use crate::core::models::Service;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_HONEYGAIN_INTERVAL_MIN: u64 = 5;
pub const EARNAPP_BASE_URL: &str = "https://earnapp.com";
pub const HONEYGAIN_BASE_URL: &str = "https://dashboard.honeygain.com";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub services: ServiceSettings,
    pub display: DisplaySettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub earnapp: EarnAppConfig,
    pub honeygain: HoneygainConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarnAppConfig {
    pub enabled: bool,
    pub cookie: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for EarnAppConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cookie: String::new(),
            base_url: None,
        }
    }
}

impl EarnAppConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(EARNAPP_BASE_URL)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoneygainConfig {
    pub enabled: bool,
    pub email: String,
    pub password: String,
    pub interval_minutes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for HoneygainConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            email: String::new(),
            password: String::new(),
            interval_minutes: DEFAULT_HONEYGAIN_INTERVAL_MIN,
            base_url: None,
        }
    }
}

impl HoneygainConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(HONEYGAIN_BASE_URL)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub countdown: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self { countdown: true }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettingsChange {
    Enabled(Service, bool),
    HoneygainInterval(Duration),
    Credentials,
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("balance-bar").join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path().context("Could not determine config directory")?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(?path, "Loaded config");
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!(?path, "Saved config");
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.services.honeygain.interval_minutes == 0 {
            anyhow::bail!("services.honeygain.interval_minutes must be greater than 0");
        }
        Ok(())
    }

    pub fn is_enabled(&self, service: Service) -> bool {
        match service {
            Service::EarnApp => self.services.earnapp.enabled,
            Service::Honeygain => self.services.honeygain.enabled,
        }
    }

    pub fn set_enabled(&mut self, service: Service, enabled: bool) {
        match service {
            Service::EarnApp => self.services.earnapp.enabled = enabled,
            Service::Honeygain => self.services.honeygain.enabled = enabled,
        }
    }

    pub fn has_credentials(&self, service: Service) -> bool {
        match service {
            Service::EarnApp => !self.services.earnapp.cookie.trim().is_empty(),
            Service::Honeygain => {
                let hg = &self.services.honeygain;
                !hg.email.trim().is_empty() && !hg.password.is_empty()
            }
        }
    }

    pub fn changes_from(&self, old: &Settings) -> Vec<SettingsChange> {
        let mut changes = Vec::new();

        let (new_ea, old_ea) = (&self.services.earnapp, &old.services.earnapp);
        let (new_hg, old_hg) = (&self.services.honeygain, &old.services.honeygain);

        if new_ea.cookie != old_ea.cookie
            || new_ea.base_url != old_ea.base_url
            || new_hg.email != old_hg.email
            || new_hg.password != old_hg.password
            || new_hg.base_url != old_hg.base_url
        {
            changes.push(SettingsChange::Credentials);
        }

        for service in Service::ALL {
            if self.is_enabled(service) != old.is_enabled(service) {
                changes.push(SettingsChange::Enabled(service, self.is_enabled(service)));
            }
        }

        if new_hg.interval_minutes != old_hg.interval_minutes && new_hg.interval_minutes > 0 {
            changes.push(SettingsChange::HoneygainInterval(new_hg.interval()));
        }

        changes
    }
}
