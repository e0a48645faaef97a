use crate::cli::refresh::call_daemon;
use crate::core::models::Service;
use crate::core::settings::Settings;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub struct CredentialsInput {
    pub earnapp_cookie: String,
    pub honeygain_email: String,
    pub honeygain_password: String,
}

pub fn set_enabled(service: &str, enabled: bool) -> Result<()> {
    let service: Service = service.parse()?;
    let path = config_path()?;
    update(&path, |settings| {
        settings.set_enabled(service, enabled);
        Ok(())
    })?;

    let state = if enabled { "enabled" } else { "disabled" };
    println!("{service} {state} ({})", path.display());
    Ok(())
}

pub fn set_interval(minutes: u64) -> Result<()> {
    let path = config_path()?;
    update(&path, |settings| apply_interval(settings, minutes))?;

    println!("Honeygain interval set to {minutes} min ({})", path.display());
    Ok(())
}

pub async fn set_credentials(input: CredentialsInput) -> Result<()> {
    let path = config_path()?;
    let changed = update(&path, |settings| apply_credentials(settings, input))?;
    println!("Credentials saved to {}", path.display());

    // An unchanged file produces no watcher event.
    if !changed {
        match call_daemon("Restart").await {
            Ok(()) => println!("Daemon restarted with the saved credentials"),
            Err(e) => tracing::debug!(error = %e, "No daemon to restart"),
        }
    }
    Ok(())
}

fn config_path() -> Result<PathBuf> {
    Settings::config_path().context("Could not determine config directory")
}

fn update<T>(path: &Path, edit: impl FnOnce(&mut Settings) -> Result<T>) -> Result<T> {
    let mut settings = Settings::load_from(path)?;
    let result = edit(&mut settings)?;
    settings.save_to(path)?;
    Ok(result)
}

fn apply_interval(settings: &mut Settings, minutes: u64) -> Result<()> {
    if minutes == 0 {
        anyhow::bail!("Interval must be at least 1 minute");
    }
    settings.services.honeygain.interval_minutes = minutes;
    Ok(())
}

fn apply_credentials(settings: &mut Settings, input: CredentialsInput) -> Result<bool> {
    let cookie = input.earnapp_cookie.trim();
    let email = input.honeygain_email.trim();

    if cookie.is_empty() || email.is_empty() || input.honeygain_password.is_empty() {
        anyhow::bail!("Please fill in all fields");
    }

    let before = settings.clone();
    settings.services.earnapp.cookie = cookie.to_string();
    settings.services.honeygain.email = email.to_string();
    settings.services.honeygain.password = input.honeygain_password;
    Ok(*settings != before)
}
