use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;

use crate::session::DEFAULT_RESEND_COOLDOWN_SECS;

pub const DEFAULT_SETTINGS_FILE: &str = "account_recovery.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub login_url: String,
    pub request_timeout_secs: u64,
    pub resend_cooldown_secs: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000/api/".into(),
            login_url: "/login".into(),
            request_timeout_secs: 15,
            resend_cooldown_secs: DEFAULT_RESEND_COOLDOWN_SECS,
        }
    }
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file '{}': {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse settings file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_base_url: Option<String>,
    login_url: Option<String>,
    request_timeout_secs: Option<u64>,
    resend_cooldown_secs: Option<u32>,
}

/// Defaults, then the settings file, then the process environment.
///
/// An explicit `path` must exist. Without one, [`DEFAULT_SETTINGS_FILE`] in
/// the working directory is read when present.
pub fn load_settings(path: Option<&Path>) -> Result<ClientSettings, SettingsError> {
    let mut settings = ClientSettings::default();

    match path {
        Some(path) => apply_file(&mut settings, path)?,
        None => {
            let default_path = Path::new(DEFAULT_SETTINGS_FILE);
            if default_path.exists() {
                apply_file(&mut settings, default_path)?;
            }
        }
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut ClientSettings, path: &Path) -> Result<(), SettingsError> {
    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    apply_toml(settings, &raw).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_toml(settings: &mut ClientSettings, raw: &str) -> Result<(), toml::de::Error> {
    let file_cfg: FileSettings = toml::from_str(raw)?;

    if let Some(v) = file_cfg.api_base_url {
        settings.api_base_url = v;
    }
    if let Some(v) = file_cfg.login_url {
        settings.login_url = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.resend_cooldown_secs {
        settings.resend_cooldown_secs = v;
    }
    Ok(())
}

/// Later keys win: `APP__*` overrides the bare names.
pub fn apply_env_overrides<F>(settings: &mut ClientSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = lookup("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = lookup("LOGIN_URL") {
        settings.login_url = v;
    }
    if let Some(v) = lookup("APP__LOGIN_URL") {
        settings.login_url = v;
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    if let Some(v) = lookup("APP__RESEND_COOLDOWN_SECS") {
        if let Ok(parsed) = v.parse::<u32>() {
            settings.resend_cooldown_secs = parsed;
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
