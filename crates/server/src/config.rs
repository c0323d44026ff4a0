use std::{fs, path::Path};

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_SETTINGS_FILE: &str = "stepd.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub notification_id: u32,
    pub channel_id: String,
    pub channel_name: String,
    pub initial_title: String,
    pub title_prefix: String,
    pub body: String,
    pub pipe_capacity: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            notification_id: 2021,
            channel_id: "202121".into(),
            channel_name: "sxiaozhi-walk".into(),
            initial_title: "Today's steps".into(),
            title_prefix: "Today's steps: ".into(),
            body: "Walk healthy, make every step count!".into(),
            pipe_capacity: 32,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    notification_id: Option<u32>,
    channel_id: Option<String>,
    channel_name: Option<String>,
    initial_title: Option<String>,
    title_prefix: Option<String>,
    body: Option<String>,
    pipe_capacity: Option<usize>,
}

/// Defaults, then the settings file, then `APP__*` environment variables.
///
/// An explicitly named file must exist; the default file is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<ServiceSettings> {
    let mut settings = ServiceSettings::default();

    let raw = match path {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("failed to read settings file '{}'", path.display()))?,
        ),
        None => fs::read_to_string(DEFAULT_SETTINGS_FILE).ok(),
    };
    if let Some(raw) = raw {
        let file_cfg: FileSettings =
            toml::from_str(&raw).context("failed to parse step service settings")?;
        apply_file(&mut settings, file_cfg);
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut ServiceSettings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.notification_id {
        settings.notification_id = v;
    }
    if let Some(v) = file_cfg.channel_id {
        settings.channel_id = v;
    }
    if let Some(v) = file_cfg.channel_name {
        settings.channel_name = v;
    }
    if let Some(v) = file_cfg.initial_title {
        settings.initial_title = v;
    }
    if let Some(v) = file_cfg.title_prefix {
        settings.title_prefix = v;
    }
    if let Some(v) = file_cfg.body {
        settings.body = v;
    }
    if let Some(v) = file_cfg.pipe_capacity {
        settings.pipe_capacity = v;
    }
}

fn apply_env(settings: &mut ServiceSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("APP__NOTIFICATION_ID") {
        if let Ok(parsed) = v.parse::<u32>() {
            settings.notification_id = parsed;
        }
    }
    if let Some(v) = lookup("APP__CHANNEL_ID") {
        settings.channel_id = v;
    }
    if let Some(v) = lookup("APP__CHANNEL_NAME") {
        settings.channel_name = v;
    }
    if let Some(v) = lookup("APP__INITIAL_TITLE") {
        settings.initial_title = v;
    }
    if let Some(v) = lookup("APP__TITLE_PREFIX") {
        settings.title_prefix = v;
    }
    if let Some(v) = lookup("APP__BODY") {
        settings.body = v;
    }
    if let Some(v) = lookup("APP__PIPE_CAPACITY") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.pipe_capacity = parsed;
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
