use std::{collections::HashMap, fs, path::PathBuf, str::FromStr};

use tracing::warn;

pub const SETTINGS_FILE: &str = "billed.toml";

/// What the router does with a path it has no route for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotFoundPolicy {
    /// Leave the current page on screen.
    #[default]
    KeepCurrent,
    /// Replace the page with a not-found page.
    RenderPage,
}

impl FromStr for NotFoundPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "keep" | "keep_current" => Ok(Self::KeepCurrent),
            "page" | "render_page" => Ok(Self::RenderPage),
            other => Err(format!("unknown not-found policy `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub session_path: PathBuf,
    pub not_found: NotFoundPolicy,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5678/".into(),
            session_path: PathBuf::from("./data/session.json"),
            not_found: NotFoundPolicy::KeepCurrent,
            log_filter: "info".into(),
        }
    }
}

/// Defaults, then `billed.toml` in the working directory, then environment.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        apply_file_overrides(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

pub fn apply_file_overrides(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<HashMap<String, String>>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(err) => {
            warn!(file = SETTINGS_FILE, error = %err, "ignoring unreadable settings file");
            return;
        }
    };

    if let Some(v) = file_cfg.get("api_url") {
        settings.api_url = v.clone();
    }
    if let Some(v) = file_cfg.get("session_path") {
        settings.session_path = PathBuf::from(v);
    }
    if let Some(v) = file_cfg.get("not_found") {
        set_not_found(settings, v);
    }
    if let Some(v) = file_cfg.get("log_filter") {
        settings.log_filter = v.clone();
    }
}

pub fn apply_env_overrides(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("BILLED_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = var("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = var("BILLED_SESSION_PATH") {
        settings.session_path = PathBuf::from(v);
    }
    if let Some(v) = var("APP__SESSION_PATH") {
        settings.session_path = PathBuf::from(v);
    }

    if let Some(v) = var("APP__NOT_FOUND") {
        set_not_found(settings, &v);
    }

    if let Some(v) = var("RUST_LOG") {
        settings.log_filter = v;
    }
}

fn set_not_found(settings: &mut Settings, value: &str) {
    match value.parse() {
        Ok(policy) => settings.not_found = policy,
        Err(err) => warn!(error = %err, "keeping not-found policy {:?}", settings.not_found),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_override_defaults() {
        let mut settings = Settings::default();
        apply_file_overrides(
            &mut settings,
            r#"
            api_url = "https://billed.example/api/"
            not_found = "page"
            "#,
        );

        assert_eq!(settings.api_url, "https://billed.example/api/");
        assert_eq!(settings.not_found, NotFoundPolicy::RenderPage);
        assert_eq!(settings.log_filter, "info");
    }

    #[test]
    fn app_prefixed_env_wins_over_legacy_name() {
        let mut settings = Settings::default();
        let env: HashMap<&str, &str> = HashMap::from([
            ("BILLED_API_URL", "http://legacy:5678/"),
            ("APP__API_URL", "http://app:5678/"),
            ("APP__SESSION_PATH", "/tmp/billed/session.json"),
        ]);
        apply_env_overrides(&mut settings, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.api_url, "http://app:5678/");
        assert_eq!(settings.session_path, PathBuf::from("/tmp/billed/session.json"));
    }

    #[test]
    fn unknown_policy_keeps_previous_value() {
        let mut settings = Settings::default();
        apply_env_overrides(&mut settings, |key| {
            (key == "APP__NOT_FOUND").then(|| "sideways".to_string())
        });
        assert_eq!(settings.not_found, NotFoundPolicy::KeepCurrent);
    }
}
