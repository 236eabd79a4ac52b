use std::collections::HashMap;
use std::path::PathBuf;

use crate::actions;

pub const LOG_LEVEL_ENV: &str = "GITTRISECT_LOG";

/// Runtime settings gathered from the command line and environment.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub repo: Option<PathBuf>,
    pub history_limit: Option<usize>,
    pub keybinds: HashMap<String, String>,
    pub log_file: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl AppConfig {
    pub fn repo_dir(&self) -> std::io::Result<PathBuf> {
        match &self.repo {
            Some(path) => Ok(path.clone()),
            None => std::env::current_dir(),
        }
    }

    pub fn logging_enabled(&self) -> bool {
        self.log_file.is_some() || self.log_level.is_some()
    }
}

pub fn apply_env<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(level) = lookup(LOG_LEVEL_ENV) {
        let level = level.trim().to_string();
        if !level.is_empty() {
            config.log_level = Some(level);
        }
    }
}

pub fn validate_config(config: &AppConfig) -> Vec<String> {
    let mut issues = Vec::new();

    if config.history_limit == Some(0) {
        issues.push("history limit must be at least 1".to_string());
    }

    if let Some(repo) = &config.repo
        && !repo.is_dir()
    {
        issues.push(format!("repository directory {} does not exist", repo.display()));
    }

    if let Some(level) = &config.log_level
        && parse_level_name(level).is_none()
    {
        issues.push(format!(
            "invalid log level '{level}' (expected: error, warn, info, debug, trace)"
        ));
    }

    issues.extend(actions::validate_key_overrides(&config.keybinds));
    issues
}

pub fn parse_level_name(raw: &str) -> Option<log::LevelFilter> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "error" => Some(log::LevelFilter::Error),
        "warn" => Some(log::LevelFilter::Warn),
        "info" => Some(log::LevelFilter::Info),
        "debug" => Some(log::LevelFilter::Debug),
        "trace" => Some(log::LevelFilter::Trace),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_empty());
        assert!(!AppConfig::default().logging_enabled());
    }

    #[test]
    fn env_sets_log_level() {
        let mut config = AppConfig::default();
        apply_env(&mut config, |name| {
            (name == LOG_LEVEL_ENV).then(|| " info ".to_string())
        });
        assert_eq!(config.log_level.as_deref(), Some("info"));
        assert!(config.logging_enabled());

        let mut config = AppConfig::default();
        apply_env(&mut config, |_| Some(String::new()));
        assert!(config.log_level.is_none());
    }

    #[test]
    fn validate_config_reports_errors() {
        let mut config = AppConfig {
            repo: Some(PathBuf::from("/definitely/not/a/real/repo/dir")),
            history_limit: Some(0),
            log_level: Some("loud".to_string()),
            ..AppConfig::default()
        };
        config
            .keybinds
            .insert("unknown_action".to_string(), "x".to_string());
        config
            .keybinds
            .insert("refresh".to_string(), "meta+x".to_string());

        let issues = validate_config(&config);
        assert!(issues.iter().any(|line| line.contains("history limit")));
        assert!(issues.iter().any(|line| line.contains("does not exist")));
        assert!(issues.iter().any(|line| line.contains("invalid log level")));
        assert!(
            issues
                .iter()
                .any(|line| line.contains("unknown keybinding action"))
        );
        assert!(
            issues
                .iter()
                .any(|line| line.contains("invalid keybinding for 'refresh'"))
        );
    }

    #[test]
    fn level_names_parse_case_insensitively() {
        assert_eq!(parse_level_name("WARN"), Some(log::LevelFilter::Warn));
        assert_eq!(parse_level_name("verbose"), None);
    }
}
