//! CMS settings
//!
//! Settings are read from a TOML file and can be overridden with `PTAHCMS_*`
//! environment variables:
//!
//! - `PTAHCMS_BRAND_NAME`
//! - `PTAHCMS_DATABASE_PATH` (empty value selects the in-memory store)
//! - `PTAHCMS_DEFAULT_LANG`
//! - `PTAHCMS_PAGE_SIZE`
//! - `PTAHCMS_DISABLE_MODELS` (comma separated type URIs)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default number of records per management listing page
const DEFAULT_PAGE_SIZE: usize = 15;

/// Errors while loading settings
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {value}")]
    InvalidEnv { var: String, value: String },

    #[error("Invalid settings: {0}")]
    Invalid(String),
}

/// Settings of a CMS instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsSettings {
    /// Site name shown by the management screens
    pub brand_name: String,

    /// Type URIs (`type:<name>`) hidden from the models listing
    pub disable_models: Vec<String>,

    /// libsql database file, `None` for the in-memory store
    pub database_path: Option<PathBuf>,

    /// Language assigned to new content
    pub default_lang: String,

    /// Records per page in management listings
    pub page_size: usize,
}

impl Default for CmsSettings {
    fn default() -> Self {
        Self {
            brand_name: "Ptah CMS".to_string(),
            disable_models: Vec::new(),
            database_path: None,
            default_lang: "en".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl CmsSettings {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Apply `PTAHCMS_*` overrides from the process environment
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_vars<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("PTAHCMS_BRAND_NAME") {
            self.brand_name = value;
        }
        if let Some(value) = lookup("PTAHCMS_DATABASE_PATH") {
            self.database_path = if value.is_empty() {
                None
            } else {
                Some(PathBuf::from(value))
            };
        }
        if let Some(value) = lookup("PTAHCMS_DEFAULT_LANG") {
            self.default_lang = value;
        }
        if let Some(value) = lookup("PTAHCMS_PAGE_SIZE") {
            self.page_size = value.parse().map_err(|_| ConfigError::InvalidEnv {
                var: "PTAHCMS_PAGE_SIZE".to_string(),
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup("PTAHCMS_DISABLE_MODELS") {
            self.disable_models = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        Ok(self)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.brand_name.trim().is_empty() {
            return Err("brand_name cannot be empty".to_string());
        }

        if self.default_lang.is_empty() || self.default_lang.len() > 12 {
            return Err("default_lang must be 1 to 12 characters".to_string());
        }

        if self.page_size == 0 {
            return Err("page_size must be greater than 0".to_string());
        }

        if let Some(model) = self.disable_models.iter().find(|m| !m.starts_with("type:")) {
            return Err(format!("disable_models entry '{}' is not a type uri", model));
        }

        Ok(())
    }

    /// Load a settings file (when given), apply the environment and validate
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        }
        .apply_env()?;
        settings.validate().map_err(ConfigError::Invalid)?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_settings() {
        let settings = CmsSettings::default();
        assert_eq!(settings.brand_name, "Ptah CMS");
        assert_eq!(settings.page_size, 15);
        assert!(settings.database_path.is_none());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_from_toml_keeps_defaults() {
        let settings = CmsSettings::from_toml_str(
            r#"
            brand_name = "My Site"
            disable_models = ["type:page"]
            "#,
        )
        .unwrap();
        assert_eq!(settings.brand_name, "My Site");
        assert_eq!(settings.disable_models, vec!["type:page"]);
        assert_eq!(settings.default_lang, "en");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PTAHCMS_PAGE_SIZE", "30"),
            ("PTAHCMS_DATABASE_PATH", "/tmp/cms.db"),
            ("PTAHCMS_DISABLE_MODELS", "type:a, type:b,"),
        ]
        .into_iter()
        .collect();

        let settings = CmsSettings::default()
            .apply_vars(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(settings.page_size, 30);
        assert_eq!(settings.database_path, Some(PathBuf::from("/tmp/cms.db")));
        assert_eq!(settings.disable_models, vec!["type:a", "type:b"]);
    }

    #[test]
    fn test_invalid_env_value() {
        let err = CmsSettings::default()
            .apply_vars(|name| (name == "PTAHCMS_PAGE_SIZE").then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn test_validation() {
        let mut settings = CmsSettings::default();
        settings.page_size = 0;
        assert!(settings.validate().is_err());

        let mut settings = CmsSettings::default();
        settings.disable_models = vec!["page".to_string()];
        assert!(settings.validate().is_err());
    }
}
