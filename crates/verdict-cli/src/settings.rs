use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use verdict_eval::DEFAULT_PERSISTED_VIOLATIONS;
use verdict_source::DEFAULT_SEED;

/// Settings file picked up from the working directory when present.
pub const DEFAULT_SETTINGS_FILE: &str = "verdict.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("settings file not found: {0}")]
    NotFound(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Seeded synthetic fixture.
    Mock,
    /// CSV files under `data_dir/<dataset>/<table>.csv`.
    Csv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub kind: SourceKind,
    pub seed: u64,
    pub data_dir: PathBuf,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            kind: SourceKind::Mock,
            seed: DEFAULT_SEED,
            data_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub run_dir: PathBuf,
    pub max_persisted_violations: usize,
    /// Exit with an error when any rule execution fails.
    pub strict: bool,
    pub source: SourceSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            run_dir: PathBuf::from("runs"),
            max_persisted_violations: DEFAULT_PERSISTED_VIOLATIONS,
            strict: false,
            source: SourceSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, or from `verdict.toml` in the working
    /// directory if it exists, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(SettingsError::NotFound(path.to_path_buf()));
                }
                Self::from_file(path)
            }
            None => {
                let default_path = Path::new(DEFAULT_SETTINGS_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let settings = Settings::from_toml(
            r#"
strict = true

[source]
kind = "csv"
data_dir = "fixtures"
"#,
        )
        .expect("parse settings");

        assert!(settings.strict);
        assert_eq!(settings.run_dir, PathBuf::from("runs"));
        assert_eq!(settings.max_persisted_violations, 10);
        assert_eq!(settings.source.kind, SourceKind::Csv);
        assert_eq!(settings.source.seed, 42);
        assert_eq!(settings.source.data_dir, PathBuf::from("fixtures"));
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(Settings::from_toml("").expect("parse"), Settings::default());
    }

    #[test]
    fn unknown_source_kind_is_rejected() {
        let err = Settings::from_toml("[source]\nkind = \"postgres\"\n").expect_err("bad kind");
        assert!(matches!(err, SettingsError::Toml(_)));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("verdict_missing_{}.toml", uuid::Uuid::new_v4()));
        let err = Settings::load(Some(&path)).expect_err("missing file");
        assert!(matches!(err, SettingsError::NotFound(_)));
    }
}
