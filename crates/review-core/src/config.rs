//! Review configuration.
//!
//! Loaded from TOML; every section is optional and falls back to defaults.
//!
//! ```toml
//! [types]
//! name = "name"
//! tags = ["name", "quantity", "weight"]
//!
//! [session]
//! processing_date = "2024-03-01"
//! ```

use std::path::Path;

use chrono::{Local, NaiveDate};
use review_model::TypeCatalog;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Semantic types offered to the operator.
    pub types: TypeCatalog,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Date sent with every saved row; today when unset.
    pub processing_date: Option<NaiveDate>,
}

impl ReviewConfig {
    /// Reads and parses a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `path` when given, otherwise returns defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let config = Self::load(path)?;
                tracing::info!(path = %path.display(), "loaded review config");
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    #[must_use]
    pub fn with_processing_date(mut self, date: NaiveDate) -> Self {
        self.session.processing_date = Some(date);
        self
    }

    pub fn processing_date(&self) -> NaiveDate {
        self.session
            .processing_date
            .unwrap_or_else(|| Local::now().date_naive())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: ReviewConfig = toml::from_str("").unwrap();
        assert_eq!(config, ReviewConfig::default());
        assert_eq!(config.types.name_tag().as_str(), "name");
    }

    #[test]
    fn parses_catalog_and_date() {
        let config: ReviewConfig = toml::from_str(
            r#"
            [types]
            name = "person"
            tags = ["person", "boxes", "kg"]

            [session]
            processing_date = "2024-03-01"
            "#,
        )
        .unwrap();
        assert_eq!(config.types.tags().len(), 3);
        assert_eq!(config.types.name_tag().as_str(), "person");
        assert_eq!(
            config.processing_date(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn catalog_without_name_tag_is_rejected() {
        let result = toml::from_str::<ReviewConfig>(
            r#"
            [types]
            name = "person"
            tags = ["boxes"]
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn load_reports_path_on_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[types]\nname = 3").unwrap();
        let err = ReviewConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ReviewConfig::load(Path::new("/nonexistent/review.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
