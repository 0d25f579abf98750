//! Adapter configuration
//!
//! Read from a TOML file; every key is optional.
//!
//! ```toml
//! show_linked_histories = true
//! page_size = 128
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HaystackConfig {
    /// Expose `axHistoryRef` on points, and list histories that already
    /// have a paired point in the history space
    pub show_linked_histories: bool,
    /// Entities visited per page of a full-space read
    pub page_size: usize,
    pub product_name: String,
    pub haystack_version: String,
}

impl Default for HaystackConfig {
    fn default() -> Self {
        Self {
            show_linked_histories: false,
            page_size: 256,
            product_name: "nhaystack".to_string(),
            haystack_version: "2.0".to_string(),
        }
    }
}

impl HaystackConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn with_linked_histories(mut self, show: bool) -> Self {
        self.show_linked_histories = show;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_file_is_default() {
        let config = HaystackConfig::from_toml_str("").unwrap();
        assert_eq!(config, HaystackConfig::default());
        assert!(!config.show_linked_histories);
        assert_eq!(config.page_size, 256);
    }

    #[test]
    fn test_load_partial() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "show_linked_histories = true\npage_size = 8").unwrap();

        let config = HaystackConfig::load(file.path()).unwrap();
        assert!(config.show_linked_histories);
        assert_eq!(config.page_size, 8);
        assert_eq!(config.product_name, "nhaystack");
    }

    #[test]
    fn test_missing_file() {
        let err = HaystackConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::ReadError(_)));
    }
}
