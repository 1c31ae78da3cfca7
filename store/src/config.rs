//! Codec configuration for tabular exports.
//!
//! Defines the YAML-serializable settings that control how entity trees are
//! flattened into rows and how rows are written to CSV files.
//!
//! # Example YAML
//!
//! ```yaml
//! separator: ";"
//! delimiter: ","
//! unpersisted: temporary
//! temporary_prefix: "_:new"
//! key_type: path_id
//! ```
//!
//! Every key is optional; missing keys take their defaults.

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// What export does with entities that have no uri.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnpersistedPolicy {
    /// Fail the export.
    #[default]
    Reject,
    /// Assign a temporary uri for the duration of the export.
    Temporary,
}

/// What the column headers of a bundle file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyType {
    /// Field ids.
    #[default]
    FieldId,
    /// Pathbuilder path ids. Fields without a known path id keep their
    /// field id.
    PathId,
}

/// Tabular codec settings.
///
/// # Examples
///
/// ```
/// use wisski_store::{CodecConfig, UnpersistedPolicy};
///
/// let config: CodecConfig = serde_yaml::from_str("unpersisted: temporary").unwrap();
/// assert_eq!(config.separator, ";");
/// assert_eq!(config.unpersisted, UnpersistedPolicy::Temporary);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Joins the values of a multi-valued field inside one cell.
    pub separator: String,
    /// CSV field delimiter.
    pub delimiter: char,
    /// Handling of entities without a uri during export.
    pub unpersisted: UnpersistedPolicy,
    /// Prefix of temporary uris; a running number is appended.
    pub temporary_prefix: String,
    /// Column header naming.
    pub key_type: KeyType,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            separator: ";".to_string(),
            delimiter: ',',
            unpersisted: UnpersistedPolicy::Reject,
            temporary_prefix: "_:new".to_string(),
            key_type: KeyType::FieldId,
        }
    }
}

impl CodecConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::StoreError::IoError) if the file cannot be
    /// read, [`YamlError`](crate::StoreError::YamlError) if parsing fails,
    /// or [`InvalidConfig`](crate::StoreError::InvalidConfig) if the values
    /// are unusable.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_yaml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::StoreError::IoError) if the file cannot be
    /// written, or [`YamlError`](crate::StoreError::YamlError) if
    /// serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Checks that the separator and temporary prefix are non-empty and the
    /// delimiter is ASCII.
    pub fn validate(&self) -> Result<()> {
        if self.separator.is_empty() {
            return Err(StoreError::InvalidConfig(
                "separator must not be empty".to_string(),
            ));
        }
        if self.temporary_prefix.is_empty() {
            return Err(StoreError::InvalidConfig(
                "temporary_prefix must not be empty".to_string(),
            ));
        }
        self.delimiter_byte()?;
        Ok(())
    }

    /// Returns the delimiter as the single byte the CSV reader expects.
    pub fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                StoreError::InvalidConfig(format!(
                    "delimiter {:?} is not an ASCII character",
                    self.delimiter
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
separator: "|"
delimiter: "\t"
unpersisted: temporary
temporary_prefix: "tmp:"
key_type: path_id
"#
    }

    #[test]
    fn test_deserialize_complete() {
        let config: CodecConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        assert_eq!(config.separator, "|");
        assert_eq!(config.delimiter, '\t');
        assert_eq!(config.unpersisted, UnpersistedPolicy::Temporary);
        assert_eq!(config.temporary_prefix, "tmp:");
        assert_eq!(config.key_type, KeyType::PathId);
    }

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: CodecConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, CodecConfig::default());
        assert_eq!(config.unpersisted, UnpersistedPolicy::Reject);
        assert_eq!(config.key_type, KeyType::FieldId);
    }

    #[test]
    fn test_validate_rejects_empty_separator() {
        let config = CodecConfig {
            separator: String::new(),
            ..CodecConfig::default()
        };
        assert!(matches!(config.validate(), Err(StoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_delimiter_byte() {
        assert_eq!(CodecConfig::default().delimiter_byte().unwrap(), b',');
        let config = CodecConfig {
            delimiter: '§',
            ..CodecConfig::default()
        };
        assert!(config.delimiter_byte().is_err());
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codec.yml");

        let original: CodecConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        original.save(&path).unwrap();

        let loaded = CodecConfig::load(&path).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codec.yml");
        std::fs::write(&path, "separator: \"\"\n").unwrap();

        assert!(matches!(
            CodecConfig::load(&path),
            Err(StoreError::InvalidConfig(_))
        ));
    }
}
