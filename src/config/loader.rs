//! Settings file loading and parsing.

use std::path::Path;

use super::model::AppSettings;
use crate::error::SettingsError;

/// Loads the settings file from disk and parses it.
pub fn load_from_path(path: &Path) -> Result<AppSettings, SettingsError> {
    let content = std::fs::read_to_string(path).map_err(|e| SettingsError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let settings: AppSettings =
        serde_yaml::from_str(&content).map_err(|e| SettingsError::ParseFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    Ok(settings)
}

/// Loads settings from an optional file.
///
/// Without a path the defaults are used, which leaves runtime config disabled.
pub fn load_or_default(path: Option<&Path>) -> Result<AppSettings, SettingsError> {
    match path {
        Some(path) => load_from_path(path),
        None => Ok(AppSettings::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_yaml_settings() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "runtime_config:\n  file: limits.yaml\n  period_seconds: 3\nmetrics:\n  enabled: false"
        )
        .unwrap();

        let settings = load_or_default(Some(file.path())).unwrap();
        assert_eq!(settings.runtime_config.file, "limits.yaml");
        assert_eq!(settings.runtime_config.period_seconds, 3);
        assert!(!settings.metrics.enabled);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");

        let err = load_from_path(&path).unwrap_err();
        assert!(matches!(err, SettingsError::ReadFailed { .. }));
        assert!(err.to_string().contains("absent.yaml"));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "runtime_config: [unterminated").unwrap();

        let err = load_from_path(file.path()).unwrap_err();
        assert!(matches!(err, SettingsError::ParseFailed { .. }));
    }

    #[test]
    fn invalid_values_load_but_fail_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "runtime_config:\n  period_seconds: 0").unwrap();

        let settings = load_or_default(Some(file.path())).unwrap();
        assert!(matches!(
            settings.runtime_config.validate(),
            Err(SettingsError::Invalid(_))
        ));
    }

    #[test]
    fn no_path_uses_defaults() {
        let settings = load_or_default(None).unwrap();
        assert!(!settings.runtime_config.is_enabled());
    }
}
