mod init;
mod schema;

pub use init::write_default_config;
pub use schema::{Config, InputConfig, OutputConfig};

use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::error::ConfigError;

/// Get the config directory path (~/.config/loan-score/)
///
/// Falls back to the current directory when no home directory is known.
pub fn get_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".config")
        .join("loan-score")
}

/// Get the default config file path (~/.config/loan-score/config.yaml)
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.yaml")
}

/// Load configuration from a YAML file
///
/// # Arguments
///
/// * `path` - Optional path to config file. If None, uses default path
///   (~/.config/loan-score/config.yaml)
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed
///
/// A missing default config file is not an error; built-in defaults apply.
pub fn load_config(path: Option<PathBuf>) -> Result<Config, ConfigError> {
    let explicit = path.is_some();
    let config_path = path.unwrap_or_else(get_config_path);

    if !config_path.exists() {
        if explicit {
            return Err(ConfigError::NotFound(config_path));
        }
        debug!(path = %config_path.display(), "No config file; using built-in defaults");
        return Ok(Config::default());
    }

    let config_content = fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
        path: config_path.clone(),
        source,
    })?;

    let config: Config =
        serde_saphyr::from_str(&config_content).map_err(|e| ConfigError::Parse {
            path: config_path.clone(),
            message: e.to_string(),
        })?;

    debug!(path = %config_path.display(), "Loaded config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_path_layout() {
        let path = get_config_path();
        assert!(path.ends_with(".config/loan-score/config.yaml"));
    }

    #[test]
    fn test_explicit_missing_config_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.yaml");
        let err = load_config(Some(path.clone())).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(p) if p == path));
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "rules: [not, a, map]\n").unwrap();
        let err = load_config(Some(path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_config_with_inputs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "inputs:\n  dir: /srv/curated\noutput:\n  format: tsv\n").unwrap();

        let config = load_config(Some(path)).unwrap();
        assert_eq!(
            config.inputs.and_then(|i| i.dir),
            Some(PathBuf::from("/srv/curated"))
        );
        assert_eq!(
            config.output.and_then(|o| o.format),
            Some(crate::output::OutputFormat::Tsv)
        );
    }
}
