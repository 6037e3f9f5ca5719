//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::{CoverageConfig, MAX_COMB_DEPTH};
use std::path::Path;

/// Name of the configuration file looked up in a project directory.
pub const CONFIG_FILE_NAME: &str = "vcov.toml";

/// Loads `<project_dir>/vcov.toml`, falling back to defaults when it does not exist.
pub fn load_config(project_dir: &Path) -> Result<CoverageConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return Ok(CoverageConfig::default());
    }
    load_config_file(&config_path)
}

/// Loads and validates a configuration from an explicit file path.
pub fn load_config_file(path: &Path) -> Result<CoverageConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `vcov.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<CoverageConfig, ConfigError> {
    let config: CoverageConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that limits are in range and required values are present.
fn validate_config(config: &CoverageConfig) -> Result<(), ConfigError> {
    if config.inline.comb_depth > MAX_COMB_DEPTH {
        return Err(ConfigError::ValidationError(format!(
            "inline.comb_depth must be <= {MAX_COMB_DEPTH}"
        )));
    }
    if config.inline.max_generate_iterations == 0 {
        return Err(ConfigError::ValidationError(
            "inline.max_generate_iterations must be > 0".to_string(),
        ));
    }
    if config.inline.max_line_length < 80 {
        return Err(ConfigError::ValidationError(
            "inline.max_line_length must be >= 80".to_string(),
        ));
    }
    if config.output.dir.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "output.dir must not be empty".to_string(),
        ));
    }
    if config.output.instance_ids.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "output.instance_ids must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config, CoverageConfig::default());
        assert_eq!(config.output.dir, "covered/verilog");
        assert_eq!(config.inline.max_generate_iterations, 65_536);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[coverage]
line = true
combinational = false
memory = true
event = false
fsm = true

[inline]
comb_depth = 3
max_generate_iterations = 128
max_line_length = 4095

[output]
dir = "build/cov"
instance_ids = "ids.v"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert!(!config.coverage.combinational);
        assert!(!config.coverage.event);
        assert_eq!(config.inline.comb_depth, 3);
        assert_eq!(config.inline.max_generate_iterations, 128);
        assert_eq!(config.inline.max_line_length, 4095);
        assert_eq!(config.output.dir, "build/cov");
        assert_eq!(config.output.instance_ids, "ids.v");
    }

    #[test]
    fn depth_out_of_range() {
        let err = load_config_from_str("[inline]\ncomb_depth = 5000\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn zero_iterations_rejected() {
        let err = load_config_from_str("[inline]\nmax_generate_iterations = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn short_line_limit_rejected() {
        let err = load_config_from_str("[inline]\nmax_line_length = 10\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn empty_output_dir_rejected() {
        let err = load_config_from_str("[output]\ndir = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config, CoverageConfig::default());
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[coverage]\nline = false\n").unwrap();
        let config = load_config(dir.path()).unwrap();
        assert!(!config.coverage.line);
    }
}
