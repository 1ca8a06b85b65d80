// crates/dbmock-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for dbmock-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::path::PathBuf;

use dbmock_config::ConfigError;
use dbmock_config::MockConfig;
use tempfile::TempDir;

/// Parses a TOML string into a `MockConfig` without validating it.
pub fn config_from_toml(toml_str: &str) -> Result<MockConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a minimal config with all defaults applied.
pub fn minimal_config() -> Result<MockConfig, toml::de::Error> {
    config_from_toml("")
}

/// Writes `content` to a config file inside a fresh temporary directory.
pub fn write_config(content: &str) -> Result<(TempDir, PathBuf), String> {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("dbmock.toml");
    std::fs::write(&path, content).map_err(|err| err.to_string())?;
    Ok((dir, path))
}

/// Checks that `result` failed with a message containing `needle`.
pub fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> Result<(), String> {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}
