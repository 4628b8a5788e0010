use std::net::SocketAddr;

use tempfile::tempdir;

use super::{ServerSettings, load_config_file};
use crate::error::{AppError, AppResult, ConfigError};
use crate::session::SessionLimits;

fn write_config(name: &str, content: &str) -> AppResult<(tempfile::TempDir, std::path::PathBuf)> {
    let dir = tempdir()?;
    let path = dir.path().join(name);
    std::fs::write(&path, content)?;
    Ok((dir, path))
}

#[test]
fn parse_toml_config_with_limits() -> AppResult<()> {
    let (_dir, path) = write_config(
        "flowband.toml",
        r#"
control_listen = "127.0.0.1:6800"
verbose = true

[limits]
max_flows = 4
max_sdu_size = 1500
"#,
    )?;
    let config = load_config_file(&path)?;
    let settings = ServerSettings::from_config(Some(&config))?;
    let expected_control: SocketAddr = SocketAddr::from(([127, 0, 0, 1], 6800));
    if settings.control_listen != expected_control || !settings.verbose {
        return Err(AppError::config(format!("Unexpected settings: {:?}", settings)));
    }
    if settings.data_listen != ServerSettings::default().data_listen {
        return Err(AppError::config("Expected default data listener"));
    }
    let expected_limits = SessionLimits {
        max_flows: 4,
        max_sdus_per_flow: SessionLimits::default().max_sdus_per_flow,
        max_sdu_size: 1_500,
    };
    if settings.limits != expected_limits {
        return Err(AppError::config(format!(
            "Unexpected limits: {:?}",
            settings.limits
        )));
    }
    Ok(())
}

#[test]
fn parse_json_config() -> AppResult<()> {
    let (_dir, path) = write_config(
        "flowband.json",
        r#"{"data_listen": "127.0.0.1:7801", "limits": {"max_sdus": 20}}"#,
    )?;
    let config = load_config_file(&path)?;
    let settings = ServerSettings::from_config(Some(&config))?;
    if settings.data_listen != SocketAddr::from(([127, 0, 0, 1], 7801)) {
        return Err(AppError::config("Unexpected data listener"));
    }
    if settings.limits.max_sdus_per_flow != 20 || settings.limits.max_flows != 10 {
        return Err(AppError::config(format!(
            "Unexpected limits: {:?}",
            settings.limits
        )));
    }
    Ok(())
}

#[test]
fn missing_config_falls_back_to_defaults() -> AppResult<()> {
    let settings = ServerSettings::from_config(None)?;
    if settings != ServerSettings::default() {
        return Err(AppError::config(format!("Unexpected defaults: {:?}", settings)));
    }
    Ok(())
}

#[test]
fn zero_limit_is_rejected() -> AppResult<()> {
    let (_dir, path) = write_config("flowband.toml", "[limits]\nmax_flows = 0\n")?;
    let config = load_config_file(&path)?;
    match ServerSettings::from_config(Some(&config)) {
        Err(AppError::Config(ConfigError::FieldMustBePositive { field })) => {
            if field != "limits.max_flows" {
                return Err(AppError::config(format!("Unexpected field: {}", field)));
            }
            Ok(())
        }
        other => Err(AppError::config(format!(
            "Expected positive limit error, got {:?}",
            other
        ))),
    }
}

#[test]
fn invalid_address_is_rejected() -> AppResult<()> {
    let (_dir, path) = write_config("flowband.toml", "control_listen = \"nowhere\"\n")?;
    let config = load_config_file(&path)?;
    match ServerSettings::from_config(Some(&config)) {
        Err(AppError::Config(ConfigError::InvalidAddress { field, .. }))
            if field == "control_listen" =>
        {
            Ok(())
        }
        other => Err(AppError::config(format!(
            "Expected invalid address error, got {:?}",
            other
        ))),
    }
}

#[test]
fn unsupported_extension_is_rejected() -> AppResult<()> {
    let (_dir, path) = write_config("flowband.yaml", "verbose: true\n")?;
    match load_config_file(&path) {
        Err(AppError::Config(ConfigError::UnsupportedExtension { ext })) if ext == "yaml" => Ok(()),
        other => Err(AppError::config(format!(
            "Expected unsupported extension, got {:?}",
            other.map(|config| config.verbose)
        ))),
    }
}
