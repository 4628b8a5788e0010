use std::net::SocketAddr;

use crate::error::{AppError, AppResult, ConfigError};
use crate::session::SessionLimits;

use super::types::{ConfigFile, LimitsConfig};

pub const DEFAULT_CONTROL_LISTEN: &str = "0.0.0.0:5800";
pub const DEFAULT_DATA_LISTEN: &str = "0.0.0.0:5801";

/// Everything the server needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub control_listen: SocketAddr,
    pub data_listen: SocketAddr,
    pub verbose: bool,
    pub limits: SessionLimits,
}

impl ServerSettings {
    /// Resolves settings from an optional config file, filling in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when an address does not parse or a limit is zero.
    pub fn from_config(config: Option<&ConfigFile>) -> AppResult<Self> {
        let control_listen = parse_addr(
            "control_listen",
            config.and_then(|config| config.control_listen.as_deref()),
            DEFAULT_CONTROL_LISTEN,
        )?;
        let data_listen = parse_addr(
            "data_listen",
            config.and_then(|config| config.data_listen.as_deref()),
            DEFAULT_DATA_LISTEN,
        )?;
        let limits = config
            .and_then(|config| config.limits)
            .map_or_else(|| Ok(SessionLimits::default()), apply_limits)?;
        Ok(Self {
            control_listen,
            data_listen,
            verbose: config.and_then(|config| config.verbose).unwrap_or(false),
            limits,
        })
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            control_listen: SocketAddr::from(([0, 0, 0, 0], 5800)),
            data_listen: SocketAddr::from(([0, 0, 0, 0], 5801)),
            verbose: false,
            limits: SessionLimits::default(),
        }
    }
}

fn parse_addr(field: &'static str, value: Option<&str>, default: &str) -> AppResult<SocketAddr> {
    let value = value.unwrap_or(default);
    value.parse().map_err(|err| {
        AppError::config(ConfigError::InvalidAddress {
            field,
            value: value.to_owned(),
            source: err,
        })
    })
}

fn apply_limits(config: LimitsConfig) -> AppResult<SessionLimits> {
    let defaults = SessionLimits::default();
    Ok(SessionLimits {
        max_flows: ensure_positive(config.max_flows, defaults.max_flows, "limits.max_flows")?,
        max_sdus_per_flow: ensure_positive(
            config.max_sdus_per_flow,
            defaults.max_sdus_per_flow,
            "limits.max_sdus_per_flow",
        )?,
        max_sdu_size: ensure_positive(
            config.max_sdu_size,
            defaults.max_sdu_size,
            "limits.max_sdu_size",
        )?,
    })
}

fn ensure_positive(value: Option<u32>, default: u32, field: &'static str) -> AppResult<u32> {
    match value {
        Some(0) => Err(AppError::config(ConfigError::FieldMustBePositive { field })),
        Some(value) => Ok(value),
        None => Ok(default),
    }
}
