use std::path::PathBuf;
use std::str::FromStr;

use axum::http::HeaderValue;
use sprinkler_core::scheduling::DUE_WINDOW_SECS;
use sprinkler_core::types::PinId;
use sprinkler_gpio::sysfs::DEFAULT_SYSFS_ROOT;

const DEFAULT_GPIO_PINS: &str = "4,17,27,22,5,6,13,19";

/// I²C and UART lines on a Raspberry Pi header.
const DEFAULT_GPIO_DENY: &str = "2,3,14,15";

/// Errors raised while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required in the environment")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Which pin driver to open at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioBackend {
    Sysfs,
    Memory,
}

impl FromStr for GpioBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sysfs" => Ok(GpioBackend::Sysfs),
            "memory" => Ok(GpioBackend::Memory),
            other => Err(format!("unknown backend '{other}', expected sysfs or memory")),
        }
    }
}

/// Pin wiring and driver selection.
#[derive(Debug, Clone)]
pub struct GpioConfig {
    /// Output pins in zone order (zone 1 first).
    pub pins: Vec<PinId>,
    /// Pins that may never be driven.
    pub deny: Vec<PinId>,
    pub backend: GpioBackend,
    /// Relay board closes on a low level.
    pub active_low: bool,
    pub sysfs_root: PathBuf,
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<HeaderValue>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Shared bearer token every `/api/v1` request must present.
    pub api_token: String,
    pub gpio: GpioConfig,
    pub schedules_path: PathBuf,
    /// Schedule dispatch period in seconds (default: `30`, at most `60`).
    pub poll_interval_secs: u64,
    /// Manual run length when the request names none (default: `30`).
    pub default_runtime_minutes: u32,
    /// Rain lock length when the request names none (default: `24`).
    pub rain_lock_default_hours: u32,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                             | Default                 |
    /// |-------------------------------------|-------------------------|
    /// | `HOST`                              | `0.0.0.0`               |
    /// | `PORT`                              | `8000`                  |
    /// | `CORS_ORIGINS`                      | (none)                  |
    /// | `REQUEST_TIMEOUT_SECS`              | `30`                    |
    /// | `SPRINKLER_API_TOKEN`               | required                |
    /// | `SPRINKLER_GPIO_PINS`               | `4,17,27,22,5,6,13,19`  |
    /// | `SPRINKLER_GPIO_DENY`               | `2,3,14,15`             |
    /// | `SPRINKLER_GPIO_BACKEND`            | `sysfs`                 |
    /// | `SPRINKLER_GPIO_ACTIVE_LOW`         | `true`                  |
    /// | `SPRINKLER_GPIO_SYSFS_ROOT`         | `/sys/class/gpio`       |
    /// | `SPRINKLER_SCHEDULES_PATH`          | `./data/schedules.json` |
    /// | `SPRINKLER_POLL_INTERVAL_SECS`      | `30`                    |
    /// | `SPRINKLER_DEFAULT_RUNTIME_MINUTES` | `30`                    |
    /// | `RAIN_LOCK_DEFAULT_HOURS`           | `24`                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &'static str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let api_token = lookup("SPRINKLER_API_TOKEN")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::Missing("SPRINKLER_API_TOKEN"))?;

        let cors_origins = get("CORS_ORIGINS", "")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|e| invalid("CORS_ORIGINS", origin, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let gpio = GpioConfig {
            pins: parse_pins("SPRINKLER_GPIO_PINS", &get("SPRINKLER_GPIO_PINS", DEFAULT_GPIO_PINS))?,
            deny: parse_pins("SPRINKLER_GPIO_DENY", &get("SPRINKLER_GPIO_DENY", DEFAULT_GPIO_DENY))?,
            backend: parse("SPRINKLER_GPIO_BACKEND", &get("SPRINKLER_GPIO_BACKEND", "sysfs"))?,
            active_low: parse_bool(
                "SPRINKLER_GPIO_ACTIVE_LOW",
                &get("SPRINKLER_GPIO_ACTIVE_LOW", "true"),
            )?,
            sysfs_root: get("SPRINKLER_GPIO_SYSFS_ROOT", DEFAULT_SYSFS_ROOT).into(),
        };

        Ok(Self {
            host: get("HOST", "0.0.0.0"),
            port: parse("PORT", &get("PORT", "8000"))?,
            cors_origins,
            request_timeout_secs: parse("REQUEST_TIMEOUT_SECS", &get("REQUEST_TIMEOUT_SECS", "30"))?,
            api_token,
            gpio,
            schedules_path: get("SPRINKLER_SCHEDULES_PATH", "./data/schedules.json").into(),
            poll_interval_secs: poll_interval(parse(
                "SPRINKLER_POLL_INTERVAL_SECS",
                &get("SPRINKLER_POLL_INTERVAL_SECS", "30"),
            )?)?,
            default_runtime_minutes: parse(
                "SPRINKLER_DEFAULT_RUNTIME_MINUTES",
                &get("SPRINKLER_DEFAULT_RUNTIME_MINUTES", "30"),
            )?,
            rain_lock_default_hours: parse(
                "RAIN_LOCK_DEFAULT_HOURS",
                &get("RAIN_LOCK_DEFAULT_HOURS", "24"),
            )?,
        })
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| invalid(var, value, e))
}

fn parse_pins(var: &'static str, value: &str) -> Result<Vec<PinId>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|pin| parse(var, pin))
        .collect()
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(var, value, "expected true or false")),
    }
}

/// A poll period longer than the due window could step over a schedule's
/// start time entirely.
fn poll_interval(value: u64) -> Result<u64, ConfigError> {
    const VAR: &str = "SPRINKLER_POLL_INTERVAL_SECS";
    if value == 0 {
        return Err(invalid(VAR, "0", "must be greater than zero"));
    }
    if i64::try_from(value).map_or(true, |secs| secs > DUE_WINDOW_SECS) {
        return Err(invalid(
            VAR,
            &value.to_string(),
            format!("must be at most {DUE_WINDOW_SECS} seconds"),
        ));
    }
    Ok(value)
}

fn invalid(var: &'static str, value: &str, reason: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
