//! Process configuration, read from environment variables.
//!
//! `main.rs` seeds the environment from a `.env` file first (if present).

use chrono::Duration;
use thiserror::Error;

use lorecraft_observability::LogFormat;

const DEFAULT_HOSTNAME: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TOKEN_EXPIRY: &str = "24h";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Prod,
}

impl Profile {
    pub fn as_str(self) -> &'static str {
        match self {
            Profile::Dev => "dev",
            Profile::Prod => "prod",
        }
    }

    pub fn log_format(self) -> LogFormat {
        LogFormat::for_profile(self.as_str())
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub profile: Profile,
    pub hostname: String,
    pub port: u16,
    pub token_expiry: Duration,
    /// Base64 of the PKCS#8 PEM private key.
    pub private_key: String,
    /// Base64 of the SPKI PEM public key.
    pub public_key: String,
    pub secure_cookies: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let profile = match var("PROFILE").as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("dev") => Profile::Dev,
            Some("prod") => Profile::Prod,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "PROFILE",
                    reason: format!("expected dev or prod, got '{other}'"),
                });
            }
        };

        let hostname = var("APP_HOSTNAME").unwrap_or_else(|| DEFAULT_HOSTNAME.to_string());

        let port = match var("SERVER_PORT") {
            None => DEFAULT_PORT,
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                key: "SERVER_PORT",
                reason: e.to_string(),
            })?,
        };

        let token_expiry = parse_duration(&var("TOKEN_EXPIRY").unwrap_or_else(|| DEFAULT_TOKEN_EXPIRY.to_string()))
            .map_err(|reason| ConfigError::Invalid {
                key: "TOKEN_EXPIRY",
                reason,
            })?;

        let private_key = var("TOKEN_PRIVATE_KEY").ok_or(ConfigError::Missing("TOKEN_PRIVATE_KEY"))?;
        let public_key = var("TOKEN_PUBLIC_KEY").ok_or(ConfigError::Missing("TOKEN_PUBLIC_KEY"))?;

        let secure_cookies = match var("SECURE_COOKIES") {
            None => profile == Profile::Prod,
            Some(raw) => raw.parse::<bool>().map_err(|e| ConfigError::Invalid {
                key: "SECURE_COOKIES",
                reason: e.to_string(),
            })?,
        };

        Ok(Self {
            profile,
            hostname,
            port,
            token_expiry,
            private_key,
            public_key,
            secure_cookies,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("profile", &self.profile)
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("token_expiry", &self.token_expiry)
            .field("secure_cookies", &self.secure_cookies)
            .finish_non_exhaustive()
    }
}

/// Parse `<n><unit>` with unit one of `s`, `m`, `h`, `d`. Must be positive.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("'{raw}' has no unit (expected s, m, h or d)"))?;
    let (digits, unit) = raw.split_at(split);

    let n: i64 = digits
        .parse()
        .map_err(|_| format!("'{raw}' does not start with a number"))?;
    if n <= 0 {
        return Err(format!("'{raw}' must be positive"));
    }

    let duration = match unit {
        "s" => Duration::try_seconds(n),
        "m" => Duration::try_minutes(n),
        "h" => Duration::try_hours(n),
        "d" => Duration::try_days(n),
        other => return Err(format!("unknown unit '{other}' (expected s, m, h or d)")),
    };
    duration.ok_or_else(|| format!("'{raw}' is out of range"))
}
