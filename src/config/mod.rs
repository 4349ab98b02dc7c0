use crate::drive::ListingMode;
use crate::error::ConfigError;
use crate::matcher::SimilarityThreshold;
use std::time::Duration;

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(8 * 60 * 60);

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub drive: DriveConfig,
    pub matching: MatchConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
}

#[derive(Clone, Debug)]
pub struct DriveConfig {
    pub bucket: String,
    pub region: String,
    pub server: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub listing: ListingMode,
}

#[derive(Clone, Debug)]
pub struct MatchConfig {
    pub threshold: SimilarityThreshold,
    pub concurrency: usize,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub session_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: None,
            password_hash: None,
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get_str = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let get_opt = |key: &str| -> Option<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let drive = DriveConfig {
            bucket: get_str("DRIVE_BUCKET", "fotos-museu"),
            region: get_str("DRIVE_REGION", "us-east-2"),
            server: get_opt("DRIVE_SERVER").map(|server| {
                if !server.starts_with("http://") && !server.starts_with("https://") {
                    format!("http://{}", server)
                } else {
                    server
                }
            }),
            access_key: get_opt("DRIVE_ACCESSKEY"),
            secret_key: get_opt("DRIVE_SECRET"),
            listing: match get_opt("DRIVE_LISTING") {
                Some(value) => value.parse().map_err(|reason| ConfigError::Invalid {
                    key: "DRIVE_LISTING".to_string(),
                    value,
                    reason,
                })?,
                None => ListingMode::default(),
            },
        };

        let threshold = match get_opt("MATCH_THRESHOLD") {
            Some(value) => value
                .parse::<f32>()
                .map_err(|e| e.to_string())
                .and_then(SimilarityThreshold::new)
                .map_err(|reason| ConfigError::Invalid {
                    key: "MATCH_THRESHOLD".to_string(),
                    value,
                    reason,
                })?,
            None => SimilarityThreshold::default(),
        };

        let concurrency = parse_or("MATCH_CONCURRENCY", get_opt("MATCH_CONCURRENCY"), 1usize)?;
        if concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "MATCH_CONCURRENCY".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let session_ttl = match get_opt("AUTH_SESSION_TTL_SECS") {
            Some(value) => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                Ok(_) => {
                    return Err(ConfigError::Invalid {
                        key: "AUTH_SESSION_TTL_SECS".to_string(),
                        value,
                        reason: "must be at least 1".to_string(),
                    })
                }
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        key: "AUTH_SESSION_TTL_SECS".to_string(),
                        reason: e.to_string(),
                        value,
                    })
                }
            },
            None => DEFAULT_SESSION_TTL,
        };

        Ok(AppConfig {
            drive,
            matching: MatchConfig {
                threshold,
                concurrency,
            },
            server: ServerConfig {
                host: get_str("SERVER_HOST", "127.0.0.1"),
                port: parse_or("SERVER_PORT", get_opt("SERVER_PORT"), 8080u16)?,
            },
            auth: AuthConfig {
                username: get_opt("AUTH_USERNAME"),
                password_hash: get_opt("AUTH_PASSWORD_HASH"),
                session_ttl,
            },
        })
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => v.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key: key.to_string(),
            value: v.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
