use std::net::SocketAddr;
use std::path::PathBuf;

/// Secrets shipped in sample `.env` files. Never valid in production.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

const DEV_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("MEMENTO_JWT_SECRET is unset or still a placeholder; set it, or MEMENTO_ALLOW_DEV_SECRET=1 for local use")]
    InsecureSecret,

    #[error("{name} is not valid: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let allow_dev = get("MEMENTO_ALLOW_DEV_SECRET").is_some_and(|v| v == "1");
        let jwt_secret = match get("MEMENTO_JWT_SECRET").unwrap_or_default() {
            s if !s.is_empty() && !PLACEHOLDER_SECRETS.contains(&s.as_str()) => s,
            s if allow_dev => {
                if s.is_empty() {
                    DEV_SECRET.to_string()
                } else {
                    s
                }
            }
            _ => return Err(ConfigError::InsecureSecret),
        };

        let host = get("MEMENTO_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = get("MEMENTO_PORT").unwrap_or_else(|| "3000".into());
        let raw_addr = format!("{}:{}", host, port);
        let addr = raw_addr.parse().map_err(|_| ConfigError::Invalid {
            name: "MEMENTO_HOST/MEMENTO_PORT",
            value: raw_addr.clone(),
        })?;

        let db_path = get("MEMENTO_DB_PATH").unwrap_or_else(|| "memento.db".into()).into();

        Ok(Self {
            addr,
            db_path,
            jwt_secret,
        })
    }
}
