use anyhow::{anyhow, Context};
use std::env;
use std::str::FromStr;

const MIN_BCRYPT_COST: u32 = 4;
const MAX_BCRYPT_COST: u32 = 31;

/// Runtime settings read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    /// Without a database URL the server keeps everything in memory.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_expiry_days: i64,
    pub bcrypt_cost: u32,
    pub port: u16,
    pub cors_allowed_origin: String,
    pub static_dir: Option<String>,
    pub max_request_body_mb: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = non_empty("JWT_SECRET").ok_or_else(|| anyhow!("JWT_SECRET must be set"))?;

        let bcrypt_cost = parse_or(&non_empty, "BCRYPT_COST", 10)?;
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&bcrypt_cost) {
            return Err(anyhow!(
                "BCRYPT_COST must be between {} and {}",
                MIN_BCRYPT_COST,
                MAX_BCRYPT_COST
            ));
        }

        Ok(Self {
            database_url: non_empty("DATABASE_URL"),
            database_max_connections: parse_or(&non_empty, "DATABASE_MAX_CONNECTIONS", 5)?,
            jwt_secret,
            jwt_expiry_days: parse_or(&non_empty, "JWT_EXPIRY_DAYS", 30)?,
            bcrypt_cost,
            port: parse_or(&non_empty, "PORT", 5000)?,
            cors_allowed_origin: non_empty("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            static_dir: non_empty("STATIC_DIR"),
            max_request_body_mb: parse_or(&non_empty, "MAX_REQUEST_BODY_MB", 2)?,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        None => Ok(default),
    }
}
