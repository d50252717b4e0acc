use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_CAPTURE_INTERVAL_SECS, DEFAULT_CAPTURE_STREAM, DEFAULT_MYSQL_PORT, DEFAULT_PAGE_LIMIT,
    MAX_PAGE_LIMIT, RESERVOIR_API_URL,
};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub feed: FeedConfig,
    /// Absent when neither `DATABASE_URL` nor `MYSQL_HOST` is set.
    pub database: Option<DatabaseConfig>,
    pub capture: CaptureConfig,
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub page_limit: u32,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub interval: Duration,
    /// Identifier of the cursor row for this feed.
    pub stream: String,
    pub cursor_mode: CursorMode,
    /// Seed each page's aggregation with the prices already stored for its tokens.
    pub seed_from_store: bool,
}

/// How a run decides where to start reading and where to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorMode {
    /// Oldest first, resume from the stored continuation token.
    #[default]
    Continuation,
    /// Newest first from the head of the feed, stop at the last processed event.
    Boundary,
}

impl CursorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CursorMode::Continuation => "continuation",
            CursorMode::Boundary => "boundary",
        }
    }
}

impl FromStr for CursorMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "continuation" => Ok(CursorMode::Continuation),
            "boundary" => Ok(CursorMode::Boundary),
            other => Err(format!("unknown cursor mode: {}", other)),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let page_limit = parse_or(&var, "RESERVOIR_PAGE_LIMIT", DEFAULT_PAGE_LIMIT)?;
        if page_limit == 0 || page_limit > MAX_PAGE_LIMIT {
            return Err(Error::Config(format!(
                "RESERVOIR_PAGE_LIMIT must be between 1 and {}",
                MAX_PAGE_LIMIT
            )));
        }

        let feed = FeedConfig {
            api_url: var("RESERVOIR_API_URL")
                .unwrap_or_else(|| RESERVOIR_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: var("RESERVOIR_API_KEY"),
            page_limit,
        };

        let database = database_url(&var)?.map(|url| DatabaseConfig { url });

        let interval_secs = parse_or(&var, "CAPTURE_INTERVAL_SECS", DEFAULT_CAPTURE_INTERVAL_SECS)?;
        if interval_secs == 0 {
            return Err(Error::Config("CAPTURE_INTERVAL_SECS must be positive".into()));
        }

        let capture = CaptureConfig {
            interval: Duration::from_secs(interval_secs),
            stream: var("CAPTURE_STREAM").unwrap_or_else(|| DEFAULT_CAPTURE_STREAM.to_string()),
            cursor_mode: parse_or(&var, "CAPTURE_CURSOR_MODE", CursorMode::default())?,
            seed_from_store: parse_bool(&var, "CAPTURE_SEED_FROM_STORE")?,
        };

        Ok(Config {
            feed,
            database,
            capture,
        })
    }

    pub fn database(&self) -> Result<&DatabaseConfig> {
        self.database
            .as_ref()
            .ok_or_else(|| Error::Config("DATABASE_URL or MYSQL_HOST not set".into()))
    }
}

fn database_url<F>(var: &F) -> Result<Option<String>>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = var("DATABASE_URL") {
        return Ok(Some(url));
    }

    let host = match var("MYSQL_HOST") {
        Some(host) => host,
        None => return Ok(None),
    };
    let user = var("MYSQL_USER").ok_or_else(|| Error::Config("MYSQL_USER not set".into()))?;
    let database =
        var("MYSQL_DATABASE").ok_or_else(|| Error::Config("MYSQL_DATABASE not set".into()))?;
    let port: u16 = parse_or(var, "MYSQL_PORT", DEFAULT_MYSQL_PORT)?;

    let mut url = url::Url::parse(&format!("mysql://{}:{}/{}", host, port, database))?;
    url.set_username(&user)
        .map_err(|_| Error::Config("MYSQL_USER is not a valid user name".into()))?;
    if let Some(password) = var("MYSQL_PASSWORD") {
        url.set_password(Some(&password))
            .map_err(|_| Error::Config("MYSQL_PASSWORD could not be encoded".into()))?;
    }

    Ok(Some(url.to_string()))
}

fn parse_or<F, T>(var: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("{} is invalid: {}", key, e))),
        None => Ok(default),
    }
}

fn parse_bool<F>(var: &F, key: &str) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match var(key).map(|v| v.to_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(Error::Config(format!("{} must be a boolean, got {}", key, v))),
        },
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_url: RESERVOIR_API_URL.to_string(),
            api_key: None,
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_CAPTURE_INTERVAL_SECS),
            stream: DEFAULT_CAPTURE_STREAM.to_string(),
            cursor_mode: CursorMode::default(),
            seed_from_store: false,
        }
    }
}
