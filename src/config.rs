//! Runtime settings, read from the process environment after `.env` is loaded.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_GATEWAY_URL: &str = "https://ai.gateway.lovable.dev/v1";
pub const DEFAULT_TEXT_MODEL: &str = "google/gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "google/gemini-2.5-flash-image-preview";

#[derive(Debug, Clone)]
pub struct Settings {
    /// Absent credentials do not stop the server; analysis requests fail instead.
    pub api_key: Option<String>,
    pub gateway_url: String,
    pub text_model: String,
    pub image_model: String,
    pub structure_images: bool,
    pub request_timeout: Duration,
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub session_secret: Option<String>,
    pub signed_url_ttl: Duration,
    pub body_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            structure_images: true,
            request_timeout: Duration::from_secs(120),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            data_dir: PathBuf::from("./data"),
            session_secret: None,
            signed_url_ttl: Duration::from_secs(3600),
            body_limit: 20 * 1024 * 1024,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            api_key: get("AI_GATEWAY_API_KEY"),
            gateway_url: get("AI_GATEWAY_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.gateway_url),
            text_model: get("AI_TEXT_MODEL").unwrap_or(defaults.text_model),
            image_model: get("AI_IMAGE_MODEL").unwrap_or(defaults.image_model),
            structure_images: match get("STRUCTURE_IMAGES") {
                Some(v) => parse_bool("STRUCTURE_IMAGES", &v)?,
                None => defaults.structure_images,
            },
            request_timeout: match get("AI_TIMEOUT_SECS") {
                Some(v) => Duration::from_secs(parse("AI_TIMEOUT_SECS", &v)?),
                None => defaults.request_timeout,
            },
            bind_addr: match get("BIND_ADDR") {
                Some(v) => parse("BIND_ADDR", &v)?,
                None => defaults.bind_addr,
            },
            data_dir: get("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            session_secret: get("SESSION_SECRET"),
            signed_url_ttl: match get("SIGNED_URL_TTL_SECS") {
                Some(v) => Duration::from_secs(parse("SIGNED_URL_TTL_SECS", &v)?),
                None => defaults.signed_url_ttl,
            },
            body_limit: match get("BODY_LIMIT_BYTES") {
                Some(v) => parse("BODY_LIMIT_BYTES", &v)?,
                None => defaults.body_limit,
            },
        })
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("invalid value for {key}: {value:?}"))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("invalid value for {key}: {value:?}"),
    }
}
