//! Environment-driven configuration

use crate::carousel::CarouselTiming;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_PIPELINE_URL: &str = "http://localhost:8100/chat";
pub const DEFAULT_PRODUCT_TYPE: &str = "laptops";
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_USER_PROFILE: &str = "default";
/// Upper bound for carousel interval and cooldown
pub const MAX_CAROUSEL_SECS: u64 = 86_400;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub port: u16,
    /// Base URL of the remote reasoning pipeline
    pub pipeline_url: String,
    /// Product-category selector
    pub product_type: String,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    /// Optional field-presentation table overriding the built-in one
    pub fields_path: Option<PathBuf>,
    /// Profile name under `<data_dir>/user_profiles/`
    pub user_profile: String,
    pub carousel: CarouselTiming,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let db_path = lookup("GENUI_DB_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".genui-assistant").join("history.db")
            },
            PathBuf::from,
        );

        Self {
            port: parse_or(&lookup, "GENUI_PORT", DEFAULT_PORT),
            pipeline_url: text("GENUI_PIPELINE_URL", DEFAULT_PIPELINE_URL),
            product_type: text("GENUI_PRODUCT_TYPE", DEFAULT_PRODUCT_TYPE),
            data_dir: PathBuf::from(text("GENUI_DATA_DIR", DEFAULT_DATA_DIR)),
            db_path,
            fields_path: lookup("GENUI_FIELDS_PATH").map(PathBuf::from),
            user_profile: text("GENUI_USER_PROFILE", DEFAULT_USER_PROFILE),
            carousel: CarouselTiming {
                interval: carousel_secs(&lookup, "GENUI_CAROUSEL_INTERVAL_SECS", CarouselTiming::default().interval),
                cooldown: carousel_secs(&lookup, "GENUI_CAROUSEL_COOLDOWN_SECS", CarouselTiming::default().cooldown),
            },
        }
    }
}

/// Parse a variable, falling back to `default` (with a warning) when it is
/// malformed
fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, default = %default, "Malformed config value, using default");
            default
        }),
    }
}

/// Carousel duration in whole seconds, within `1..=MAX_CAROUSEL_SECS`
fn carousel_secs(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: Duration) -> Duration {
    let secs = parse_or(lookup, key, default.as_secs());
    if (1..=MAX_CAROUSEL_SECS).contains(&secs) {
        Duration::from_secs(secs)
    } else {
        tracing::warn!(key, value = secs, max = MAX_CAROUSEL_SECS, "Carousel timing out of range, using default");
        default
    }
}
