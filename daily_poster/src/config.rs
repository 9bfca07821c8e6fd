use series_scraper::{
    ai::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL},
    scraper::DEFAULT_BASE_URL,
};
use thiserror::Error;

use crate::feishu::DEFAULT_FEISHU_BASE_URL;

pub const DEFAULT_TABLE_PATH: &str = "车系_url.csv";
pub const DEFAULT_SENT_LOG_PATH: &str = "sent_car_ids.txt";

const APP_ID: &str = "FEISHU_APP_ID";
const APP_SECRET: &str = "FEISHU_APP_SECRET";
const CHAT_ID: &str = "FEISHU_CHAT_ID";
const GEMINI_API_KEY: &str = "GEMINI_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
}

/// Everything the poster needs from its environment. Built once in `main`
/// and handed down by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub app_id: String,
    pub app_secret: String,
    pub chat_id: String,
    pub gemini_api_key: String,
    pub feishu_base_url: String,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub series_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Blank values count as missing. Every absent credential is reported,
    /// not just the first.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut missing = Vec::new();
        let mut required = |key: &'static str| {
            get(key).unwrap_or_else(|| {
                missing.push(key);
                String::new()
            })
        };
        let app_id = required(APP_ID);
        let app_secret = required(APP_SECRET);
        let chat_id = required(CHAT_ID);
        let gemini_api_key = required(GEMINI_API_KEY);

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        Ok(Self {
            app_id,
            app_secret,
            chat_id,
            gemini_api_key,
            feishu_base_url: get("FEISHU_BASE_URL")
                .unwrap_or_else(|| DEFAULT_FEISHU_BASE_URL.to_string()),
            gemini_base_url: get("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            series_base_url: get("SERIES_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}
