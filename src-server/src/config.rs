//! Server Configuration
//!
//! Everything is read from the environment once at startup. Missing secrets
//! are not fatal: the routes that need them answer 500 instead.

use std::env;
use std::path::PathBuf;

use crate::ocr::DEFAULT_MODELS;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub db_path: PathBuf,
    pub receipts_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Shared PIN checked by `/auth`
    pub pin_code: Option<String>,
    pub gemini_api_key: Option<String>,
    /// OCR models, tried in order
    pub ocr_models: Vec<String>,
    /// Add `Secure` to the session cookie
    pub secure_cookies: bool,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            db_path: PathBuf::from("eurl_books.db"),
            receipts_dir: PathBuf::from("receipts"),
            log_dir: PathBuf::from("logs"),
            pin_code: None,
            gemini_api_key: None,
            ocr_models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            secure_cookies: false,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn parse_model_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let ocr_models = env_string("EURL_OCR_MODELS")
            .map(|raw| parse_model_list(&raw))
            .filter(|models| !models.is_empty())
            .unwrap_or(defaults.ocr_models);

        Self {
            bind_addr: env_string("EURL_BIND_ADDR").unwrap_or(defaults.bind_addr),
            db_path: env_string("EURL_DB_PATH").map(PathBuf::from).unwrap_or(defaults.db_path),
            receipts_dir: env_string("EURL_RECEIPTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.receipts_dir),
            log_dir: env_string("EURL_LOG_DIR").map(PathBuf::from).unwrap_or(defaults.log_dir),
            pin_code: env_string("APP_PIN_CODE"),
            gemini_api_key: env_string("GEMINI_API_KEY"),
            ocr_models,
            secure_cookies: env_bool("EURL_SECURE_COOKIES", defaults.secure_cookies),
            max_upload_bytes: env_usize("EURL_MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
        }
    }
}
