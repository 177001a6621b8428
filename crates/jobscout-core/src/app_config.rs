use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub locations_path: Option<PathBuf>,
    pub api_url: String,
    pub auth_token: Option<String>,
    pub credential_file: Option<PathBuf>,
    pub admin_tokens: Vec<String>,
    pub sweep_interval_secs: u64,
    pub jitter_min_ms: u64,
    pub jitter_max_ms: u64,
    pub cooldown_min_secs: u64,
    pub cooldown_max_secs: u64,
    pub resume_check_secs: u64,
    pub suspend_on_missing_credential: bool,
    pub request_log_capacity: usize,
    pub health_window: usize,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
    pub search_radius_km: u32,
    pub page_size: u32,
    pub locale: String,
    pub country: String,
    pub start_date_filter: Option<NaiveDate>,
    pub alert_webhook_url: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("bind_addr", &self.bind_addr)
            .field("data_dir", &self.data_dir)
            .field("locations_path", &self.locations_path)
            .field("api_url", &self.api_url)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[redacted]"),
            )
            .field("credential_file", &self.credential_file)
            .field(
                "admin_tokens",
                &format_args!("[{} redacted]", self.admin_tokens.len()),
            )
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .field("jitter_min_ms", &self.jitter_min_ms)
            .field("jitter_max_ms", &self.jitter_max_ms)
            .field("cooldown_min_secs", &self.cooldown_min_secs)
            .field("cooldown_max_secs", &self.cooldown_max_secs)
            .field("resume_check_secs", &self.resume_check_secs)
            .field(
                "suspend_on_missing_credential",
                &self.suspend_on_missing_credential,
            )
            .field("request_log_capacity", &self.request_log_capacity)
            .field("health_window", &self.health_window)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("search_radius_km", &self.search_radius_km)
            .field("page_size", &self.page_size)
            .field("locale", &self.locale)
            .field("country", &self.country)
            .field("start_date_filter", &self.start_date_filter)
            .field(
                "alert_webhook_url",
                &self.alert_webhook_url.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}
