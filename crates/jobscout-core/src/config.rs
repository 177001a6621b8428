use chrono::NaiveDate;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Upstream GraphQL endpoint used when `JOBSCOUT_API_URL` is not set.
pub const DEFAULT_API_URL: &str =
    "https://e5mquma77feepi2bdn4d6h3mpu.appsync-api.us-east-1.amazonaws.com/graphql";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files. Useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup, with no `set_var`/`remove_var` needed.
#[allow(clippy::too_many_lines)]
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Empty values are treated as unset so `.env` templates can leave them blank.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>().map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        match or_default(var, default).to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got '{other}'"))),
        }
    };

    let env = parse_environment(&or_default("JOBSCOUT_ENV", "development"))?;
    let log_level = or_default("JOBSCOUT_LOG_LEVEL", "info");

    let bind_addr = or_default("JOBSCOUT_BIND_ADDR", "0.0.0.0:8080")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("JOBSCOUT_BIND_ADDR", e.to_string()))?;
    let data_dir = PathBuf::from(or_default("JOBSCOUT_DATA_DIR", "./data"));
    let locations_path = optional("JOBSCOUT_LOCATIONS_PATH").map(PathBuf::from);

    let api_url = or_default("JOBSCOUT_API_URL", DEFAULT_API_URL);
    let auth_token = optional("JOBSCOUT_AUTH_TOKEN");
    let credential_file = optional("JOBSCOUT_CREDENTIAL_FILE").map(PathBuf::from);
    let admin_tokens: Vec<String> = or_default("JOBSCOUT_ADMIN_TOKENS", "")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect();

    let sweep_interval_secs = parse_u64("JOBSCOUT_SWEEP_INTERVAL_SECS", "180")?;
    let jitter_min_ms = parse_u64("JOBSCOUT_JITTER_MIN_MS", "1000")?;
    let jitter_max_ms = parse_u64("JOBSCOUT_JITTER_MAX_MS", "4000")?;
    let cooldown_min_secs = parse_u64("JOBSCOUT_COOLDOWN_MIN_SECS", "3600")?;
    let cooldown_max_secs = parse_u64("JOBSCOUT_COOLDOWN_MAX_SECS", "43200")?;
    let resume_check_secs = parse_u64("JOBSCOUT_RESUME_CHECK_SECS", "30")?;
    let suspend_on_missing_credential =
        parse_bool("JOBSCOUT_SUSPEND_ON_MISSING_CREDENTIAL", "false")?;

    let request_log_capacity = parse_usize("JOBSCOUT_REQUEST_LOG_CAPACITY", "400")?;
    let health_window = parse_usize("JOBSCOUT_HEALTH_WINDOW", "50")?;

    let request_timeout_secs = parse_u64("JOBSCOUT_REQUEST_TIMEOUT_SECS", "30")?;
    let connect_timeout_secs = parse_u64("JOBSCOUT_CONNECT_TIMEOUT_SECS", "10")?;
    let user_agent = or_default("JOBSCOUT_USER_AGENT", DEFAULT_USER_AGENT);
    let search_radius_km = parse_u32("JOBSCOUT_SEARCH_RADIUS_KM", "100")?;
    let page_size = parse_u32("JOBSCOUT_PAGE_SIZE", "100")?;
    let locale = or_default("JOBSCOUT_LOCALE", "en-CA");
    let country = or_default("JOBSCOUT_COUNTRY", "Canada");
    let start_date_filter = optional("JOBSCOUT_START_DATE_FILTER")
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|e| invalid("JOBSCOUT_START_DATE_FILTER", e.to_string()))
        })
        .transpose()?;
    let alert_webhook_url = optional("JOBSCOUT_ALERT_WEBHOOK_URL");

    if sweep_interval_secs == 0 {
        return Err(invalid(
            "JOBSCOUT_SWEEP_INTERVAL_SECS",
            "must be at least 1".to_string(),
        ));
    }
    if resume_check_secs == 0 {
        return Err(invalid(
            "JOBSCOUT_RESUME_CHECK_SECS",
            "must be at least 1".to_string(),
        ));
    }
    if jitter_min_ms > jitter_max_ms {
        return Err(invalid(
            "JOBSCOUT_JITTER_MIN_MS",
            format!("{jitter_min_ms} exceeds JOBSCOUT_JITTER_MAX_MS ({jitter_max_ms})"),
        ));
    }
    if cooldown_min_secs > cooldown_max_secs {
        return Err(invalid(
            "JOBSCOUT_COOLDOWN_MIN_SECS",
            format!(
                "{cooldown_min_secs} exceeds JOBSCOUT_COOLDOWN_MAX_SECS ({cooldown_max_secs})"
            ),
        ));
    }
    if request_log_capacity == 0 {
        return Err(invalid(
            "JOBSCOUT_REQUEST_LOG_CAPACITY",
            "must be at least 1".to_string(),
        ));
    }
    if health_window == 0 {
        return Err(invalid(
            "JOBSCOUT_HEALTH_WINDOW",
            "must be at least 1".to_string(),
        ));
    }

    Ok(AppConfig {
        env,
        log_level,
        bind_addr,
        data_dir,
        locations_path,
        api_url,
        auth_token,
        credential_file,
        admin_tokens,
        sweep_interval_secs,
        jitter_min_ms,
        jitter_max_ms,
        cooldown_min_secs,
        cooldown_max_secs,
        resume_check_secs,
        suspend_on_missing_credential,
        request_log_capacity,
        health_window,
        request_timeout_secs,
        connect_timeout_secs,
        user_agent,
        search_radius_km,
        page_size,
        locale,
        country,
        start_date_filter,
        alert_webhook_url,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "JOBSCOUT_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
