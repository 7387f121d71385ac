use std::env;
use std::time::Duration;

use rolebind_core::{AppError, AppResult};
use rolebind_infrastructure::HttpRbacClientConfig;
use url::Url;

const DEFAULT_API_URL: &str = "https://app.nobl9.com/api";
const DEFAULT_AUTH_URL: &str = "https://accounts.nobl9.com/oauth2/auseg9kiegWKEtJZC416/v1/token";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Remote service settings read from the environment.
#[derive(Debug, Clone)]
pub struct RbacConfig {
    pub client: HttpRbacClientConfig,
    pub http_timeout: Duration,
}

impl RbacConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let client_id = required_env(&lookup, "RBAC_CLIENT_ID")?;
        let client_secret = required_env(&lookup, "RBAC_CLIENT_SECRET")?;
        let api_url = parse_url_env(&lookup, "RBAC_API_URL", DEFAULT_API_URL)?;
        let auth_url = parse_url_env(&lookup, "RBAC_AUTH_URL", DEFAULT_AUTH_URL)?;
        let organization = optional_env(&lookup, "RBAC_ORGANIZATION");
        let http_timeout_secs = match optional_env(&lookup, "RBAC_HTTP_TIMEOUT_SECS") {
            Some(value) => value.parse::<u64>().map_err(|error| {
                AppError::Configuration(format!(
                    "invalid RBAC_HTTP_TIMEOUT_SECS value '{value}': {error}"
                ))
            })?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        if http_timeout_secs == 0 {
            return Err(AppError::Configuration(
                "RBAC_HTTP_TIMEOUT_SECS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            client: HttpRbacClientConfig {
                api_url,
                auth_url,
                client_id,
                client_secret,
                organization,
            },
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }
}

fn optional_env(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn required_env(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> AppResult<String> {
    optional_env(lookup, name).ok_or_else(|| {
        AppError::Configuration(format!("{name} environment variable is required"))
    })
}

fn parse_url_env(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: &str,
) -> AppResult<Url> {
    let value = optional_env(lookup, name).unwrap_or_else(|| default.to_owned());
    Url::parse(value.as_str())
        .map_err(|error| AppError::Configuration(format!("invalid {name} value '{value}': {error}")))
}
