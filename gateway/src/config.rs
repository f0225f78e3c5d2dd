use crate::errors::{Error, Result};
use std::env;

/// Connection settings for the CMSV6 vendor platform.
///
/// Base URL and service credentials are required for any vendor call;
/// the stream host/port pair only matters for HLS URL synthesis.
#[derive(Debug, Clone)]
pub struct VendorConfig {
    pub base_url: String,
    pub account: String,
    pub password: String,
    pub stream_scheme: String,
    pub stream_host: String,
    pub stream_port: u16,
    pub timeout_secs: u64,
}

impl VendorConfig {
    pub fn from_env() -> Result<Self> {
        let base_url = env::var("VENDOR_BASE_URL")
            .map_err(|_| Error::Configuration("VENDOR_BASE_URL is not set".to_string()))?;
        let account = env::var("VENDOR_ACCOUNT")
            .map_err(|_| Error::Configuration("VENDOR_ACCOUNT is not set".to_string()))?;
        let password = env::var("VENDOR_PASSWORD")
            .map_err(|_| Error::Configuration("VENDOR_PASSWORD is not set".to_string()))?;
        let stream_scheme =
            env::var("VENDOR_STREAM_SCHEME").unwrap_or_else(|_| "http".to_string());
        let stream_host = env::var("VENDOR_STREAM_HOST").unwrap_or_else(|_| "localhost".to_string());
        let stream_port: u16 = env::var("VENDOR_STREAM_PORT")
            .unwrap_or_else(|_| "6604".to_string())
            .parse()
            .unwrap_or(6604);
        let timeout_secs: u64 = env::var("VENDOR_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let cfg = Self {
            base_url,
            account,
            password,
            stream_scheme,
            stream_host,
            stream_port,
            timeout_secs,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(Error::Configuration("vendor base URL is empty".to_string()));
        }
        if self.account.is_empty() || self.password.is_empty() {
            return Err(Error::Configuration(
                "vendor service credentials are empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Full URL for a vendor action, e.g. `StandardApiAction_login.action`.
    pub fn action_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> VendorConfig {
        VendorConfig {
            base_url: "http://vendor.example:8080/StandardApiAction".to_string(),
            account: "fleet".to_string(),
            password: "secret".to_string(),
            stream_scheme: "http".to_string(),
            stream_host: "vendor.example".to_string(),
            stream_port: 6604,
            timeout_secs: 10,
        }
    }

    #[test]
    fn action_url_strips_trailing_slash() {
        let mut cfg = config();
        cfg.base_url = "http://vendor.example:8080/".to_string();
        assert_eq!(
            cfg.action_url("StandardApiAction_login.action"),
            "http://vendor.example:8080/StandardApiAction_login.action"
        );
    }

    #[test]
    fn empty_credentials_rejected() {
        let mut cfg = config();
        cfg.password = String::new();
        assert!(cfg.validate().is_err());
    }
}
