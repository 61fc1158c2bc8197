use crate::iam::{SYSTEM_ID_CMDB, SYSTEM_NAME_CMDB};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings of the authorizer and its authority client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// When false every request is authorized without asking the authority.
    pub enabled: bool,
    pub system_id: String,
    pub system_name: String,
    pub app_code: String,
    #[serde(skip_serializing)]
    pub app_secret: String,
    /// Base url of the policy authority.
    pub iam_address: String,
    /// Base url of the permission application service.
    pub apply_address: String,
    pub request_timeout_secs: u64,
    pub max_concurrency: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            system_id: SYSTEM_ID_CMDB.to_string(),
            system_name: SYSTEM_NAME_CMDB.to_string(),
            app_code: SYSTEM_ID_CMDB.to_string(),
            app_secret: String::new(),
            iam_address: "http://127.0.0.1:5001".to_string(),
            apply_address: "http://127.0.0.1:5002".to_string(),
            request_timeout_secs: 10,
            max_concurrency: 8,
        }
    }
}

impl AuthConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AuthConfig =
            serde_json::from_str(r#"{"enabled": false, "iam_address": "http://iam:8080"}"#)
                .unwrap();
        assert!(!config.enabled);
        assert_eq!(config.iam_address, "http://iam:8080");
        assert_eq!(config.system_id, "bk_cmdb");
        assert_eq!(config.max_concurrency(), 8);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_secret_is_not_serialized() {
        let config = AuthConfig {
            app_secret: "s3cr3t".into(),
            ..Default::default()
        };
        let rendered = serde_json::to_string(&config).unwrap();
        assert!(!rendered.contains("s3cr3t"));
    }
}
