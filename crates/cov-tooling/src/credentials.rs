//! Credential provider for the Tooling API.
//!
//! Session acquisition itself (OAuth, JWT) happens elsewhere; this module
//! only picks up an existing session. Debug output redacts the token.

use tracing::debug;

use crate::error::{Error, ErrorKind, Result};
use crate::DEFAULT_API_VERSION;

/// Trait for Salesforce credentials.
pub trait Credentials: Send + Sync {
    /// Get the Salesforce instance URL.
    fn instance_url(&self) -> &str;

    /// Get the access token.
    fn access_token(&self) -> &str;

    /// Get the API version (e.g., "62.0").
    fn api_version(&self) -> &str;

    /// Returns true if the credentials appear to be valid (non-empty).
    fn is_valid(&self) -> bool {
        !self.instance_url().is_empty() && !self.access_token().is_empty()
    }
}

/// Instance URL, access token and API version of an existing session.
#[derive(Clone)]
pub struct SalesforceCredentials {
    instance_url: String,
    access_token: String,
    api_version: String,
}

impl std::fmt::Debug for SalesforceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceCredentials")
            .field("instance_url", &self.instance_url)
            .field("access_token", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl SalesforceCredentials {
    /// Create new credentials with the given values.
    pub fn new(
        instance_url: impl Into<String>,
        access_token: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            instance_url: instance_url.into(),
            access_token: access_token.into(),
            api_version: api_version.into(),
        }
    }

    /// Load credentials from environment variables.
    ///
    /// Required environment variables:
    /// - `SF_INSTANCE_URL` or `SALESFORCE_INSTANCE_URL`
    /// - `SF_ACCESS_TOKEN` or `SALESFORCE_ACCESS_TOKEN`
    ///
    /// Optional:
    /// - `SF_API_VERSION` or `SALESFORCE_API_VERSION` (default: "62.0")
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load credentials through an arbitrary variable lookup.
    ///
    /// Same variable names and precedence as [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let either = |primary: &str, fallback: &str| {
            lookup(primary)
                .filter(|v| !v.is_empty())
                .or_else(|| lookup(fallback).filter(|v| !v.is_empty()))
        };

        let instance_url = either("SF_INSTANCE_URL", "SALESFORCE_INSTANCE_URL")
            .ok_or_else(|| Error::new(ErrorKind::EnvVar("SF_INSTANCE_URL".to_string())))?;

        let access_token = either("SF_ACCESS_TOKEN", "SALESFORCE_ACCESS_TOKEN")
            .ok_or_else(|| Error::new(ErrorKind::EnvVar("SF_ACCESS_TOKEN".to_string())))?;

        let api_version = either("SF_API_VERSION", "SALESFORCE_API_VERSION")
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        Ok(Self::new(instance_url, access_token, api_version))
    }

    /// Load credentials from SFDX CLI using an org alias or username.
    ///
    /// Requires the `sf` CLI to be installed and the org to be authenticated.
    pub async fn from_sfdx_alias(alias_or_username: &str) -> Result<Self> {
        use tokio::process::Command;

        debug!(org = alias_or_username, "Reading session from sf CLI");

        let output = Command::new("sf")
            .args([
                "org",
                "display",
                "--target-org",
                alias_or_username,
                "--json",
            ])
            .output()
            .await
            .map_err(|e| Error::new(ErrorKind::SfdxCli(format!("Failed to run sf CLI: {}", e))))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::new(ErrorKind::SfdxCli(format!(
                "sf org display failed: {}",
                stderr.trim()
            ))));
        }

        Self::from_sfdx_json(&output.stdout)
    }

    /// Parse the JSON printed by `sf org display --json`.
    pub fn from_sfdx_json(stdout: &[u8]) -> Result<Self> {
        let json: serde_json::Value = serde_json::from_slice(stdout)?;

        let result = json.get("result").ok_or_else(|| {
            Error::new(ErrorKind::SfdxCli("Missing 'result' in output".to_string()))
        })?;

        let field = |name: &str| result.get(name).and_then(|v| v.as_str());

        let instance_url = field("instanceUrl")
            .ok_or_else(|| Error::new(ErrorKind::SfdxCli("Missing instanceUrl".to_string())))?;
        let access_token = field("accessToken")
            .ok_or_else(|| Error::new(ErrorKind::SfdxCli("Missing accessToken".to_string())))?;
        let api_version = field("apiVersion").unwrap_or(DEFAULT_API_VERSION);

        Ok(Self::new(instance_url, access_token, api_version))
    }

    /// Override the API version.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }
}

impl Credentials for SalesforceCredentials {
    fn instance_url(&self) -> &str {
        &self.instance_url
    }

    fn access_token(&self) -> &str {
        &self.access_token
    }

    fn api_version(&self) -> &str {
        &self.api_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_credentials_new() {
        let creds = SalesforceCredentials::new("https://na1.salesforce.com", "token123", "62.0");

        assert_eq!(creds.instance_url(), "https://na1.salesforce.com");
        assert_eq!(creds.access_token(), "token123");
        assert_eq!(creds.api_version(), "62.0");
        assert!(creds.is_valid());
    }

    #[test]
    fn test_invalid_credentials() {
        let creds = SalesforceCredentials::new("", "", "62.0");
        assert!(!creds.is_valid());
    }

    #[test]
    fn test_debug_redacts_token() {
        let creds = SalesforceCredentials::new(
            "https://na1.salesforce.com",
            "00Dxx0000000000!AQ4AQsecret",
            "62.0",
        );
        let debug = format!("{:?}", creds);

        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_from_lookup_primary_names() {
        let creds = SalesforceCredentials::from_lookup(lookup(&[
            ("SF_INSTANCE_URL", "https://na1.salesforce.com"),
            ("SF_ACCESS_TOKEN", "token"),
            ("SF_API_VERSION", "60.0"),
        ]))
        .unwrap();

        assert_eq!(creds.instance_url(), "https://na1.salesforce.com");
        assert_eq!(creds.api_version(), "60.0");
    }

    #[test]
    fn test_from_lookup_fallback_names_and_default_version() {
        let creds = SalesforceCredentials::from_lookup(lookup(&[
            ("SALESFORCE_INSTANCE_URL", "https://na2.salesforce.com"),
            ("SALESFORCE_ACCESS_TOKEN", "token"),
        ]))
        .unwrap();

        assert_eq!(creds.instance_url(), "https://na2.salesforce.com");
        assert_eq!(creds.api_version(), DEFAULT_API_VERSION);
    }

    #[test]
    fn test_from_lookup_missing_token() {
        let err = SalesforceCredentials::from_lookup(lookup(&[(
            "SF_INSTANCE_URL",
            "https://na1.salesforce.com",
        )]))
        .unwrap_err();

        assert!(matches!(err.kind, ErrorKind::EnvVar(ref name) if name == "SF_ACCESS_TOKEN"));
    }

    #[test]
    fn test_from_lookup_ignores_empty_values() {
        let err = SalesforceCredentials::from_lookup(lookup(&[
            ("SF_INSTANCE_URL", ""),
            ("SF_ACCESS_TOKEN", "token"),
        ]))
        .unwrap_err();

        assert!(matches!(err.kind, ErrorKind::EnvVar(ref name) if name == "SF_INSTANCE_URL"));
    }

    #[test]
    fn test_from_sfdx_json() {
        let stdout = br#"{
            "status": 0,
            "result": {
                "id": "00Dxx0000000000EAA",
                "apiVersion": "61.0",
                "accessToken": "00Dxx!token",
                "instanceUrl": "https://dev-ed.my.salesforce.com",
                "username": "dev@example.com"
            }
        }"#;

        let creds = SalesforceCredentials::from_sfdx_json(stdout).unwrap();
        assert_eq!(creds.instance_url(), "https://dev-ed.my.salesforce.com");
        assert_eq!(creds.access_token(), "00Dxx!token");
        assert_eq!(creds.api_version(), "61.0");
    }

    #[test]
    fn test_from_sfdx_json_missing_result() {
        let err = SalesforceCredentials::from_sfdx_json(br#"{"status": 1}"#).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::SfdxCli(_)));

        let err = SalesforceCredentials::from_sfdx_json(
            br#"{"result": {"instanceUrl": "https://x.my.salesforce.com"}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("accessToken"));
    }
}
