//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/report.toml
//!
//! Secrets can be kept out of the file and supplied through the environment:
//! FLEET_API_EMAIL, FLEET_API_PASSWORD, SMTP_USERNAME, SMTP_PASSWORD.

use crate::domain::report::ReportLayout;
use crate::io::fleet_api::Credentials;
use anyhow::{bail, Context};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config/report.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Name of the cookie carrying the session token
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
    /// Device groups the event report is scoped to
    #[serde(default)]
    pub group_ids: Vec<i64>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_session_cookie() -> String {
    "JSESSIONID".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub layout: ReportLayout,
    /// CSV attachment path
    #[serde(default = "default_output_path")]
    pub output_path: String,
    #[serde(default = "default_title")]
    pub title: String,
    /// Shown in the email footer
    #[serde(default = "default_organization")]
    pub organization: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            layout: ReportLayout::default(),
            output_path: default_output_path(),
            title: default_title(),
            organization: default_organization(),
        }
    }
}

fn default_timezone() -> String {
    "Australia/Melbourne".to_string()
}

fn default_output_path() -> String {
    "geofence_report.csv".to_string()
}

fn default_title() -> String {
    "Geofence Entry/Exit Report".to_string()
}

fn default_organization() -> String {
    "Fleet Management".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub from_address: String,
    #[serde(default)]
    pub from_name: Option<String>,
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default = "default_subject")]
    pub subject: String,
}

fn default_subject() -> String {
    "Daily Geofence Entry/Exit Report".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    /// Implicit TLS submission port
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_smtp_port() -> u16 {
    465
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub report: ReportConfig,
    pub mail: MailConfig,
    pub smtp: SmtpConfig,
}

/// Main configuration struct used throughout the application
#[derive(Clone)]
pub struct Config {
    api_base_url: String,
    api_email: String,
    api_password: String,
    api_session_cookie: String,
    api_group_ids: Vec<i64>,
    api_timeout_ms: u64,
    timezone: String,
    report_layout: ReportLayout,
    output_path: String,
    report_title: String,
    organization: String,
    mail_from_address: String,
    mail_from_name: Option<String>,
    mail_to: Vec<String>,
    mail_cc: Vec<String>,
    mail_subject: String,
    smtp_host: String,
    smtp_port: u16,
    smtp_username: String,
    smtp_password: String,
    smtp_timeout_ms: u64,
    config_file: String,
}

// Hand-written so passwords never reach the logs
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_base_url", &self.api_base_url)
            .field("api_email", &self.api_email)
            .field("api_group_ids", &self.api_group_ids)
            .field("timezone", &self.timezone)
            .field("report_layout", &self.report_layout)
            .field("output_path", &self.output_path)
            .field("mail_to", &self.mail_to)
            .field("mail_cc", &self.mail_cc)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("config_file", &self.config_file)
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8082".to_string(),
            api_email: String::new(),
            api_password: String::new(),
            api_session_cookie: default_session_cookie(),
            api_group_ids: Vec::new(),
            api_timeout_ms: default_timeout_ms(),
            timezone: default_timezone(),
            report_layout: ReportLayout::Summary,
            output_path: default_output_path(),
            report_title: default_title(),
            organization: default_organization(),
            mail_from_address: "reports@localhost".to_string(),
            mail_from_name: None,
            mail_to: Vec::new(),
            mail_cc: Vec::new(),
            mail_subject: default_subject(),
            smtp_host: "localhost".to_string(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            smtp_timeout_ms: default_timeout_ms(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Determine config file path from an explicit argument or environment
    pub fn resolve_config_path(arg: Option<&str>) -> String {
        if let Some(path) = arg {
            return path.to_string();
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        DEFAULT_CONFIG_PATH.to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
            .map(|mut config| {
                config.config_file = path.display().to_string();
                config
            })
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let toml_config: TomlConfig = toml::from_str(content)?;

        Ok(Self {
            api_base_url: toml_config.api.base_url.trim_end_matches('/').to_string(),
            api_email: toml_config.api.email,
            api_password: toml_config.api.password,
            api_session_cookie: toml_config.api.session_cookie,
            api_group_ids: toml_config.api.group_ids,
            api_timeout_ms: toml_config.api.timeout_ms,
            timezone: toml_config.report.timezone,
            report_layout: toml_config.report.layout,
            output_path: toml_config.report.output_path,
            report_title: toml_config.report.title,
            organization: toml_config.report.organization,
            mail_from_address: toml_config.mail.from_address,
            mail_from_name: toml_config.mail.from_name,
            mail_to: toml_config.mail.to,
            mail_cc: toml_config.mail.cc,
            mail_subject: toml_config.mail.subject,
            smtp_host: toml_config.smtp.host,
            smtp_port: toml_config.smtp.port,
            smtp_username: toml_config.smtp.username,
            smtp_password: toml_config.smtp.password,
            smtp_timeout_ms: toml_config.smtp.timeout_ms,
            config_file: "inline".to_string(),
        })
    }

    /// Load configuration for a run: file, then environment secrets, then validation
    pub fn load(arg: Option<&str>) -> anyhow::Result<Self> {
        let config_path = Self::resolve_config_path(arg);
        let mut config = Self::from_file(&config_path)?;
        config.apply_env_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Override secrets from the environment; empty values are ignored
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let targets: [(&str, &mut String); 4] = [
            ("FLEET_API_EMAIL", &mut self.api_email),
            ("FLEET_API_PASSWORD", &mut self.api_password),
            ("SMTP_USERNAME", &mut self.smtp_username),
            ("SMTP_PASSWORD", &mut self.smtp_password),
        ];

        for (key, slot) in targets {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *slot = value;
            }
        }
    }

    /// Reject configurations that cannot produce a report
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_base_url.is_empty() {
            bail!("api.base_url must not be empty");
        }
        if self.api_email.is_empty() || self.api_password.is_empty() {
            bail!("fleet API credentials missing (api.email/api.password or FLEET_API_EMAIL/FLEET_API_PASSWORD)");
        }
        if self.mail_to.is_empty() {
            bail!("mail.to must list at least one recipient");
        }
        if self.smtp_host.is_empty() {
            bail!("smtp.host must not be empty");
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials { email: self.api_email.clone(), password: self.api_password.clone() }
    }

    // Getters for all config fields
    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn api_session_cookie(&self) -> &str {
        &self.api_session_cookie
    }

    pub fn api_group_ids(&self) -> &[i64] {
        &self.api_group_ids
    }

    pub fn api_timeout_ms(&self) -> u64 {
        self.api_timeout_ms
    }

    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    pub fn report_layout(&self) -> ReportLayout {
        self.report_layout
    }

    pub fn output_path(&self) -> &str {
        &self.output_path
    }

    pub fn report_title(&self) -> &str {
        &self.report_title
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn mail_from_address(&self) -> &str {
        &self.mail_from_address
    }

    pub fn mail_from_name(&self) -> Option<&str> {
        self.mail_from_name.as_deref()
    }

    pub fn mail_to(&self) -> &[String] {
        &self.mail_to
    }

    pub fn mail_cc(&self) -> &[String] {
        &self.mail_cc
    }

    pub fn mail_subject(&self) -> &str {
        &self.mail_subject
    }

    pub fn smtp_host(&self) -> &str {
        &self.smtp_host
    }

    pub fn smtp_port(&self) -> u16 {
        self.smtp_port
    }

    pub fn smtp_username(&self) -> &str {
        &self.smtp_username
    }

    pub fn smtp_password(&self) -> &str {
        &self.smtp_password
    }

    pub fn smtp_timeout_ms(&self) -> u64 {
        self.smtp_timeout_ms
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to point the client at a local server
    pub fn with_api_base_url(mut self, url: &str) -> Self {
        self.api_base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Builder method for tests to set fleet API credentials
    pub fn with_credentials(mut self, email: &str, password: &str) -> Self {
        self.api_email = email.to_string();
        self.api_password = password.to_string();
        self
    }

    /// Builder method for tests to set the report layout
    pub fn with_report_layout(mut self, layout: ReportLayout) -> Self {
        self.report_layout = layout;
        self
    }

    /// Builder method for tests to set the CSV output path
    pub fn with_output_path(mut self, path: &str) -> Self {
        self.output_path = path.to_string();
        self
    }

    /// Builder method for tests to set the event group scope
    pub fn with_group_ids(mut self, group_ids: Vec<i64>) -> Self {
        self.api_group_ids = group_ids;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const MINIMAL: &str = r#"
[api]
base_url = "https://fleet.example.com/"
email = "ops@example.com"
password = "from-file"

[mail]
from_address = "reports@example.com"
to = ["dispatch@example.com"]

[smtp]
host = "smtp.example.com"
"#;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.timezone(), "Australia/Melbourne");
        assert_eq!(config.api_session_cookie(), "JSESSIONID");
        assert_eq!(config.report_layout(), ReportLayout::Summary);
        assert_eq!(config.output_path(), "geofence_report.csv");
        assert_eq!(config.smtp_port(), 465);
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config = Config::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.api_base_url(), "https://fleet.example.com");
        assert_eq!(config.api_timeout_ms(), 30_000);
        assert!(config.api_group_ids().is_empty());
        assert_eq!(config.report_title(), "Geofence Entry/Exit Report");
        assert_eq!(config.mail_subject(), "Daily Geofence Entry/Exit Report");
        assert!(config.mail_cc().is_empty());
        assert_eq!(config.mail_from_name(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_secrets() {
        let mut config = Config::from_toml_str(MINIMAL).unwrap();
        let env: HashMap<&str, &str> =
            HashMap::from([("FLEET_API_PASSWORD", "from-env"), ("SMTP_PASSWORD", "smtp-secret")]);

        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.credentials().password, "from-env");
        assert_eq!(config.credentials().email, "ops@example.com");
        assert_eq!(config.smtp_password(), "smtp-secret");
    }

    #[test]
    fn test_empty_env_value_is_ignored() {
        let mut config = Config::from_toml_str(MINIMAL).unwrap();
        config.apply_env_overrides(|_| Some(String::new()));
        assert_eq!(config.credentials().password, "from-file");
    }

    #[test]
    fn test_validate_requires_credentials() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("credentials"));
    }

    #[test]
    fn test_validate_requires_recipient() {
        let config = Config::default().with_credentials("a@b.c", "pw");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("mail.to"));
    }

    #[test]
    fn test_debug_hides_passwords() {
        let config = Config::from_toml_str(MINIMAL).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("from-file"));
        assert!(debug.contains("fleet.example.com"));
    }

    #[test]
    fn test_resolve_config_path_from_arg() {
        assert_eq!(Config::resolve_config_path(Some("config/prod.toml")), "config/prod.toml");
    }
}
