//! Layered settings: defaults, then the TOML settings file, then flags and
//! environment variables.

use anyhow::{Context, Result, bail};
use driftkit::provider::AwsCliOptions;
use driftkit::{AWS_INSTANCE, ReconcileOptions, RetryConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::cli::SettingsArgs;
use crate::paths::{self, ConfigOrigin};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub tfstate_path: String,
    pub maintf_path: String,
    pub resource_type: String,
    pub check_interval_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub comparison_timeout_seconds: u64,
    pub log_level: String,
    pub aws: AwsSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AwsSettings {
    pub region: Option<String>,
    pub profile: Option<String>,
    pub localstack_url: Option<String>,
    pub instance_id: Option<String>,
    /// Saved describe-instances output used instead of the aws CLI
    pub describe_file: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tfstate_path: "terraform.tfstate".to_string(),
            maintf_path: "main.tf".to_string(),
            resource_type: AWS_INSTANCE.to_string(),
            check_interval_seconds: 300,
            max_retries: 3,
            retry_delay_seconds: 5,
            comparison_timeout_seconds: 30,
            log_level: "info".to_string(),
            aws: AwsSettings::default(),
        }
    }
}

impl Default for AwsSettings {
    fn default() -> Self {
        Self {
            region: Some("us-east-1".to_string()),
            profile: None,
            localstack_url: None,
            instance_id: None,
            describe_file: None,
        }
    }
}

impl Settings {
    /// Resolve the settings file and load it, applying `overrides` on top.
    pub fn resolve(config_flag: Option<&Path>, overrides: &SettingsArgs) -> Result<Self> {
        let (path, origin) = paths::config_file(config_flag)?;
        let mut settings = Self::load(&path, origin)?;
        settings.apply(overrides);
        Ok(settings)
    }

    /// Load a settings file.
    ///
    /// A missing file at the default location yields defaults. A file that
    /// was asked for explicitly must exist.
    pub fn load(path: &Path, origin: ConfigOrigin) -> Result<Self> {
        if !path.exists() && origin == ConfigOrigin::Default {
            log::debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read settings file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid settings file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML")
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize settings")
    }

    /// Overlay values given as flags or environment variables.
    pub fn apply(&mut self, args: &SettingsArgs) {
        fn set<T: Clone>(target: &mut T, value: Option<&T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }
        fn set_opt(target: &mut Option<String>, value: Option<&String>) {
            if let Some(value) = value {
                *target = Some(value.clone());
            }
        }

        set(&mut self.tfstate_path, args.tfstate_path.as_ref());
        set(&mut self.maintf_path, args.maintf_path.as_ref());
        set(&mut self.resource_type, args.resource_type.as_ref());
        set(&mut self.check_interval_seconds, args.check_interval_seconds.as_ref());
        set(&mut self.max_retries, args.max_retries.as_ref());
        set(&mut self.retry_delay_seconds, args.retry_delay_seconds.as_ref());
        set(
            &mut self.comparison_timeout_seconds,
            args.comparison_timeout_seconds.as_ref(),
        );
        set(&mut self.log_level, args.log_level.as_ref());
        set_opt(&mut self.aws.region, args.region.as_ref());
        set_opt(&mut self.aws.profile, args.profile.as_ref());
        set_opt(&mut self.aws.localstack_url, args.localstack_url.as_ref());
        set_opt(&mut self.aws.instance_id, args.instance_id.as_ref());
        set_opt(&mut self.aws.describe_file, args.describe_file.as_ref());
    }

    /// Check the settings are usable.
    pub fn validate(&self) -> Result<()> {
        if self.tfstate_path.trim().is_empty() {
            bail!("invalid tfstate_path: must not be empty");
        }
        if self.maintf_path.trim().is_empty() {
            bail!("invalid maintf_path: must not be empty");
        }
        if self.resource_type.trim().is_empty() {
            bail!("invalid resource_type: must not be empty");
        }
        if self.check_interval_seconds == 0 {
            bail!("invalid check_interval_seconds: must be positive");
        }
        if self.max_retries == 0 {
            bail!("invalid max_retries: at least one attempt is required");
        }
        if self.retry_delay_seconds == 0 {
            bail!("invalid retry_delay_seconds: must be positive");
        }
        if self.comparison_timeout_seconds == 0 {
            bail!("invalid comparison_timeout_seconds: must be positive");
        }
        self.log_filter()?;
        Ok(())
    }

    pub fn log_filter(&self) -> Result<log::LevelFilter> {
        log::LevelFilter::from_str(self.log_level.trim())
            .map_err(|_| anyhow::anyhow!("invalid log_level: '{}'", self.log_level))
    }

    pub fn tfstate_path(&self) -> PathBuf {
        paths::expand(&self.tfstate_path)
    }

    pub fn maintf_path(&self) -> PathBuf {
        paths::expand(&self.maintf_path)
    }

    pub fn describe_file(&self) -> Option<PathBuf> {
        self.aws.describe_file.as_deref().map(paths::expand)
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            resource_type: self.resource_type.clone(),
            instance_id: self.aws.instance_id.clone(),
            interval: Duration::from_secs(self.check_interval_seconds),
            retry: RetryConfig::fixed(
                self.max_retries,
                Duration::from_secs(self.retry_delay_seconds),
            ),
            comparison_timeout: Duration::from_secs(self.comparison_timeout_seconds),
        }
    }

    pub fn aws_options(&self) -> AwsCliOptions {
        AwsCliOptions {
            region: self.aws.region.clone(),
            profile: self.aws.profile.clone(),
            endpoint_url: self.aws.localstack_url.clone(),
            instance_id: self.aws.instance_id.clone(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.tfstate_path, "terraform.tfstate");
        assert_eq!(settings.maintf_path, "main.tf");
        assert_eq!(settings.aws.region.as_deref(), Some("us-east-1"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml(
            r#"
tfstate_path = "infra/prod.tfstate"
check_interval_seconds = 60

[aws]
instance_id = "i-0abc"
localstack_url = "http://localhost:4566"
"#,
        )
        .unwrap();

        assert_eq!(settings.tfstate_path, "infra/prod.tfstate");
        assert_eq!(settings.check_interval_seconds, 60);
        assert_eq!(settings.maintf_path, "main.tf");
        assert_eq!(settings.max_retries, 3);
        assert_eq!(settings.aws.instance_id.as_deref(), Some("i-0abc"));
        assert_eq!(settings.aws.region.as_deref(), Some("us-east-1"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Settings::from_toml("check_interval_minutes = 5").is_err());
    }

    #[test]
    fn test_overrides_win() {
        let mut settings = Settings::from_toml("max_retries = 5\nlog_level = \"debug\"").unwrap();
        settings.apply(&SettingsArgs {
            max_retries: Some(1),
            region: Some("eu-west-1".to_string()),
            ..Default::default()
        });
        assert_eq!(settings.max_retries, 1);
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.aws.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn test_validation_failures() {
        let cases: [(fn(&mut Settings), &str); 6] = [
            (|s| s.tfstate_path = String::new(), "tfstate_path"),
            (|s| s.maintf_path = "  ".to_string(), "maintf_path"),
            (|s| s.check_interval_seconds = 0, "check_interval_seconds"),
            (|s| s.max_retries = 0, "max_retries"),
            (|s| s.comparison_timeout_seconds = 0, "comparison_timeout_seconds"),
            (|s| s.log_level = "loud".to_string(), "log_level"),
        ];
        for (mutate, field) in cases {
            let mut settings = Settings::default();
            mutate(&mut settings);
            let err = settings.validate().unwrap_err().to_string();
            assert!(err.contains(field), "{err} should mention {field}");
        }
    }

    #[test]
    fn test_missing_default_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings =
            Settings::load(&dir.path().join("config.toml"), ConfigOrigin::Default).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(Settings::load(&dir.path().join("config.toml"), ConfigOrigin::Flag).is_err());
    }

    #[test]
    fn test_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "maintf_path = \"infra/main.tf\"\n").unwrap();
        let settings = Settings::load(&path, ConfigOrigin::Env).unwrap();
        assert_eq!(settings.maintf_path, "infra/main.tf");
    }

    #[test]
    fn test_toml_roundtrip_of_defaults() {
        let settings = Settings::default();
        let parsed = Settings::from_toml(&settings.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_reconcile_options() {
        let options = Settings::default().reconcile_options();
        assert_eq!(options.interval, Duration::from_secs(300));
        assert_eq!(options.retry.max_attempts, 3);
        assert_eq!(options.retry.delay_for_attempt(1), Duration::from_secs(5));
        assert_eq!(options.comparison_timeout, Duration::from_secs(30));
        assert_eq!(options.resource_type, "aws_instance");
    }

    #[test]
    fn test_aws_options_map_localstack() {
        let mut settings = Settings::default();
        settings.aws.localstack_url = Some("http://localhost:4566".to_string());
        assert_eq!(
            settings.aws_options().endpoint_url.as_deref(),
            Some("http://localhost:4566")
        );
    }
}
