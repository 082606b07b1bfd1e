//! Live provider backed by the `aws` command-line client.

use crate::error::{Error, Result};
use crate::provider::{DescribeInstancesOutput, Provider};
use async_trait::async_trait;
use tokio::process::Command;

/// Options passed through to `aws ec2 describe-instances`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwsCliOptions {
    /// `--region`
    pub region: Option<String>,
    /// `--profile`
    pub profile: Option<String>,
    /// `--endpoint-url`, e.g. a LocalStack gateway
    pub endpoint_url: Option<String>,
    /// `--instance-ids`; without it every instance visible to the caller is described
    pub instance_id: Option<String>,
}

/// Provider that runs `aws ec2 describe-instances --output json`.
#[derive(Debug, Clone)]
pub struct AwsCliProvider {
    /// Path or name of the aws executable
    aws_path: String,
    options: AwsCliOptions,
}

impl AwsCliProvider {
    /// Provider using `aws` from `PATH`.
    pub fn new(options: AwsCliOptions) -> Self {
        Self::with_executable("aws", options)
    }

    /// Provider using a specific aws executable.
    pub fn with_executable(aws_path: impl Into<String>, options: AwsCliOptions) -> Self {
        Self {
            aws_path: aws_path.into(),
            options,
        }
    }

    /// Arguments for the describe call, without the executable.
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["ec2", "describe-instances", "--output", "json"]
            .iter()
            .map(ToString::to_string)
            .collect();

        let flags = [
            ("--region", &self.options.region),
            ("--profile", &self.options.profile),
            ("--endpoint-url", &self.options.endpoint_url),
            ("--instance-ids", &self.options.instance_id),
        ];
        for (flag, value) in flags {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                args.push(flag.to_string());
                args.push(value.to_string());
            }
        }
        args
    }

    /// Run the aws command and return stdout on success.
    async fn run_aws_checked(&self) -> Result<String> {
        let output = Command::new(&self.aws_path)
            .args(self.args())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::upstream(format!("failed to execute {}: {e}", self.aws_path)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::upstream(format!(
                "aws ec2 describe-instances exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl Provider for AwsCliProvider {
    fn name(&self) -> &str {
        "aws-cli"
    }

    async fn describe_instances(&self) -> Result<DescribeInstancesOutput> {
        let stdout = self.run_aws_checked().await?;
        serde_json::from_str(&stdout)
            .map_err(|e| Error::upstream(format!("unexpected describe-instances output: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_without_options() {
        let provider = AwsCliProvider::new(AwsCliOptions::default());
        assert_eq!(
            provider.args(),
            vec!["ec2", "describe-instances", "--output", "json"]
        );
    }

    #[test]
    fn test_args_with_options() {
        let provider = AwsCliProvider::new(AwsCliOptions {
            region: Some("us-east-1".to_string()),
            profile: None,
            endpoint_url: Some("http://localhost:4566".to_string()),
            instance_id: Some("i-0abc".to_string()),
        });
        let args = provider.args();
        assert_eq!(
            &args[4..],
            &[
                "--region",
                "us-east-1",
                "--endpoint-url",
                "http://localhost:4566",
                "--instance-ids",
                "i-0abc"
            ]
        );
    }

    #[test]
    fn test_empty_option_is_skipped() {
        let provider = AwsCliProvider::new(AwsCliOptions {
            profile: Some(String::new()),
            ..Default::default()
        });
        assert!(!provider.args().contains(&"--profile".to_string()));
    }

    #[tokio::test]
    async fn test_missing_executable_is_upstream_error() {
        let provider = AwsCliProvider::with_executable(
            "/nonexistent/driftwatch-aws-cli",
            AwsCliOptions::default(),
        );
        let err = provider.describe_instances().await.unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("failed to execute"));
    }
}
