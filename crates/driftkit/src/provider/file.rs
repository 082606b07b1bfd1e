//! Offline provider reading a saved describe-instances document.

use crate::error::{Error, Result};
use crate::provider::{DescribeInstancesOutput, Provider};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Provider that reads `aws ec2 describe-instances --output json` output from disk.
///
/// The file is re-read on every call, so edits show up in the next cycle.
#[derive(Debug, Clone)]
pub struct FileProvider {
    path: PathBuf,
}

impl FileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Provider for FileProvider {
    fn name(&self) -> &str {
        "file"
    }

    async fn describe_instances(&self) -> Result<DescribeInstancesOutput> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::upstream(format!("failed to read {}: {e}", self.path.display()))
        })?;
        // Parse failures are not retryable.
        serde_json::from_str(&content).map_err(|e| Error::MalformedInstance {
            reason: format!("failed to parse {}: {e}", self.path.display()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_reads_saved_output() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"Reservations":[{{"Instances":[{{"InstanceId":"i-1","InstanceType":"t3.small"}}]}}]}}"#
        )
        .unwrap();

        let provider = FileProvider::new(file.path());
        let output = provider.describe_instances().await.unwrap();
        let instance = output.first_instance().unwrap();
        assert_eq!(instance.instance_type.as_deref(), Some("t3.small"));
    }

    #[tokio::test]
    async fn test_missing_file_is_upstream_error() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileProvider::new(dir.path().join("missing.json"));
        let err = provider.describe_instances().await.unwrap_err();
        assert!(matches!(err, Error::Upstream { .. }));
    }

    #[tokio::test]
    async fn test_unparseable_file_is_not_retryable() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "Reservations: []").unwrap();

        let provider = FileProvider::new(file.path());
        let err = provider.describe_instances().await.unwrap_err();
        assert!(matches!(err, Error::MalformedInstance { .. }));
        assert!(!err.is_retryable());
    }
}
