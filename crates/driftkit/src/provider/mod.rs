//! Provider abstraction for reading live instance state.
//!
//! The [`Provider`] trait defines the single call the engine needs from the
//! cloud, allowing for different implementations:
//! - the real `aws` CLI ([`AwsCliProvider`])
//! - a saved describe-instances document ([`FileProvider`])
//! - scripted responses for tests ([`MemoryProvider`])

pub mod aws_cli;
pub mod describe;
pub mod file;
pub mod memory;

pub use aws_cli::{AwsCliOptions, AwsCliProvider};
pub use describe::DescribeInstancesOutput;
pub use file::FileProvider;
pub use memory::MemoryProvider;

use crate::error::Result;
use async_trait::async_trait;

/// Source of the raw live description of EC2 instances.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// Describe the target instance(s).
    ///
    /// Transport and service failures are reported as
    /// [`Error::Upstream`](crate::Error::Upstream). An empty answer is not an
    /// error here; the normalizer decides what zero instances mean.
    async fn describe_instances(&self) -> Result<DescribeInstancesOutput>;
}
