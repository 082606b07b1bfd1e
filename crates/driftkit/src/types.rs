//! Core types for drift detection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Resource type of an EC2 instance in Terraform.
pub const AWS_INSTANCE: &str = "aws_instance";

/// Message used when a comparison found nothing.
pub const NO_DRIFT: &str = "No drift detected between AWS instance and Terraform state.";

/// A block device attached to the live instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDevice {
    /// Device name (e.g., "/dev/xvda")
    pub device_name: String,
    /// Backing EBS volume id
    pub volume_id: String,
}

/// A security group attached to the live instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    /// Group id (e.g., "sg-0123")
    pub group_id: String,
}

/// A network interface of the live instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    /// Primary private address
    pub private_ip: String,
    /// Associated public address, empty when there is none
    pub public_ip: String,
}

/// Canonical view of a live EC2 instance.
///
/// Optional scalars use the empty string for "absent". Tags are kept sorted
/// so every rendering of the instance is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalInstance {
    /// Instance id, never empty once normalized
    pub id: String,
    pub instance_type: String,
    pub ami: String,
    pub key_name: String,
    pub private_ip: String,
    pub public_ip: String,
    pub private_dns_name: String,
    /// Launch timestamp, RFC 3339 when the provider value was parseable
    pub launch_time: String,
    pub tags: BTreeMap<String, String>,
    pub block_devices: Vec<BlockDevice>,
    pub security_groups: Vec<SecurityGroup>,
    pub network_interfaces: Vec<NetworkInterface>,
}

impl CanonicalInstance {
    /// Create an instance with only an id set.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Add a tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Attributes declared for the instance in a Terraform config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredInstance {
    pub ami: String,
    pub instance_type: String,
    pub tags: BTreeMap<String, String>,
}

impl DeclaredInstance {
    /// True when nothing was declared at all.
    pub fn is_empty(&self) -> bool {
        self.ami.is_empty() && self.instance_type.is_empty() && self.tags.is_empty()
    }
}

/// One detected difference, as a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriftFinding(String);

impl DriftFinding {
    /// Create a finding from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// The "no drift" sentinel.
    pub fn no_drift() -> Self {
        Self(NO_DRIFT.to_string())
    }

    /// Whether this is the "no drift" sentinel.
    pub fn is_no_drift(&self) -> bool {
        self.0 == NO_DRIFT
    }

    /// The finding message.
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DriftFinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which declaration a report was computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriftSource {
    /// The Terraform state file
    Snapshot,
    /// The Terraform config file
    Config,
}

impl std::fmt::Display for DriftSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriftSource::Snapshot => write!(f, "Terraform state"),
            DriftSource::Config => write!(f, "Terraform config"),
        }
    }
}

/// Findings of one comparison. Never empty: a clean comparison holds the
/// "no drift" sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftReport {
    pub source: DriftSource,
    findings: Vec<DriftFinding>,
}

impl DriftReport {
    /// Build a report, substituting the sentinel for an empty list.
    pub fn new(source: DriftSource, mut findings: Vec<DriftFinding>) -> Self {
        if findings.is_empty() {
            findings.push(DriftFinding::no_drift());
        }
        Self { source, findings }
    }

    /// All findings (or the sentinel).
    pub fn findings(&self) -> &[DriftFinding] {
        &self.findings
    }

    /// Check if there is any drift.
    pub fn has_drift(&self) -> bool {
        !(self.findings.len() == 1 && self.findings[0].is_no_drift())
    }

    /// Number of actual drift findings (zero for a clean report).
    pub fn drift_count(&self) -> usize {
        if self.has_drift() { self.findings.len() } else { 0 }
    }

    /// Finding messages as plain strings.
    pub fn messages(&self) -> Vec<&str> {
        self.findings.iter().map(DriftFinding::message).collect()
    }
}

/// Outcome of one fetch-parse-compare cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    /// Live instance that was checked
    pub instance_id: String,
    /// When the cycle finished
    pub checked_at: DateTime<Utc>,
    /// Comparison against the state file
    pub snapshot: DriftReport,
    /// Comparison against the config file
    pub config: DriftReport,
}

impl CycleReport {
    /// Check if either comparison found drift.
    pub fn has_drift(&self) -> bool {
        self.snapshot.has_drift() || self.config.has_drift()
    }

    /// Both reports, state first.
    pub fn reports(&self) -> [&DriftReport; 2] {
        [&self.snapshot, &self.config]
    }
}

/// Configuration for retry logic around the live fetch.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (1 means no retry)
    pub max_attempts: u32,
    /// Delay between attempts
    pub base_delay: Duration,
    /// Multiplier applied per attempt (1.0 keeps the delay fixed)
    pub backoff_factor: f64,
    /// Maximum delay between attempts
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
            backoff_factor: 1.0,
            max_delay: Duration::from_secs(300),
        }
    }
}

impl RetryConfig {
    /// Fixed-delay retry with the given attempt count.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            backoff_factor: 1.0,
            max_delay: delay.max(Duration::from_secs(300)),
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Create a config that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}
