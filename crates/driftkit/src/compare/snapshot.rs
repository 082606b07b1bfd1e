//! Comparison against the Terraform state.
//!
//! Each [`CheckGroup`] runs as its own task over shared read-only inputs and
//! sends its findings to one bounded channel. The fan-in loop collects them
//! until every group is done or the cycle is cancelled. Findings are
//! reported in group order, so the output does not depend on scheduling.

use crate::cancel::CancelToken;
use crate::compare::{format_list, format_map};
use crate::error::{Error, Result};
use crate::logger::Logger;
use crate::snapshot::{InstanceAttributes, TerraformState};
use crate::types::{AWS_INSTANCE, CanonicalInstance, DriftFinding, DriftReport, DriftSource};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Independent groups of attributes checked against the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CheckGroup {
    BasicFields,
    Tags,
    BlockDevices,
    SecurityGroups,
    NetworkInterfaces,
}

impl CheckGroup {
    /// All groups, in reporting order.
    pub const ALL: [CheckGroup; 5] = [
        CheckGroup::BasicFields,
        CheckGroup::Tags,
        CheckGroup::BlockDevices,
        CheckGroup::SecurityGroups,
        CheckGroup::NetworkInterfaces,
    ];

    /// Run this group's check.
    pub fn check(self, live: &CanonicalInstance, declared: &InstanceAttributes) -> Vec<DriftFinding> {
        match self {
            CheckGroup::BasicFields => compare_basic_fields(live, declared),
            CheckGroup::Tags => compare_tags(live, declared),
            CheckGroup::BlockDevices => compare_block_devices(live, declared),
            CheckGroup::SecurityGroups => compare_security_groups(live, declared),
            CheckGroup::NetworkInterfaces => compare_network_interfaces(live, declared),
        }
    }
}

impl std::fmt::Display for CheckGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CheckGroup::BasicFields => "basic fields",
            CheckGroup::Tags => "tags",
            CheckGroup::BlockDevices => "block devices",
            CheckGroup::SecurityGroups => "security groups",
            CheckGroup::NetworkInterfaces => "network interfaces",
        };
        f.write_str(name)
    }
}

/// Compares a live instance with the matching instance in Terraform state.
#[derive(Debug, Clone)]
pub struct SnapshotComparator {
    resource_type: String,
    logger: Logger,
}

impl SnapshotComparator {
    pub fn new(resource_type: impl Into<String>, logger: Logger) -> Self {
        Self {
            resource_type: resource_type.into(),
            logger: logger.scoped("driftkit::compare::snapshot"),
        }
    }

    /// Compare `live` with the first matching instance in `state`.
    ///
    /// Fails with [`Error::NoMatchingResource`] when the state has no
    /// instance of the resource type, and with [`Error::Cancelled`] when
    /// `cancel` fires before or during the fan-in.
    pub async fn compare(
        &self,
        live: Arc<CanonicalInstance>,
        state: &TerraformState,
        cancel: &CancelToken,
    ) -> Result<DriftReport> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let declared = state.find_instance(&self.resource_type).ok_or_else(|| {
            Error::NoMatchingResource {
                resource_type: self.resource_type.clone(),
                instance_id: live.id.clone(),
            }
        })?;
        let declared = Arc::new(declared.clone());

        self.logger.debug(format_args!(
            "Comparing {} with state instance {}",
            live.id, declared.id
        ));

        let (tx, mut rx) = mpsc::channel(CheckGroup::ALL.len());
        let mut tasks = JoinSet::new();

        for group in CheckGroup::ALL {
            let live = Arc::clone(&live);
            let declared = Arc::clone(&declared);
            let cancel = cancel.clone();
            let tx = tx.clone();
            tasks.spawn(async move {
                if cancel.is_cancelled() {
                    return;
                }
                let findings = group.check(&live, &declared);
                // A closed channel means the receiver gave up on this cycle
                let _ = tx.send((group, findings)).await;
            });
        }
        drop(tx);

        let mut collected = Vec::with_capacity(CheckGroup::ALL.len());
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    self.logger.info(format_args!("Comparison for {} cancelled", live.id));
                    return Err(Error::Cancelled);
                }
                received = rx.recv() => match received {
                    Some(entry) => collected.push(entry),
                    None => break,
                },
            }
        }

        while let Some(joined) = tasks.join_next().await {
            joined.map_err(|e| Error::TaskFailed {
                reason: e.to_string(),
            })?;
        }

        // Tasks that saw the cancel flag at entry sent nothing
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        collected.sort_by_key(|(group, _)| *group);
        let findings: Vec<DriftFinding> = collected
            .into_iter()
            .flat_map(|(_, findings)| findings)
            .collect();

        let report = DriftReport::new(DriftSource::Snapshot, findings);
        self.logger.info(format_args!(
            "State comparison for {} completed with {} finding(s)",
            live.id,
            report.drift_count()
        ));
        Ok(report)
    }
}

impl Default for SnapshotComparator {
    fn default() -> Self {
        Self::new(AWS_INSTANCE, Logger::default())
    }
}

fn scalar_drift(field: &str, live: &str, declared: &str) -> Option<DriftFinding> {
    (live != declared).then(|| {
        DriftFinding::new(format!(
            "{field} drift detected: AWS={live}, Terraform={declared}"
        ))
    })
}

fn compare_basic_fields(live: &CanonicalInstance, declared: &InstanceAttributes) -> Vec<DriftFinding> {
    [
        ("InstanceID", &live.id, &declared.id),
        ("InstanceType", &live.instance_type, &declared.instance_type),
        ("PrivateIP", &live.private_ip, &declared.private_ip),
        ("PublicIP", &live.public_ip, &declared.public_ip),
        ("KeyName", &live.key_name, &declared.key_name),
        ("PrivateDnsName", &live.private_dns_name, &declared.private_dns),
    ]
    .into_iter()
    .filter_map(|(field, live, declared)| scalar_drift(field, live, declared))
    .collect()
}

fn compare_tags(live: &CanonicalInstance, declared: &InstanceAttributes) -> Vec<DriftFinding> {
    if live.tags == declared.tags {
        return Vec::new();
    }
    vec![DriftFinding::new(format!(
        "Tags drift detected: AWS={}, Terraform={}",
        format_map(&live.tags),
        format_map(&declared.tags)
    ))]
}

fn compare_block_devices(live: &CanonicalInstance, declared: &InstanceAttributes) -> Vec<DriftFinding> {
    let Some(root_devices) = declared.root_block_device.as_ref() else {
        return Vec::new();
    };

    let known: HashSet<&str> = root_devices
        .iter()
        .flat_map(|d| [d.device_name.as_str(), d.volume_id.as_str()])
        .filter(|key| !key.is_empty())
        .collect();
    let declared_list = format_list(
        root_devices
            .iter()
            .map(|d| format!("{} ({})", d.device_name, d.volume_id)),
    );

    live.block_devices
        .iter()
        .filter(|d| {
            !known.contains(d.device_name.as_str()) && !known.contains(d.volume_id.as_str())
        })
        .map(|d| {
            DriftFinding::new(format!(
                "Block Device Mapping drift detected: AWS={} ({}), Terraform={declared_list}",
                d.device_name, d.volume_id
            ))
        })
        .collect()
}

fn compare_security_groups(
    live: &CanonicalInstance,
    declared: &InstanceAttributes,
) -> Vec<DriftFinding> {
    let mut findings = Vec::new();
    let declared_groups = declared.security_groups.as_deref();
    let declared_count = declared_groups.map_or(0, <[String]>::len);

    if live.security_groups.len() != declared_count {
        findings.push(DriftFinding::new(format!(
            "Security Groups count drift detected: AWS={}, Terraform={declared_count}",
            live.security_groups.len()
        )));
    }

    if let Some(groups) = declared_groups {
        let missing = live
            .security_groups
            .iter()
            .any(|sg| !groups.iter().any(|g| g == &sg.group_id));
        if missing {
            findings.push(DriftFinding::new(format!(
                "Security Group drift detected: AWS={}, Terraform={}",
                format_list(live.security_groups.iter().map(|sg| &sg.group_id)),
                format_list(groups)
            )));
        }
    }

    findings
}

fn compare_network_interfaces(
    live: &CanonicalInstance,
    declared: &InstanceAttributes,
) -> Vec<DriftFinding> {
    let [eni] = live.network_interfaces.as_slice() else {
        return vec![DriftFinding::new(format!(
            "Network Interface drift detected: Expected 1 interface, but got {} from AWS instance",
            live.network_interfaces.len()
        ))];
    };

    [
        ("Private IP in NetworkInterface", &eni.private_ip, &declared.private_ip),
        ("Public IP in NetworkInterface", &eni.public_ip, &declared.public_ip),
    ]
    .into_iter()
    .filter_map(|(field, live, declared)| scalar_drift(field, live, declared))
    .collect()
}
