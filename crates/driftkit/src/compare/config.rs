//! Comparison against attributes scanned from the Terraform config.

use crate::error::{Error, Result};
use crate::logger::Logger;
use crate::types::{AWS_INSTANCE, CanonicalInstance, DeclaredInstance, DriftFinding, DriftReport, DriftSource};

/// Compares a live instance with its declared config attributes.
///
/// Only attributes the config declares are checked. Tags present on the
/// live instance but not declared are not reported.
#[derive(Debug, Clone)]
pub struct ConfigComparator {
    resource_type: String,
    logger: Logger,
}

impl ConfigComparator {
    pub fn new(resource_type: impl Into<String>, logger: Logger) -> Self {
        Self {
            resource_type: resource_type.into(),
            logger: logger.scoped("driftkit::compare::config"),
        }
    }

    /// Compare instance type, AMI, then each declared tag in key order.
    pub fn compare(
        &self,
        live: &CanonicalInstance,
        declared: Option<&DeclaredInstance>,
    ) -> Result<DriftReport> {
        let Some(declared) = declared else {
            self.logger.error(format_args!(
                "No {} declared in config for {}",
                self.resource_type, live.id
            ));
            return Err(Error::NoMatchingResource {
                resource_type: self.resource_type.clone(),
                instance_id: live.id.clone(),
            });
        };

        let id = &live.id;
        let mut findings = Vec::new();

        if live.instance_type != declared.instance_type {
            findings.push(DriftFinding::new(format!(
                "Drift in instance {id}: instance_type mismatch (AWS: {}, TF: {})",
                live.instance_type, declared.instance_type
            )));
        }
        if live.ami != declared.ami {
            findings.push(DriftFinding::new(format!(
                "Drift in instance {id}: AMI mismatch (AWS: {}, TF: {})",
                live.ami, declared.ami
            )));
        }
        for (key, value) in &declared.tags {
            let live_value = live.tags.get(key).map_or("", String::as_str);
            if live.tags.get(key) != Some(value) {
                findings.push(DriftFinding::new(format!(
                    "Drift in instance {id}: tag {key} mismatch (AWS: {live_value}, TF: {value})"
                )));
            }
        }

        let report = DriftReport::new(DriftSource::Config, findings);
        if report.has_drift() {
            self.logger.info(format_args!(
                "Config comparison for {id} found {} drift(s)",
                report.drift_count()
            ));
        } else {
            self.logger.info(format_args!("No config drift for {id}"));
        }
        Ok(report)
    }
}

impl Default for ConfigComparator {
    fn default() -> Self {
        Self::new(AWS_INSTANCE, Logger::default())
    }
}
