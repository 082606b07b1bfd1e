//! Normalization of a raw describe-instances response into a [`CanonicalInstance`].

use crate::error::{Error, Result};
use crate::provider::describe::{DescribeInstancesOutput, RawInstance};
use crate::types::{BlockDevice, CanonicalInstance, NetworkInterface, SecurityGroup};
use chrono::{DateTime, SecondsFormat};

/// Map the first instance of the first reservation to the canonical model.
///
/// `requested_id` is only used to make a [`Error::NotFound`] more helpful.
pub fn normalize(
    output: &DescribeInstancesOutput,
    requested_id: Option<&str>,
) -> Result<CanonicalInstance> {
    let raw = output.first_instance().ok_or_else(|| Error::NotFound {
        instance_id: requested_id.map(ToString::to_string),
    })?;
    normalize_instance(raw)
}

/// Map one raw instance to the canonical model.
pub fn normalize_instance(raw: &RawInstance) -> Result<CanonicalInstance> {
    let id = raw
        .instance_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::MalformedInstance {
            reason: "instance has no InstanceId".to_string(),
        })?;

    let tags = raw
        .tags
        .iter()
        .filter_map(|tag| Some((tag.key.clone()?, tag.value.clone()?)))
        .collect();

    let block_devices = raw
        .block_device_mappings
        .iter()
        .filter_map(|mapping| {
            let device_name = mapping.device_name.clone()?;
            let volume_id = mapping.ebs.as_ref()?.volume_id.clone()?;
            Some(BlockDevice {
                device_name,
                volume_id,
            })
        })
        .collect();

    let security_groups = raw
        .security_groups
        .iter()
        .filter_map(|group| {
            Some(SecurityGroup {
                group_id: group.group_id.clone()?,
            })
        })
        .collect();

    let network_interfaces = raw
        .network_interfaces
        .iter()
        .filter_map(|eni| {
            let private_ip = eni.private_ip_address.clone()?;
            let public_ip = eni
                .association
                .as_ref()
                .and_then(|a| a.public_ip.clone())
                .unwrap_or_default();
            Some(NetworkInterface {
                private_ip,
                public_ip,
            })
        })
        .collect();

    Ok(CanonicalInstance {
        id: id.to_string(),
        instance_type: raw.instance_type.clone().unwrap_or_default(),
        ami: raw.image_id.clone().unwrap_or_default(),
        key_name: raw.key_name.clone().unwrap_or_default(),
        private_ip: raw.private_ip_address.clone().unwrap_or_default(),
        public_ip: raw.public_ip_address.clone().unwrap_or_default(),
        private_dns_name: raw.private_dns_name.clone().unwrap_or_default(),
        launch_time: raw
            .launch_time
            .as_deref()
            .map(normalize_launch_time)
            .unwrap_or_default(),
        tags,
        block_devices,
        security_groups,
        network_interfaces,
    })
}

/// RFC 3339 in UTC when parseable, the input unchanged otherwise.
fn normalize_launch_time(value: &str) -> String {
    DateTime::parse_from_rfc3339(value).map_or_else(
        |_| value.to_string(),
        |ts| ts.to_utc().to_rfc3339_opts(SecondsFormat::AutoSi, true),
    )
}
