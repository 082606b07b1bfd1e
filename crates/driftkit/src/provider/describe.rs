//! Raw `DescribeInstances` response, as printed by `aws ec2 describe-instances --output json`.
//!
//! Every field is optional: the provider omits whatever does not apply, and
//! the normalizer decides what an absent field means.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeInstancesOutput {
    #[serde(default)]
    pub reservations: Vec<Reservation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Reservation {
    #[serde(default)]
    pub instances: Vec<RawInstance>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawInstance {
    pub instance_id: Option<String>,
    pub instance_type: Option<String>,
    pub image_id: Option<String>,
    pub key_name: Option<String>,
    pub private_ip_address: Option<String>,
    pub public_ip_address: Option<String>,
    pub private_dns_name: Option<String>,
    pub launch_time: Option<String>,
    #[serde(default)]
    pub tags: Vec<RawTag>,
    #[serde(default)]
    pub block_device_mappings: Vec<RawBlockDeviceMapping>,
    #[serde(default)]
    pub security_groups: Vec<RawGroupIdentifier>,
    #[serde(default)]
    pub network_interfaces: Vec<RawNetworkInterface>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawTag {
    pub key: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawBlockDeviceMapping {
    pub device_name: Option<String>,
    pub ebs: Option<RawEbs>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawEbs {
    pub volume_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawGroupIdentifier {
    pub group_id: Option<String>,
    pub group_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawNetworkInterface {
    pub network_interface_id: Option<String>,
    pub private_ip_address: Option<String>,
    pub association: Option<RawAssociation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawAssociation {
    pub public_ip: Option<String>,
    pub public_dns_name: Option<String>,
}

impl DescribeInstancesOutput {
    /// Wrap a single instance in one reservation.
    pub fn single(instance: RawInstance) -> Self {
        Self {
            reservations: vec![Reservation {
                instances: vec![instance],
            }],
        }
    }

    /// First instance of the first reservation, if any.
    pub fn first_instance(&self) -> Option<&RawInstance> {
        self.reservations.first()?.instances.first()
    }
}
