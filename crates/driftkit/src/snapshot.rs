//! Terraform state (`.tfstate`) decoding.
//!
//! Only the parts of the state document needed for drift detection are
//! modeled. Unknown fields are ignored, and `null` scalars decode as empty.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Decode `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Root of a Terraform state file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TerraformState {
    #[serde(default)]
    pub version: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub terraform_version: String,
    #[serde(default)]
    pub serial: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub lineage: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub outputs: BTreeMap<String, serde_json::Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub resources: Vec<StateResource>,
}

/// A resource entry (`mode`, `type`, `name`) with its instances.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateResource {
    #[serde(default, deserialize_with = "null_as_default")]
    pub mode: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub resource_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub provider: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub instances: Vec<ResourceInstance>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceInstance {
    #[serde(default)]
    pub schema_version: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: InstanceAttributes,
}

/// Attributes of an `aws_instance` as recorded in state.
///
/// `root_block_device` and `security_groups` stay `None` when the state does
/// not carry them, which is different from carrying an empty list: the
/// comparator skips the corresponding checks only in the former case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceAttributes {
    #[serde(default, deserialize_with = "null_as_default")]
    pub ami: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub arn: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub availability_zone: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub instance_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub private_ip: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub public_ip: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub key_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub private_dns: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub public_dns: String,
    #[serde(default)]
    pub root_block_device: Option<Vec<RootBlockDevice>>,
    #[serde(default)]
    pub security_groups: Option<Vec<String>>,
    #[serde(default)]
    pub vpc_security_group_ids: Option<Vec<String>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub primary_network_interface_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootBlockDevice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub device_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub volume_id: String,
    #[serde(default)]
    pub volume_size: Option<u64>,
    #[serde(default)]
    pub volume_type: Option<String>,
    #[serde(default)]
    pub encrypted: Option<bool>,
    #[serde(default)]
    pub delete_on_termination: Option<bool>,
}

impl TerraformState {
    /// Load and decode a state file.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| Error::SnapshotUnreadable {
                path: path.to_path_buf(),
                source,
            })?;
        serde_json::from_str(&content).map_err(|source| Error::SnapshotMalformed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// First instance of the first resource of `resource_type` that has one.
    ///
    /// Later resources of the same type are never consulted, even when the
    /// first one does not describe the live instance.
    pub fn find_instance(&self, resource_type: &str) -> Option<&InstanceAttributes> {
        self.resources
            .iter()
            .filter(|r| r.resource_type == resource_type)
            .find_map(|r| r.instances.first())
            .map(|i| &i.attributes)
    }
}
