//! Drift comparison between the live instance and its declarations.
//!
//! - [`SnapshotComparator`] checks the live instance against the Terraform
//!   state, running independent attribute groups concurrently.
//! - [`ConfigComparator`] checks it against the attributes scanned from the
//!   Terraform config.

pub mod config;
pub mod snapshot;

pub use config::ConfigComparator;
pub use snapshot::{CheckGroup, SnapshotComparator};

use std::collections::BTreeMap;
use std::fmt::Display;

/// Render a map as `{k1: v1, k2: v2}`.
pub(crate) fn format_map(map: &BTreeMap<String, String>) -> String {
    let entries: Vec<String> = map.iter().map(|(k, v)| format!("{k}: {v}")).collect();
    format!("{{{}}}", entries.join(", "))
}

/// Render a list as `[a, b]`.
pub(crate) fn format_list<T: Display>(items: impl IntoIterator<Item = T>) -> String {
    let entries: Vec<String> = items.into_iter().map(|item| item.to_string()).collect();
    format!("[{}]", entries.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_map() {
        let mut map = BTreeMap::new();
        assert_eq!(format_map(&map), "{}");
        map.insert("b".to_string(), "2".to_string());
        map.insert("a".to_string(), "1".to_string());
        assert_eq!(format_map(&map), "{a: 1, b: 2}");
    }

    #[test]
    fn test_format_list() {
        assert_eq!(format_list(Vec::<String>::new()), "[]");
        assert_eq!(format_list(["sg-1", "sg-2"]), "[sg-1, sg-2]");
    }
}
