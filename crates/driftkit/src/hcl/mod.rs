//! Terraform config (`.tf`) scanning.
//!
//! This is not an HCL parser. It reads a config file line by line and
//! extracts the attributes drift detection compares.

pub mod scanner;

pub use scanner::{ConfigScanner, ScanState, scan_file, scan_str};
