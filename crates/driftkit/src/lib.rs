//! # driftkit
//!
//! Drift detection between a live EC2 instance and its Terraform
//! declarations.
//!
//! This crate provides functionality for:
//! - Normalizing an `ec2 describe-instances` response into a canonical model
//! - Scanning a Terraform `.tf` file for an instance's declared attributes
//! - Decoding Terraform state and locating the declared instance
//! - Comparing the live instance against both declarations
//! - Running the comparison periodically with retry and cancellation
//!
//! ## Example
//!
//! ```no_run
//! use driftkit::provider::{AwsCliOptions, AwsCliProvider};
//! use driftkit::{CancelToken, LogReports, Logger, ReconcileOptions, Reconciler};
//! use std::sync::Arc;
//!
//! # async fn example() -> driftkit::Result<()> {
//! let provider = Arc::new(AwsCliProvider::new(AwsCliOptions {
//!     instance_id: Some("i-0abc".to_string()),
//!     ..Default::default()
//! }));
//! let reconciler = Reconciler::new(
//!     provider,
//!     "terraform.tfstate",
//!     "main.tf",
//!     ReconcileOptions::default(),
//!     Logger::global(),
//! );
//!
//! let report = reconciler.run_cycle(&CancelToken::new()).await?;
//! for finding in report.snapshot.findings() {
//!     println!("{finding}");
//! }
//!
//! // Or keep checking until cancelled
//! let cancel = CancelToken::new();
//! reconciler.run(&cancel, &LogReports(Logger::global())).await?;
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod compare;
pub mod error;
pub mod hcl;
pub mod logger;
pub mod normalize;
pub mod provider;
pub mod reconcile;
pub mod retry;
pub mod snapshot;
pub mod types;

pub use cancel::CancelToken;
pub use error::{Error, ErrorCategory, Result};
pub use logger::Logger;
pub use reconcile::{LogReports, LoopState, ReconcileOptions, Reconciler, ReportSink};
pub use types::{
    AWS_INSTANCE, CanonicalInstance, CycleReport, DeclaredInstance, DriftFinding, DriftReport,
    DriftSource, NO_DRIFT, RetryConfig,
};
