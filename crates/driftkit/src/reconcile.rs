//! Periodic drift reconciliation.
//!
//! A [`Reconciler`] runs one fetch-parse-compare cycle immediately and then
//! one per interval tick until cancelled. Cycles never overlap. Any cycle
//! error ends the loop.

use crate::cancel::CancelToken;
use crate::compare::{ConfigComparator, SnapshotComparator};
use crate::error::{Error, Result};
use crate::hcl::ConfigScanner;
use crate::logger::Logger;
use crate::normalize::normalize;
use crate::provider::Provider;
use crate::retry::{LogCallback, with_retry};
use crate::snapshot::TerraformState;
use crate::types::{AWS_INSTANCE, CanonicalInstance, CycleReport, DriftReport, RetryConfig};
use chrono::Utc;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

/// Loop lifecycle, reported to [`ReportSink::on_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Waiting,
    Stopped,
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopState::Idle => write!(f, "idle"),
            LoopState::Running => write!(f, "running"),
            LoopState::Waiting => write!(f, "waiting"),
            LoopState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Receives the outcome of every completed cycle.
pub trait ReportSink: Send + Sync {
    /// Called once per successful cycle.
    fn on_report(&self, report: &CycleReport);

    /// Called on every loop state transition.
    fn on_state(&self, _state: LoopState) {}
}

/// Sink that writes findings to a [`Logger`].
#[derive(Debug, Clone)]
pub struct LogReports(pub Logger);

impl ReportSink for LogReports {
    fn on_report(&self, report: &CycleReport) {
        for drift in report.reports() {
            if drift.has_drift() {
                for finding in drift.findings() {
                    self.0
                        .warn(format_args!("[{}] {}: {finding}", report.instance_id, drift.source));
                }
            } else {
                self.0.info(format_args!(
                    "[{}] {}: no drift",
                    report.instance_id, drift.source
                ));
            }
        }
    }

    fn on_state(&self, state: LoopState) {
        self.0.debug(format_args!("Reconciliation loop {state}"));
    }
}

/// Parameters of the reconciliation loop.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Terraform resource type to look for (e.g., "aws_instance")
    pub resource_type: String,
    /// Instance the provider was asked for, used in error messages
    pub instance_id: Option<String>,
    /// Time between cycles
    pub interval: Duration,
    /// Retry policy for the live fetch
    pub retry: RetryConfig,
    /// Upper bound for the comparison phase of one cycle
    pub comparison_timeout: Duration,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            resource_type: AWS_INSTANCE.to_string(),
            instance_id: None,
            interval: Duration::from_secs(300),
            retry: RetryConfig::default(),
            comparison_timeout: Duration::from_secs(30),
        }
    }
}

/// Drives fetch-parse-compare cycles for one instance.
pub struct Reconciler {
    provider: Arc<dyn Provider>,
    state_path: PathBuf,
    config_path: PathBuf,
    options: ReconcileOptions,
    logger: Logger,
}

impl Reconciler {
    pub fn new(
        provider: Arc<dyn Provider>,
        state_path: impl Into<PathBuf>,
        config_path: impl Into<PathBuf>,
        options: ReconcileOptions,
        logger: Logger,
    ) -> Self {
        Self {
            provider,
            state_path: state_path.into(),
            config_path: config_path.into(),
            options,
            logger,
        }
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Run cycles until `cancel` fires or a cycle fails.
    ///
    /// Returns `Ok(())` when cancelled between cycles. Cancellation inside a
    /// cycle surfaces as [`Error::Cancelled`].
    pub async fn run(&self, cancel: &CancelToken, sink: &dyn ReportSink) -> Result<()> {
        let log = self.logger.scoped("driftkit::reconcile");
        sink.on_state(LoopState::Idle);
        log.info(format_args!(
            "Starting drift detection every {}s (state: {}, config: {})",
            self.options.interval.as_secs(),
            self.state_path.display(),
            self.config_path.display()
        ));

        let period = self.options.interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if cancel.is_cancelled() {
                break;
            }

            sink.on_state(LoopState::Running);
            match self.run_cycle(cancel).await {
                Ok(report) => sink.on_report(&report),
                Err(e) => {
                    log.error(format_args!("Drift detection cycle failed: {e}"));
                    sink.on_state(LoopState::Stopped);
                    return Err(e);
                }
            }

            sink.on_state(LoopState::Waiting);
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
        }

        log.info(format_args!("Drift detection stopped"));
        sink.on_state(LoopState::Stopped);
        Ok(())
    }

    /// Run a single fetch-parse-compare cycle.
    pub async fn run_cycle(&self, cancel: &CancelToken) -> Result<CycleReport> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let log = self.logger.scoped("driftkit::reconcile");

        let live = Arc::new(self.fetch_live(cancel).await?);
        log.debug(format_args!(
            "Fetched {} ({}) from {}",
            live.id,
            live.instance_type,
            self.provider.name()
        ));

        let state = TerraformState::load(&self.state_path).await?;
        let declared = ConfigScanner::new(&self.options.resource_type)
            .scan_file(&self.config_path)
            .await?;
        if declared.is_empty() {
            log.warn(format_args!(
                "No {} attributes found in {}",
                self.options.resource_type,
                self.config_path.display()
            ));
        }

        let snapshot_cmp = SnapshotComparator::new(&self.options.resource_type, self.logger.clone());
        let config_cmp = ConfigComparator::new(&self.options.resource_type, self.logger.clone());

        let compare = async {
            let (snapshot, config) = tokio::join!(
                snapshot_cmp.compare(Arc::clone(&live), &state, cancel),
                async { config_cmp.compare(&live, Some(&declared)) },
            );
            Ok::<(DriftReport, DriftReport), Error>((snapshot?, config?))
        };
        let (snapshot, config) =
            with_comparison_timeout(self.options.comparison_timeout, compare).await?;

        Ok(CycleReport {
            instance_id: live.id.clone(),
            checked_at: Utc::now(),
            snapshot,
            config,
        })
    }

    async fn fetch_live(&self, cancel: &CancelToken) -> Result<CanonicalInstance> {
        let callback = LogCallback(self.logger.scoped("driftkit::retry"));
        let output = with_retry(&self.options.retry, Some(&callback), cancel, || {
            self.provider.describe_instances()
        })
        .await?;
        normalize(&output, self.options.instance_id.as_deref())
    }
}

/// Bound a comparison by `after`.
async fn with_comparison_timeout<T>(
    after: Duration,
    comparison: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(after, comparison)
        .await
        .map_err(|_| Error::ComparisonTimeout { after })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::testing::capture;
    use crate::provider::MemoryProvider;
    use crate::provider::describe::{
        DescribeInstancesOutput, RawGroupIdentifier, RawInstance, RawNetworkInterface, RawTag,
    };
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const STATE: &str = r#"{
  "version": 4,
  "resources": [{
    "mode": "managed",
    "type": "aws_instance",
    "name": "web",
    "instances": [{
      "schema_version": 1,
      "attributes": {
        "id": "i-web",
        "ami": "ami-1",
        "instance_type": "t2.micro",
        "private_ip": "10.0.0.1",
        "public_ip": "",
        "key_name": "",
        "private_dns": "",
        "security_groups": ["sg-1"],
        "tags": {"Name": "web"}
      }
    }]
  }]
}"#;

    const MAIN_TF: &str = r#"
resource "aws_instance" "web" {
  ami           = "ami-1"
  instance_type = "t2.micro"
  tags = {
    Name = "web"
  }
}
"#;

    struct Fixture {
        _dir: TempDir,
        state: PathBuf,
        config: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("terraform.tfstate");
        let config = dir.path().join("main.tf");
        std::fs::write(&state, STATE).unwrap();
        std::fs::write(&config, MAIN_TF).unwrap();
        Fixture {
            _dir: dir,
            state,
            config,
        }
    }

    fn live_output(instance_type: &str) -> DescribeInstancesOutput {
        DescribeInstancesOutput::single(RawInstance {
            instance_id: Some("i-web".to_string()),
            instance_type: Some(instance_type.to_string()),
            image_id: Some("ami-1".to_string()),
            private_ip_address: Some("10.0.0.1".to_string()),
            tags: vec![RawTag {
                key: Some("Name".to_string()),
                value: Some("web".to_string()),
            }],
            security_groups: vec![RawGroupIdentifier {
                group_id: Some("sg-1".to_string()),
                group_name: None,
            }],
            network_interfaces: vec![RawNetworkInterface {
                network_interface_id: None,
                private_ip_address: Some("10.0.0.1".to_string()),
                association: None,
            }],
            ..Default::default()
        })
    }

    fn options() -> ReconcileOptions {
        ReconcileOptions {
            interval: Duration::from_secs(10),
            retry: RetryConfig::fixed(3, Duration::from_millis(5)),
            ..Default::default()
        }
    }

    fn reconciler(provider: Arc<dyn Provider>, fx: &Fixture) -> Reconciler {
        Reconciler::new(provider, &fx.state, &fx.config, options(), Logger::discard())
    }

    /// Records everything and cancels after `stop_after` reports.
    struct Recorder {
        reports: Mutex<Vec<CycleReport>>,
        states: Mutex<Vec<LoopState>>,
        stop_after: usize,
        cancel: CancelToken,
    }

    impl Recorder {
        fn new(stop_after: usize, cancel: &CancelToken) -> Self {
            Self {
                reports: Mutex::new(Vec::new()),
                states: Mutex::new(Vec::new()),
                stop_after,
                cancel: cancel.clone(),
            }
        }

        fn states(&self) -> Vec<LoopState> {
            self.states.lock().unwrap().clone()
        }

        fn report_count(&self) -> usize {
            self.reports.lock().unwrap().len()
        }
    }

    impl ReportSink for Recorder {
        fn on_report(&self, report: &CycleReport) {
            let mut reports = self.reports.lock().unwrap();
            reports.push(report.clone());
            if reports.len() >= self.stop_after {
                self.cancel.cancel();
            }
        }

        fn on_state(&self, state: LoopState) {
            self.states.lock().unwrap().push(state);
        }
    }

    #[test]
    fn test_default_options() {
        let options = ReconcileOptions::default();
        assert_eq!(options.interval, Duration::from_secs(300));
        assert_eq!(options.comparison_timeout, Duration::from_secs(30));
        assert_eq!(options.resource_type, AWS_INSTANCE);
    }

    #[tokio::test]
    async fn test_cycle_without_drift() {
        let fx = fixture();
        let provider = Arc::new(MemoryProvider::new(live_output("t2.micro")));
        let report = reconciler(provider, &fx)
            .run_cycle(&CancelToken::new())
            .await
            .unwrap();
        assert_eq!(report.instance_id, "i-web");
        assert!(!report.has_drift());
    }

    #[tokio::test]
    async fn test_cycle_reports_both_sources() {
        let fx = fixture();
        let provider = Arc::new(MemoryProvider::new(live_output("t3.large")));
        let report = reconciler(provider, &fx)
            .run_cycle(&CancelToken::new())
            .await
            .unwrap();
        assert_eq!(
            report.snapshot.messages(),
            vec!["InstanceType drift detected: AWS=t3.large, Terraform=t2.micro"]
        );
        assert_eq!(
            report.config.messages(),
            vec!["Drift in instance i-web: instance_type mismatch (AWS: t3.large, TF: t2.micro)"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_absorbs_transient_failure() {
        let fx = fixture();
        let provider = Arc::new(
            MemoryProvider::default()
                .then_fail("throttled")
                .then_output(live_output("t2.micro")),
        );
        let report = reconciler(provider.clone(), &fx)
            .run_cycle(&CancelToken::new())
            .await
            .unwrap();
        assert!(!report.has_drift());
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_is_fatal_after_retries() {
        let fx = fixture();
        let provider = Arc::new(MemoryProvider::default().then_fail("unreachable"));
        let (logger, sink) = capture();
        let reconciler = Reconciler::new(provider.clone(), &fx.state, &fx.config, options(), logger);

        let cancel = CancelToken::new();
        let recorder = Recorder::new(usize::MAX, &cancel);
        let err = reconciler.run(&cancel, &recorder).await.unwrap_err();

        assert!(matches!(err, Error::Upstream { .. }));
        assert_eq!(provider.calls(), 3);
        assert_eq!(recorder.report_count(), 0);
        assert_eq!(
            recorder.states(),
            vec![LoopState::Idle, LoopState::Running, LoopState::Stopped]
        );
        let retries = sink
            .lines()
            .iter()
            .filter(|l| l.starts_with("WARN driftkit::retry:"))
            .count();
        assert_eq!(retries, 2);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let fx = fixture();
        let provider = Arc::new(MemoryProvider::default());
        let err = reconciler(provider.clone(), &fx)
            .run_cycle(&CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_state_file_is_fatal() {
        let fx = fixture();
        std::fs::remove_file(&fx.state).unwrap();
        let provider = Arc::new(MemoryProvider::new(live_output("t2.micro")));
        let err = reconciler(provider, &fx)
            .run_cycle(&CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SnapshotUnreadable { .. }));
    }

    #[tokio::test]
    async fn test_missing_config_file_is_fatal() {
        let fx = fixture();
        std::fs::remove_file(&fx.config).unwrap();
        let provider = Arc::new(MemoryProvider::new(live_output("t2.micro")));
        let err = reconciler(provider, &fx)
            .run_cycle(&CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConfigUnreadable { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_cycle_fails() {
        let fx = fixture();
        let provider = Arc::new(MemoryProvider::new(live_output("t2.micro")));
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = reconciler(provider.clone(), &fx)
            .run_cycle(&cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(provider.calls(), 0);
    }

    /// Cancels the token from inside the fetch, then answers normally.
    struct CancelDuringFetch {
        cancel: CancelToken,
        output: DescribeInstancesOutput,
    }

    #[async_trait::async_trait]
    impl Provider for CancelDuringFetch {
        fn name(&self) -> &str {
            "cancel-during-fetch"
        }

        async fn describe_instances(&self) -> Result<DescribeInstancesOutput> {
            self.cancel.cancel();
            Ok(self.output.clone())
        }
    }

    /// Never answers.
    struct Hanging;

    #[async_trait::async_trait]
    impl Provider for Hanging {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn describe_instances(&self) -> Result<DescribeInstancesOutput> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_cancel_mid_cycle_is_fatal() {
        let fx = fixture();
        let cancel = CancelToken::new();
        let provider = Arc::new(CancelDuringFetch {
            cancel: cancel.clone(),
            output: live_output("t2.micro"),
        });
        let recorder = Recorder::new(usize::MAX, &cancel);

        let err = reconciler(provider, &fx)
            .run(&cancel, &recorder)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(recorder.report_count(), 0);
        assert_eq!(
            recorder.states(),
            vec![LoopState::Idle, LoopState::Running, LoopState::Stopped]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_hanging_fetch() {
        let fx = fixture();
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            trigger.cancel();
        });

        let err = reconciler(Arc::new(Hanging), &fx)
            .run_cycle(&cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_runs_until_cancelled() {
        let fx = fixture();
        let provider = Arc::new(MemoryProvider::new(live_output("t2.micro")));
        let cancel = CancelToken::new();
        let recorder = Recorder::new(3, &cancel);

        reconciler(provider.clone(), &fx)
            .run(&cancel, &recorder)
            .await
            .unwrap();

        assert_eq!(recorder.report_count(), 3);
        assert_eq!(provider.calls(), 3);
        assert_eq!(
            recorder.states(),
            vec![
                LoopState::Idle,
                LoopState::Running,
                LoopState::Waiting,
                LoopState::Running,
                LoopState::Waiting,
                LoopState::Running,
                LoopState::Waiting,
                LoopState::Stopped,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_cycle_runs_before_first_tick() {
        let fx = fixture();
        let provider = Arc::new(MemoryProvider::new(live_output("t2.micro")));
        let cancel = CancelToken::new();
        let recorder = Recorder::new(1, &cancel);
        let started = Instant::now();

        reconciler(provider, &fx).run(&cancel, &recorder).await.unwrap();

        assert_eq!(recorder.report_count(), 1);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_cancel_before_start_stops_cleanly() {
        let fx = fixture();
        let provider = Arc::new(MemoryProvider::new(live_output("t2.micro")));
        let cancel = CancelToken::new();
        cancel.cancel();
        let recorder = Recorder::new(1, &cancel);

        reconciler(provider.clone(), &fx)
            .run(&cancel, &recorder)
            .await
            .unwrap();

        assert_eq!(provider.calls(), 0);
        assert_eq!(recorder.states(), vec![LoopState::Idle, LoopState::Stopped]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_comparison_timeout() {
        let err = with_comparison_timeout(Duration::from_secs(30), std::future::pending::<Result<()>>())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ComparisonTimeout { after } if after == Duration::from_secs(30)));
    }

    #[test]
    fn test_log_reports_sink() {
        let (logger, sink) = capture();
        let report = CycleReport {
            instance_id: "i-web".to_string(),
            checked_at: Utc::now(),
            snapshot: DriftReport::new(crate::types::DriftSource::Snapshot, Vec::new()),
            config: DriftReport::new(
                crate::types::DriftSource::Config,
                vec![crate::types::DriftFinding::new("AMI mismatch")],
            ),
        };
        LogReports(logger).on_report(&report);
        assert_eq!(
            sink.lines(),
            vec![
                "INFO driftkit: [i-web] Terraform state: no drift",
                "WARN driftkit: [i-web] Terraform config: AMI mismatch",
            ]
        );
    }

    #[test]
    fn test_sink_state_default_is_noop() {
        struct Count(AtomicUsize);
        impl ReportSink for Count {
            fn on_report(&self, _: &CycleReport) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
        let sink = Count(AtomicUsize::new(0));
        sink.on_state(LoopState::Running);
        assert_eq!(sink.0.load(Ordering::SeqCst), 0);
    }
}
