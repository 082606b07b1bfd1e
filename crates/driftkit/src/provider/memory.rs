//! Scripted in-memory provider.

use crate::error::{Error, Result};
use crate::provider::{DescribeInstancesOutput, Provider};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A scripted response. Errors are stored as messages and replayed as
/// [`Error::Upstream`], since [`Error`] is not `Clone`.
#[derive(Debug, Clone)]
enum Scripted {
    Output(DescribeInstancesOutput),
    Failure(String),
}

/// Provider that replays a queue of responses.
///
/// Each call pops the next response; once one response is left it is
/// repeated forever. An empty script answers with zero reservations.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    script: Mutex<VecDeque<Scripted>>,
    calls: AtomicUsize,
}

impl MemoryProvider {
    /// Provider that always returns `output`.
    pub fn new(output: DescribeInstancesOutput) -> Self {
        Self::default().then_output(output)
    }

    /// Append a successful response.
    pub fn then_output(self, output: DescribeInstancesOutput) -> Self {
        self.push(Scripted::Output(output))
    }

    /// Append an upstream failure.
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.push(Scripted::Failure(message.into()))
    }

    /// Number of `describe_instances` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn push(mut self, entry: Scripted) -> Self {
        if let Ok(script) = self.script.get_mut() {
            script.push_back(entry);
        }
        self
    }

    fn next(&self) -> Option<Scripted> {
        let mut script = self.script.lock().ok()?;
        if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        }
    }
}

#[async_trait]
impl Provider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    async fn describe_instances(&self) -> Result<DescribeInstancesOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.next() {
            Some(Scripted::Output(output)) => Ok(output),
            Some(Scripted::Failure(message)) => Err(Error::upstream(message)),
            None => Ok(DescribeInstancesOutput::default()),
        }
    }
}
