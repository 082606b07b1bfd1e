//! Logging capability handed to each component.
//!
//! Components never reach for a process-wide logger themselves. They hold a
//! [`Logger`], which forwards records to whatever [`log::Log`] sink it was
//! built with: the global `log` backend in the binary, a capturing sink in
//! tests, or nothing at all.

use log::{Level, Log, Metadata, Record};
use std::fmt;
use std::sync::Arc;

/// Sink that forwards to the globally installed `log` backend.
struct GlobalSink;

impl Log for GlobalSink {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        log::logger().enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        log::logger().log(record);
    }

    fn flush(&self) {
        log::logger().flush();
    }
}

/// Sink that drops every record.
struct NullSink;

impl Log for NullSink {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        false
    }

    fn log(&self, _record: &Record<'_>) {}

    fn flush(&self) {}
}

/// Cloneable logging handle scoped to a target.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn Log>,
    target: &'static str,
}

impl Logger {
    /// Logger writing to the given sink under the `driftkit` target.
    pub fn new(sink: Arc<dyn Log>) -> Self {
        Self {
            sink,
            target: "driftkit",
        }
    }

    /// Logger forwarding to the global `log` backend.
    pub fn global() -> Self {
        Self::new(Arc::new(GlobalSink))
    }

    /// Logger that discards everything.
    pub fn discard() -> Self {
        Self::new(Arc::new(NullSink))
    }

    /// Same sink, different target.
    pub fn scoped(&self, target: &'static str) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            target,
        }
    }

    /// Target records are emitted under.
    pub fn target(&self) -> &'static str {
        self.target
    }

    /// Emit a record at the given level.
    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        let metadata = Metadata::builder().level(level).target(self.target).build();
        if !self.sink.enabled(&metadata) {
            return;
        }
        self.sink.log(
            &Record::builder()
                .metadata(metadata)
                .args(args)
                .module_path_static(Some(self.target))
                .build(),
        );
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::global()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").field("target", &self.target).finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Sink that records "LEVEL target: message" lines.
    #[derive(Default)]
    pub struct CaptureSink {
        pub lines: Mutex<Vec<String>>,
    }

    impl CaptureSink {
        pub fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }
    }

    impl Log for CaptureSink {
        fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &Record<'_>) {
            self.lines.lock().unwrap().push(format!(
                "{} {}: {}",
                record.level(),
                record.target(),
                record.args()
            ));
        }

        fn flush(&self) {}
    }

    pub fn capture() -> (Logger, Arc<CaptureSink>) {
        let sink = Arc::new(CaptureSink::default());
        (Logger::new(sink.clone()), sink)
    }
}
