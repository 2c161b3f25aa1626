use log::{info, warn};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::controller::{ReportOutcome, RunController};
use crate::error::Result;
use crate::report::mapper::ResultMapper;
use crate::report::types::TestStatus;
use crate::transport::Transport;

/// Printed before a test runs when it carries an external id
pub const TEST_ID_MARKER: &str = "tid://@";

/// Printed before a test runs when it carries a display title
pub const TEST_TITLE_MARKER: &str = "title://";

/// How a test ended, as seen by the host framework
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Failed,
    /// Started but gave up (assumption failed, aborted)
    Aborted,
    /// Never started
    Disabled,
}

impl TestOutcome {
    pub fn status(&self) -> TestStatus {
        match self {
            TestOutcome::Passed => TestStatus::Passed,
            TestOutcome::Failed => TestStatus::Failed,
            TestOutcome::Aborted | TestOutcome::Disabled => TestStatus::Skipped,
        }
    }
}

/// Error that ended a test, with its trace
#[derive(Debug, Clone, PartialEq)]
pub struct FailureCause {
    pub kind: String,
    pub message: Option<String>,
    pub frames: Vec<String>,
    pub caused_by: Option<Box<FailureCause>>,
}

impl FailureCause {
    pub fn new(kind: impl Into<String>, message: Option<&str>) -> Self {
        Self {
            kind: kind.into(),
            message: message.map(str::to_string),
            frames: Vec::new(),
            caused_by: None,
        }
    }

    pub fn with_frames(mut self, frames: Vec<String>) -> Self {
        self.frames = frames;
        self
    }

    pub fn with_caused_by(mut self, cause: FailureCause) -> Self {
        self.caused_by = Some(Box::new(cause));
        self
    }

    /// Build from a Rust error, following its `source()` chain
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut cause = Self::new("Error", Some(&err.to_string()));
        if let Some(source) = err.source() {
            cause = cause.with_caused_by(Self::from_error(source));
        }
        cause
    }

    /// `Kind: message`, one `\tat frame` per line, then `Caused by:` sections
    pub fn render_trace(&self) -> String {
        let mut out = String::new();
        let mut current = Some(self);
        let mut first = true;

        while let Some(cause) = current {
            if !first {
                out.push_str("Caused by: ");
            }
            out.push_str(if cause.kind.is_empty() {
                "Error"
            } else {
                cause.kind.as_str()
            });
            if let Some(ref message) = cause.message {
                let _ = write!(out, ": {}", message);
            }
            out.push('\n');
            for frame in &cause.frames {
                let _ = writeln!(out, "\tat {}", frame);
            }

            first = false;
            current = cause.caused_by.as_deref();
        }

        out
    }
}

/// A finished test reported by the host framework
#[derive(Debug, Clone, PartialEq)]
pub struct TestEvent {
    /// Method or function name
    pub name: String,
    /// Class, module or suite containing the test
    pub suite: String,
    pub outcome: TestOutcome,
    pub cause: Option<FailureCause>,
    /// External test case id (`T001`, `@Ta0b0c0d0`)
    pub test_id: Option<String>,
    /// Display title overriding the name
    pub title: Option<String>,
}

impl TestEvent {
    pub fn new(name: impl Into<String>, suite: impl Into<String>, outcome: TestOutcome) -> Self {
        Self {
            name: name.into(),
            suite: suite.into(),
            outcome,
            cause: None,
            test_id: None,
            title: None,
        }
    }

    pub fn with_cause(mut self, cause: FailureCause) -> Self {
        self.cause = Some(cause);
        self
    }

    pub fn with_test_id(mut self, test_id: impl Into<String>) -> Self {
        self.test_id = Some(test_id.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Lifecycle hooks a host test framework drives
///
/// Hosts must call `on_batch_start` once before any per-test hook and
/// `on_batch_end` once after the last one. Per-test hooks take `&self` and
/// may be called from parallel workers.
pub trait BatchListener: Send + Sync {
    /// An error here is fatal: the batch must not run
    fn on_batch_start(&mut self, batch_name: &str) -> Result<()>;

    /// Called before a test body executes
    fn on_test_started(&self, _name: &str, test_id: Option<&str>, title: Option<&str>) {
        if let Some(id) = test_id {
            println!("{}{}", TEST_ID_MARKER, id);
        }
        if let Some(title) = title {
            println!("{}{}", TEST_TITLE_MARKER, title);
        }
    }

    /// Never fails; reporting problems are only logged
    fn on_test_event(&self, event: &TestEvent);

    /// A failure means the remote run may stay open
    fn on_batch_end(&mut self) -> Result<()>;
}

/// Counters over the reports of one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub delivered: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Default)]
struct ReportCounters {
    delivered: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
}

impl ReportCounters {
    fn snapshot(&self) -> ReportSummary {
        ReportSummary {
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

/// Listener that reports every event to the remote run
pub struct ReportingListener<T: Transport> {
    controller: RunController<T>,
    mapper: ResultMapper,
    counters: ReportCounters,
}

impl<T: Transport> ReportingListener<T> {
    pub fn new(controller: RunController<T>) -> Self {
        let mapper = ResultMapper::from_config(controller.config());
        Self {
            controller,
            mapper,
            counters: ReportCounters::default(),
        }
    }

    pub fn controller(&self) -> &RunController<T> {
        &self.controller
    }

    pub fn summary(&self) -> ReportSummary {
        self.counters.snapshot()
    }
}

impl<T: Transport> BatchListener for ReportingListener<T> {
    fn on_batch_start(&mut self, batch_name: &str) -> Result<()> {
        let title = self.controller.config().resolve_run_title(batch_name);
        self.controller.create_run(&title)?;
        Ok(())
    }

    fn on_test_event(&self, event: &TestEvent) {
        let result = self.mapper.map(event);

        match self.controller.report_result(&result) {
            Ok(ReportOutcome::Delivered) => {
                self.counters.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Ok(ReportOutcome::Skipped) => {
                self.counters.skipped.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!("Failed to report test result for {}: {}", result.title, e);
            }
        }
    }

    fn on_batch_end(&mut self) -> Result<()> {
        if self.controller.uid().is_none() {
            return Ok(());
        }

        match self.controller.finish() {
            Ok(duration) => {
                let summary = self.summary();
                info!(
                    "Reported {} results ({} failed) in {}s",
                    summary.delivered, summary.failed, duration
                );
                Ok(())
            }
            Err(e) => {
                warn!("Failed to finish test run: {}", e);
                Err(e)
            }
        }
    }
}
