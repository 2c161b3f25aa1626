use chrono::{DateTime, Local};
use std::fmt;
use std::time::{Duration, Instant};

/// Lifecycle of the remote test run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Uninitialized,
    Created,
    Aborted,
    Finished,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Aborted | RunState::Finished)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Uninitialized => "uninitialized",
            RunState::Created => "created",
            RunState::Aborted => "aborted",
            RunState::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Local view of the remote run
#[derive(Debug, Clone)]
pub struct TestRun {
    pub uid: Option<String>,
    pub title: String,
    pub state: RunState,
    pub started_at: Option<Instant>,
    pub started_at_wall: Option<DateTime<Local>>,
}

impl Default for TestRun {
    fn default() -> Self {
        Self {
            uid: None,
            title: String::new(),
            state: RunState::Uninitialized,
            started_at: None,
            started_at_wall: None,
        }
    }
}

impl TestRun {
    pub fn start(&mut self, title: &str) {
        self.title = title.to_string();
        self.started_at = Some(Instant::now());
        self.started_at_wall = Some(Local::now());
    }

    pub fn created(&mut self, uid: String) {
        self.uid = Some(uid);
        self.state = RunState::Created;
    }

    /// Creation failed; the run never gets a uid
    pub fn abort(&mut self) {
        self.uid = None;
        self.state = RunState::Aborted;
    }

    pub fn finish(&mut self) {
        self.state = RunState::Finished;
    }

    /// Local wall-clock start for log lines, `-` before the run starts
    pub fn started_at_label(&self) -> String {
        self.started_at_wall
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string())
    }

    /// Time since creation started, zero if it never did
    pub fn elapsed(&self) -> Duration {
        self.started_at
            .map(|start| start.elapsed())
            .unwrap_or_default()
    }
}

/// Seconds with millisecond precision, as the finish call expects
pub fn duration_secs(duration: Duration) -> f64 {
    duration.as_millis() as f64 / 1000.0
}
