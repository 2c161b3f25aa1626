use serde::{Deserialize, Serialize};
use std::fmt;

/// Final status of a reported test
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One test outcome as sent to `/reporter/{uid}/testrun`
///
/// Absent values serialize as `null`, never omitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub title: String,
    pub test_id: Option<String>,
    pub suite_title: String,
    pub file: String,
    pub status: TestStatus,
    pub message: Option<String>,
    pub stack: Option<String>,
}
