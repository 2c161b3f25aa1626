use super::types::{TestResult, TestStatus};
use crate::runner::events::{TestEvent, TestOutcome};
use crate::utils::config::{ReporterConfig, DEFAULT_FILE_EXTENSION};

/// Builds the reportable record for a finished test
#[derive(Debug, Clone)]
pub struct ResultMapper {
    file_extension: String,
}

impl Default for ResultMapper {
    fn default() -> Self {
        Self::new(DEFAULT_FILE_EXTENSION)
    }
}

impl ResultMapper {
    pub fn new(file_extension: impl Into<String>) -> Self {
        Self {
            file_extension: file_extension.into(),
        }
    }

    pub fn from_config(config: &ReporterConfig) -> Self {
        Self::new(config.file_extension.clone())
    }

    pub fn map(&self, event: &TestEvent) -> TestResult {
        let status = event.outcome.status();

        // Passed and disabled tests never carry a trace
        let cause = match event.outcome {
            TestOutcome::Failed | TestOutcome::Aborted => event.cause.as_ref(),
            TestOutcome::Passed | TestOutcome::Disabled => None,
        };

        let (message, stack) = match cause {
            Some(cause) => (cause.message.clone(), Some(cause.render_trace())),
            None => (Some(default_message(status)), None),
        };

        TestResult {
            title: event
                .title
                .clone()
                .unwrap_or_else(|| event.name.clone()),
            test_id: event.test_id.clone(),
            suite_title: event.suite.clone(),
            file: format!("{}{}", event.suite, self.file_extension),
            status,
            message,
            stack,
        }
    }
}

fn default_message(status: TestStatus) -> String {
    format!("Test finished with status: {}", status)
}
