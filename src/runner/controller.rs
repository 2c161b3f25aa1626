//! Test run lifecycle against the reporter API.
//!
//! A run is created once per batch, receives one report per test and is
//! finished once with the total duration. Creation failures are fatal for
//! the batch; report failures are handed back for logging and never change
//! the run state.

use log::{debug, error, info};
use reqwest::Url;

use super::state::{duration_secs, RunState, TestRun};
use crate::error::{ReporterError, Result};
use crate::report::codec;
use crate::report::types::TestResult;
use crate::transport::{HttpTransport, Method, Request, Response, Transport};
use crate::utils::config::{ReporterConfig, FALLBACK_RUN_TITLE};

const API_KEY_PARAM: &str = "api_key";
const TESTRUN_SEGMENT: &str = "testrun";

/// Longest slice of an error body kept in `ReporterError::Remote`
const MAX_ERROR_BODY: usize = 300;

/// What happened to a single report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    Delivered,
    /// No run is open; nothing was sent
    Skipped,
}

/// Owns the remote run and sequences create, report and finish
pub struct RunController<T: Transport> {
    config: ReporterConfig,
    transport: T,
    run: TestRun,
}

impl RunController<HttpTransport> {
    /// Controller over the reqwest transport
    pub fn from_config(config: ReporterConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::new(config, transport))
    }
}

impl<T: Transport> RunController<T> {
    pub fn new(config: ReporterConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            run: TestRun::default(),
        }
    }

    pub fn config(&self) -> &ReporterConfig {
        &self.config
    }

    pub fn run(&self) -> &TestRun {
        &self.run
    }

    pub fn state(&self) -> RunState {
        self.run.state
    }

    pub fn uid(&self) -> Option<&str> {
        self.run.uid.as_deref()
    }

    /// Open the remote run and return its uid
    ///
    /// A missing API key fails before anything is sent and leaves the
    /// controller uninitialized. Any other failure aborts the run.
    pub fn create_run(&mut self, title: &str) -> Result<&str> {
        self.expect_state(RunState::Uninitialized)?;
        let url = self.endpoint(&[])?;

        let title = if title.trim().is_empty() {
            FALLBACK_RUN_TITLE
        } else {
            title
        };
        self.run.start(title);

        let outcome = codec::encode_create_run(title)
            .and_then(|body| self.send(Method::Post, url, body))
            .and_then(Self::expect_ok)
            .and_then(|response| Self::run_uid(&response));

        match outcome {
            Ok(uid) => {
                info!(
                    "Test run started at {}, UID: {}",
                    self.run.started_at_label(),
                    uid
                );
                self.run.created(uid);
                Ok(self.run.uid.as_deref().unwrap_or_default())
            }
            Err(e) => {
                error!("Failed to create test run: {}", e);
                self.run.abort();
                Err(e)
            }
        }
    }

    /// Send one result to the open run
    ///
    /// Returns `Skipped` without sending when no run is open. Failures are
    /// returned for the caller to log; the run state is never touched, so
    /// this is safe to call from several threads at once.
    pub fn report_result(&self, result: &TestResult) -> Result<ReportOutcome> {
        let uid = match (self.run.state, self.run.uid.as_deref()) {
            (RunState::Created, Some(uid)) => uid,
            (state, _) => {
                debug!(
                    "Skipping report for '{}': test run is {}",
                    result.title, state
                );
                return Ok(ReportOutcome::Skipped);
            }
        };

        let url = self.endpoint(&[uid, TESTRUN_SEGMENT])?;
        let body = codec::encode_result(result)?;
        debug!("Reporting '{}': {}", result.title, body);

        let response = self.send(Method::Post, url, body)?;
        Self::expect_ok(response)?;
        debug!("Reported '{}' ({})", result.title, result.status);
        Ok(ReportOutcome::Delivered)
    }

    /// Close the run with the given total duration
    ///
    /// On failure the run stays `Created` and the error is returned.
    pub fn finish_run(&mut self, duration_secs: f64) -> Result<()> {
        self.expect_state(RunState::Created)?;
        if !duration_secs.is_finite() || duration_secs < 0.0 {
            return Err(ReporterError::InvalidDuration(duration_secs));
        }
        let uid = self.run.uid.clone().unwrap_or_default();

        let url = self.endpoint(&[uid.as_str()])?;
        let body = codec::encode_finish(duration_secs)?;
        let response = self.send(Method::Put, url, body)?;
        Self::expect_ok(response)?;

        self.run.finish();
        info!(
            "Test run finished successfully. Total duration (s): {}",
            duration_secs
        );
        Ok(())
    }

    /// Close the run with the time elapsed since creation started
    pub fn finish(&mut self) -> Result<f64> {
        let duration = duration_secs(self.run.elapsed());
        self.finish_run(duration)?;
        Ok(duration)
    }

    fn expect_state(&self, expected: RunState) -> Result<()> {
        if self.run.state == expected {
            Ok(())
        } else {
            Err(ReporterError::InvalidState {
                state: self.run.state,
                expected,
            })
        }
    }

    /// `{base_url}/{segments..}?api_key=KEY`
    fn endpoint(&self, segments: &[&str]) -> Result<String> {
        let api_key = self.config.require_api_key()?;
        let invalid = || {
            ReporterError::Configuration(format!(
                "Invalid reporter URL: {}",
                self.config.base_url
            ))
        };

        let mut url = Url::parse(&self.config.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut().append_pair(API_KEY_PARAM, api_key);

        Ok(url.into())
    }

    fn send(&self, method: Method, url: String, body: String) -> Result<Response> {
        debug!("{} {}", method, redact(&url));
        let request = Request {
            method,
            url,
            body,
            timeout: self.config.timeout,
        };
        self.transport.send(&request)
    }

    fn expect_ok(response: Response) -> Result<Response> {
        if response.is_ok() {
            Ok(response)
        } else {
            Err(ReporterError::Remote {
                status: response.status,
                body: response.body.chars().take(MAX_ERROR_BODY).collect(),
            })
        }
    }

    fn run_uid(response: &Response) -> Result<String> {
        match codec::decode_run_uid(&response.body)? {
            Some(uid) if !uid.is_empty() => Ok(uid),
            _ => Err(ReporterError::Decode(format!(
                "create-run response has no '{}' field",
                codec::UID_FIELD
            ))),
        }
    }
}

/// URL without its query string, so the API key never reaches the logs
fn redact(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::types::TestStatus;
    use crate::transport::fake::{ok, status, FakeTransport};
    use serde_json::Value;
    use std::sync::Arc;

    const BASE: &str = "https://reporter.test/api/reporter";

    fn config() -> ReporterConfig {
        ReporterConfig::default()
            .with_api_key("tstmt_key")
            .with_base_url(BASE)
    }

    fn result(title: &str) -> TestResult {
        TestResult {
            title: title.to_string(),
            test_id: None,
            suite_title: "LoginTest".to_string(),
            file: "LoginTest.java".to_string(),
            status: TestStatus::Passed,
            message: Some("Test finished with status: passed".to_string()),
            stack: None,
        }
    }

    fn body_json(request: &Request) -> Value {
        serde_json::from_str(&request.body).unwrap()
    }

    #[test]
    fn test_create_run_stores_uid() {
        let transport = Arc::new(FakeTransport::accepting("abc123"));
        let mut controller = RunController::new(config(), transport.clone());

        assert_eq!(controller.create_run("com.example").unwrap(), "abc123");
        assert_eq!(controller.state(), RunState::Created);
        assert_eq!(controller.uid(), Some("abc123"));

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(requests[0].url, format!("{}?api_key=tstmt_key", BASE));
        assert_eq!(requests[0].timeout, std::time::Duration::from_secs(10));
        assert_eq!(body_json(&requests[0])["title"], "com.example");
    }

    #[test]
    fn test_create_run_empty_title_uses_fallback() {
        let transport = Arc::new(FakeTransport::accepting("abc123"));
        let mut controller = RunController::new(config(), transport.clone());

        controller.create_run("").unwrap();

        let requests = transport.requests();
        assert_eq!(body_json(&requests[0])["title"], "JUnit Test Run (stub-case)");
        assert_eq!(controller.run().title, FALLBACK_RUN_TITLE);
    }

    #[test]
    fn test_create_run_without_api_key() {
        let transport = Arc::new(FakeTransport::accepting("abc123"));
        let mut controller =
            RunController::new(ReporterConfig::default().with_base_url(BASE), transport.clone());

        let err = controller.create_run("com.example").unwrap_err();
        assert!(matches!(err, ReporterError::Configuration(_)));
        assert_eq!(controller.state(), RunState::Uninitialized);
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_create_run_http_error_aborts() {
        let transport = FakeTransport::new(|_| Ok(status(401, "Unauthorized")));
        let mut controller = RunController::new(config(), transport);

        let err = controller.create_run("com.example").unwrap_err();
        assert!(matches!(err, ReporterError::Remote { status: 401, .. }));
        assert_eq!(controller.state(), RunState::Aborted);
        assert!(controller.uid().is_none());
    }

    #[test]
    fn test_create_run_without_uid_aborts() {
        let transport = FakeTransport::new(|_| Ok(ok(r#"{"url":"https://app/runs/1"}"#)));
        let mut controller = RunController::new(config(), transport);

        let err = controller.create_run("com.example").unwrap_err();
        assert!(matches!(err, ReporterError::Decode(_)));
        assert_eq!(controller.state(), RunState::Aborted);
    }

    #[test]
    fn test_create_run_transport_failure_aborts() {
        let mut controller = RunController::new(config(), FakeTransport::unreachable());

        let err = controller.create_run("com.example").unwrap_err();
        assert!(matches!(err, ReporterError::Transport(_)));
        assert_eq!(controller.state(), RunState::Aborted);
    }

    #[test]
    fn test_create_run_twice_is_rejected() {
        let transport = Arc::new(FakeTransport::accepting("abc123"));
        let mut controller = RunController::new(config(), transport.clone());
        controller.create_run("a").unwrap();

        let err = controller.create_run("b").unwrap_err();
        assert!(matches!(err, ReporterError::InvalidState { .. }));
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn test_report_before_create_is_noop() {
        let transport = Arc::new(FakeTransport::accepting("abc123"));
        let controller = RunController::new(config(), transport.clone());

        let outcome = controller.report_result(&result("testLogin")).unwrap();
        assert_eq!(outcome, ReportOutcome::Skipped);
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_report_after_abort_is_noop() {
        let mut controller = RunController::new(config(), FakeTransport::unreachable());
        let _ = controller.create_run("x");

        let outcome = controller.report_result(&result("testLogin")).unwrap();
        assert_eq!(outcome, ReportOutcome::Skipped);
    }

    #[test]
    fn test_report_result_posts_to_run() {
        let transport = Arc::new(FakeTransport::accepting("abc123"));
        let mut controller = RunController::new(config(), transport.clone());
        controller.create_run("x").unwrap();

        let outcome = controller.report_result(&result("testLogin")).unwrap();
        assert_eq!(outcome, ReportOutcome::Delivered);

        let requests = transport.requests();
        let report = &requests[1];
        assert_eq!(report.method, Method::Post);
        assert_eq!(
            report.url,
            format!("{}/abc123/testrun?api_key=tstmt_key", BASE)
        );
        let body = body_json(report);
        assert_eq!(body["title"], "testLogin");
        assert!(body["testId"].is_null());
    }

    #[test]
    fn test_report_failure_keeps_state() {
        let transport = FakeTransport::new(|request| {
            if request.url.contains("/testrun") {
                Ok(status(500, "Internal Server Error"))
            } else {
                Ok(ok(r#"{"uid":"abc123"}"#))
            }
        });
        let mut controller = RunController::new(config(), transport);
        controller.create_run("x").unwrap();

        let err = controller.report_result(&result("testLogin")).unwrap_err();
        assert!(matches!(err, ReporterError::Remote { status: 500, .. }));
        assert_eq!(controller.state(), RunState::Created);
        assert!(controller.finish_run(1.0).is_ok());
    }

    #[test]
    fn test_concurrent_reports() {
        let transport = Arc::new(FakeTransport::accepting("abc123"));
        let mut controller = RunController::new(config(), transport.clone());
        controller.create_run("x").unwrap();

        let controller = &controller;
        std::thread::scope(|scope| {
            for worker in 0..4 {
                scope.spawn(move || {
                    for i in 0..5 {
                        let outcome = controller
                            .report_result(&result(&format!("test_{}_{}", worker, i)))
                            .unwrap();
                        assert_eq!(outcome, ReportOutcome::Delivered);
                    }
                });
            }
        });

        assert_eq!(transport.requests().len(), 1 + 20);
    }

    #[test]
    fn test_finish_run() {
        let transport = Arc::new(FakeTransport::accepting("abc123"));
        let mut controller = RunController::new(config(), transport.clone());
        controller.create_run("x").unwrap();

        controller.finish_run(2.345).unwrap();
        assert_eq!(controller.state(), RunState::Finished);

        let requests = transport.requests();
        let finish = requests.last().unwrap();
        assert_eq!(finish.method, Method::Put);
        assert_eq!(finish.url, format!("{}/abc123?api_key=tstmt_key", BASE));
        assert_eq!(finish.body, r#"{"status_event":"finish","duration":2.345}"#);
    }

    #[test]
    fn test_finish_twice_is_rejected() {
        let transport = Arc::new(FakeTransport::accepting("abc123"));
        let mut controller = RunController::new(config(), transport.clone());
        controller.create_run("x").unwrap();
        controller.finish_run(1.0).unwrap();

        let err = controller.finish_run(1.0).unwrap_err();
        assert!(matches!(
            err,
            ReporterError::InvalidState {
                state: RunState::Finished,
                expected: RunState::Created
            }
        ));
        assert_eq!(transport.requests().len(), 2);
    }

    #[test]
    fn test_finish_rejects_bad_duration() {
        let transport = Arc::new(FakeTransport::accepting("abc123"));
        let mut controller = RunController::new(config(), transport.clone());
        controller.create_run("x").unwrap();

        for duration in [f64::NAN, f64::INFINITY, -1.0] {
            let err = controller.finish_run(duration).unwrap_err();
            assert!(matches!(err, ReporterError::InvalidDuration(_)));
        }
        assert_eq!(controller.state(), RunState::Created);
        assert_eq!(transport.requests().len(), 1);

        controller.finish_run(0.0).unwrap();
        assert_eq!(controller.state(), RunState::Finished);
    }

    #[test]
    fn test_finish_without_run_is_rejected() {
        let transport = Arc::new(FakeTransport::accepting("abc123"));
        let mut controller = RunController::new(config(), transport.clone());

        assert!(controller.finish().is_err());
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_finish_failure_stays_created() {
        let transport = FakeTransport::new(|request| match request.method {
            Method::Put => Ok(status(404, "Not Found")),
            Method::Post => Ok(ok(r#"{"uid":"abc123"}"#)),
        });
        let mut controller = RunController::new(config(), transport);
        controller.create_run("x").unwrap();

        let err = controller.finish_run(1.5).unwrap_err();
        assert!(matches!(err, ReporterError::Remote { status: 404, .. }));
        assert_eq!(controller.state(), RunState::Created);
    }

    #[test]
    fn test_uid_is_escaped_in_path() {
        let transport = Arc::new(FakeTransport::accepting("a/b c"));
        let mut controller = RunController::new(config(), transport.clone());
        controller.create_run("x").unwrap();
        controller.finish_run(0.5).unwrap();

        let requests = transport.requests();
        assert_eq!(
            requests[1].url,
            format!("{}/a%2Fb%20c?api_key=tstmt_key", BASE)
        );
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact("https://h/api/reporter?api_key=secret"), "https://h/api/reporter");
        assert_eq!(redact("https://h/api/reporter"), "https://h/api/reporter");
    }
}
