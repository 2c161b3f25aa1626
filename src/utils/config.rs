use std::time::Duration;

use crate::error::{ReporterError, Result};

/// Environment variable holding the project API key (`tstmt_...`)
pub const API_KEY_ENV: &str = "TESTOMATIO";

/// Optional override for the reporter endpoint
pub const BASE_URL_ENV: &str = "TESTOMATIO_URL";

/// Optional override for the run title
pub const RUN_TITLE_ENV: &str = "TESTOMATIO_TITLE";

pub const DEFAULT_BASE_URL: &str = "https://app.testomat.io/api/reporter";

/// Title sent when the batch has no usable name
pub const FALLBACK_RUN_TITLE: &str = "JUnit Test Run (stub-case)";

pub const DEFAULT_FILE_EXTENSION: &str = ".java";

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Reporter configuration
///
/// Built once (usually with [`ReporterConfig::from_env`]) and handed to the
/// run controller; nothing below this layer reads the environment.
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    /// Project API key, appended to every request as `api_key`
    pub api_key: Option<String>,

    /// Reporter endpoint, without trailing slash
    pub base_url: String,

    /// Timeout applied to every request
    pub timeout: Duration,

    /// Suffix appended to the suite name to build the `file` field
    pub file_extension: String,

    /// Run title that takes precedence over the batch name
    pub run_title: Option<String>,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
            run_title: None,
        }
    }
}

impl ReporterConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self {
            api_key: lookup(API_KEY_ENV),
            ..Self::default()
        };

        if let Some(url) = lookup(BASE_URL_ENV).filter(|u| !u.trim().is_empty()) {
            config = config.with_base_url(url);
        }
        config.run_title = lookup(RUN_TITLE_ENV).filter(|t| !t.trim().is_empty());

        config
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_file_extension(mut self, extension: impl Into<String>) -> Self {
        self.file_extension = extension.into();
        self
    }

    pub fn with_run_title(mut self, title: impl Into<String>) -> Self {
        self.run_title = Some(title.into());
        self
    }

    /// API key, or a configuration error if it is unset or blank
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(ReporterError::Configuration(format!(
                "Environment variable {} is not set",
                API_KEY_ENV
            ))),
        }
    }

    /// Title for a run started by a batch called `batch_name`
    pub fn resolve_run_title(&self, batch_name: &str) -> String {
        if let Some(ref title) = self.run_title {
            return title.clone();
        }
        if batch_name.trim().is_empty() {
            FALLBACK_RUN_TITLE.to_string()
        } else {
            batch_name.to_string()
        }
    }
}
