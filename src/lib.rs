pub mod error;
pub mod report;
pub mod runner;
pub mod transport;
pub mod utils;

// Re-export common items
pub use error::{ReporterError, Result};
pub use report::{TestResult, TestStatus};
pub use runner::{run_batch, BatchListener, ReportingListener, RunController, RunState};
pub use transport::{HttpTransport, Transport};
pub use utils::config::ReporterConfig;
