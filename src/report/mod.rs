pub mod codec;
pub mod junit;
pub mod mapper;
pub mod types;

pub use junit::{load_junit, parse_junit_xml};
pub use mapper::ResultMapper;
pub use types::{TestResult, TestStatus};
