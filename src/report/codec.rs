//! JSON bodies exchanged with the reporter API

use serde::Serialize;
use serde_json::Value;

use super::types::TestResult;
use crate::error::{ReporterError, Result};

/// Field of the create-run response carrying the run identifier
pub const UID_FIELD: &str = "uid";

const STATUS_EVENT_FINISH: &str = "finish";

#[derive(Serialize)]
struct CreateRunBody<'a> {
    title: &'a str,
}

#[derive(Serialize)]
struct FinishRunBody<'a> {
    status_event: &'a str,
    duration: f64,
}

/// Body of `POST /reporter/{uid}/testrun`
pub fn encode_result(result: &TestResult) -> Result<String> {
    Ok(serde_json::to_string(result)?)
}

/// Body of `POST /reporter`
pub fn encode_create_run(title: &str) -> Result<String> {
    Ok(serde_json::to_string(&CreateRunBody { title })?)
}

/// Body of `PUT /reporter/{uid}`
pub fn encode_finish(duration_secs: f64) -> Result<String> {
    Ok(serde_json::to_string(&FinishRunBody {
        status_event: STATUS_EVENT_FINISH,
        duration: duration_secs,
    })?)
}

/// Extract the run uid from a create-run response
///
/// `Ok(None)` when the document is valid JSON without a usable `uid`
/// (missing, null, an object or an array);
/// `Err(Decode)` when it is not JSON at all.
pub fn decode_run_uid(body: &str) -> Result<Option<String>> {
    let root: Value = serde_json::from_str(body)
        .map_err(|e| ReporterError::Decode(format!("invalid create-run response: {}", e)))?;

    Ok(match root.get(UID_FIELD) {
        None | Some(Value::Null) => None,
        Some(Value::String(uid)) => Some(uid.clone()),
        Some(scalar @ (Value::Bool(_) | Value::Number(_))) => Some(scalar.to_string()),
        Some(Value::Object(_) | Value::Array(_)) => None,
    })
}
