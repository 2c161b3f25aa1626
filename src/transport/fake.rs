use std::sync::Mutex;

use super::{Request, Response, Transport};
use crate::error::{ReporterError, Result};

type Handler = Box<dyn Fn(&Request) -> Result<Response> + Send + Sync>;

/// Transport that records every request and answers through a closure
pub(crate) struct FakeTransport {
    handler: Handler,
    requests: Mutex<Vec<Request>>,
}

impl FakeTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&Request) -> Result<Response> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers 200 everywhere; creation returns `uid`
    pub fn accepting(uid: &str) -> Self {
        let body = format!(r#"{{"uid":"{}"}}"#, uid);
        Self::new(move |_| Ok(ok(&body)))
    }

    /// Every call fails at the transport level
    pub fn unreachable() -> Self {
        Self::new(|_| Err(ReporterError::Transport("connection refused".to_string())))
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for FakeTransport {
    fn send(&self, request: &Request) -> Result<Response> {
        self.requests.lock().unwrap().push(request.clone());
        (self.handler)(request)
    }
}

pub(crate) fn ok(body: &str) -> Response {
    Response {
        status: 200,
        body: body.to_string(),
    }
}

pub(crate) fn status(code: u16, body: &str) -> Response {
    Response {
        status: code,
        body: body.to_string(),
    }
}
