//! Scripted in-memory transport for in-crate tests.

use crate::error::{Error, Result};
use crate::transport::{Body, Method, Request, Response, Transport};
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Instant;

/// Replays canned responses in order and records every request it sees.
///
/// Each scripted response is matched against a URL substring so a test fails
/// loudly when the call sequence drifts.
#[derive(Default)]
pub(crate) struct FakeTransport {
    script: Mutex<VecDeque<(String, Response)>>,
    pub requests: Mutex<Vec<(Request, Instant)>>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(self, url_part: &str, status: u16, body: &str) -> Self {
        self.respond_bytes(url_part, status, body.as_bytes().to_vec(), None)
    }

    pub(crate) fn respond_json(self, url_part: &str, status: u16, body: serde_json::Value) -> Self {
        self.respond(url_part, status, &body.to_string())
    }

    pub(crate) fn respond_length(self, url_part: &str, length: u64) -> Self {
        self.respond_bytes(url_part, 200, Vec::new(), Some(length))
    }

    pub(crate) fn respond_bytes(
        self,
        url_part: &str,
        status: u16,
        body: Vec<u8>,
        content_length: Option<u64>,
    ) -> Self {
        let response = Response {
            status: StatusCode::from_u16(status).unwrap(),
            content_length,
            body,
        };
        self.script
            .lock()
            .unwrap()
            .push_back((url_part.to_string(), response));
        self
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn request(&self, index: usize) -> Request {
        self.requests.lock().unwrap()[index].0.clone()
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(r, _)| r.url.clone())
            .collect()
    }

    pub(crate) fn instants(&self) -> Vec<Instant> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, at)| *at)
            .collect()
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.script.lock().unwrap().is_empty()
    }

    pub(crate) fn json_body(&self, index: usize) -> serde_json::Value {
        match self.request(index).body {
            Body::Json(value) => value,
            other => panic!("request {} has no JSON body: {:?}", index, other),
        }
    }
}

impl Transport for FakeTransport {
    async fn execute(&self, request: Request) -> Result<Response> {
        let (url_part, response) = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected request: {:?} {}", request.method, request.url));
        assert!(
            request.url.contains(&url_part),
            "expected a request to {}, got {:?} {}",
            url_part,
            request.method,
            request.url
        );
        if request.method == Method::Head {
            assert!(matches!(request.body, Body::Empty));
        }
        self.requests
            .lock()
            .unwrap()
            .push((request, Instant::now()));
        Ok(response)
    }
}

/// Transport whose every call fails as if the network were down.
pub(crate) struct OfflineTransport;

impl Transport for OfflineTransport {
    async fn execute(&self, request: Request) -> Result<Response> {
        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            format!("offline: {}", request.url),
        )))
    }
}
