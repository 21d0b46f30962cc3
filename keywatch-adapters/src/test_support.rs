//! In-memory transport used by the adapter tests.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::http::{HttpResponse, HttpTransport};
use crate::AdapterError;

type Responder = dyn Fn(&str, &[u8]) -> Result<HttpResponse, AdapterError> + Send + Sync;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub endpoint: String,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

pub struct StubTransport {
    responder: Box<Responder>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl StubTransport {
    pub fn new(
        responder: impl Fn(&str, &[u8]) -> Result<HttpResponse, AdapterError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request with the same status and body.
    pub fn replying(status: u16, body: &str) -> Self {
        let body = body.as_bytes().to_vec();
        Self::new(move |_, _| Ok(HttpResponse::new(status, body.clone())))
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record(
        &self,
        method: &'static str,
        endpoint: &str,
        body: Vec<u8>,
    ) -> Result<HttpResponse, AdapterError> {
        let response = (self.responder)(endpoint, &body);
        self.requests.lock().unwrap().push(RecordedRequest {
            method,
            endpoint: endpoint.to_string(),
            body,
        });
        response
    }
}

#[async_trait]
impl HttpTransport for StubTransport {
    async fn get(
        &self,
        _cancel: &CancellationToken,
        endpoint: &str,
    ) -> Result<HttpResponse, AdapterError> {
        self.record("GET", endpoint, Vec::new())
    }

    async fn post(
        &self,
        _cancel: &CancellationToken,
        endpoint: &str,
        body: Vec<u8>,
    ) -> Result<HttpResponse, AdapterError> {
        self.record("POST", endpoint, body)
    }
}
