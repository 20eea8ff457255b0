//! Scripted in-memory transport for tests.
//!
//! Responses are queued per `(method, url)` and consumed in order. The last
//! queued response for a route keeps being returned once the rest are used
//! up. Routes with nothing queued answer 404. Every request is recorded.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde_json::Value as Json;

use crate::error::{TransportError, error_for_status};
use crate::request::{Method, Request, Response};
use crate::{BoxFuture, Transport};

#[derive(Debug, Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<(u16, Json)>>>,
    requests: Mutex<Vec<Request>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `method url` (query string excluded).
    pub fn respond(&self, method: Method, url: &str, status: u16, body: Json) -> &Self {
        self.routes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry((method, url.to_string()))
            .or_default()
            .push_back((status, body));
        self
    }

    /// Drop every queued response for `method url`.
    pub fn clear(&self, method: Method, url: &str) {
        self.routes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&(method, url.to_string()));
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn count(&self, method: Method) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method)
            .count()
    }

    /// Requests that would have changed remote state.
    pub fn mutating_requests(&self) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| r.method.is_mutating())
            .collect()
    }

    fn next_response(&self, request: &Request) -> (u16, Json) {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        let key = (request.method, request.url.clone());
        match routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or((404, Json::Null)),
            None => (404, Json::Null),
        }
    }
}

impl Transport for FakeTransport {
    fn send<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, Result<Response, TransportError>> {
        Box::pin(async move {
            self.requests
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(request.clone());

            let (status, body) = self.next_response(request);
            let body = if body.is_null() {
                Vec::new()
            } else {
                body.to_string().into_bytes()
            };
            if let Some(err) = error_for_status(status, &request.url, &body) {
                return Err(err);
            }
            Ok(Response { status, body })
        })
    }
}
