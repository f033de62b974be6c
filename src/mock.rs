//! # Mock Transport
//!
//! Utilities for testing resources without a network.
//!
//! [`FakeServer`] is a scripted [`Transport`]. Requests are recorded and held
//! pending until the test calls [`FakeServer::respond`], so the window between
//! "fetch issued" and "fetch completed" can be inspected deterministically.
//!
//! ## Example
//!
//! ```ignore
//! let server = FakeServer::new();
//! server.respond_with(Method::Get, "/people/1", 200, r#"{ "id": 1, "name": "Mick Staugaard" }"#);
//!
//! let person = people.create(1);
//! person.fetch();
//! assert_eq!(person.state(), ResourceState::Fetching);
//!
//! server.respond();
//! assert_eq!(person.state(), ResourceState::Fetched);
//! ```
//!
//! Unknown routes answer `404`. When several routes match, the one registered
//! last wins, so a test can override a default response.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::mem;
use std::rc::Rc;

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::debug;

use crate::transport::{
    Method, RequestDescriptor, Response, Transport, TransportError, TransportFuture,
};

/// What a route answers with.
#[derive(Debug, Clone, PartialEq)]
enum Reply {
    Status { status: u16, body: String },
    NetworkError(String),
}

#[derive(Debug, Clone)]
struct Route {
    method: Method,
    url: String,
    reply: Reply,
}

/// A request as the server saw it at dispatch time.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
    pub has_success: bool,
    pub has_error: bool,
}

struct PendingRequest {
    descriptor: RequestDescriptor,
    respond_to: oneshot::Sender<Result<Response, TransportError>>,
}

#[derive(Default)]
struct ServerState {
    routes: Vec<Route>,
    pending: VecDeque<PendingRequest>,
    log: Vec<RecordedRequest>,
}

/// Scripted in-memory transport.
///
/// Cloning yields another handle to the same server, so one clone can be handed
/// to a [`ResourceSystem`](crate::runtime::ResourceSystem) while the test keeps
/// the other.
#[derive(Clone, Default)]
pub struct FakeServer {
    state: Rc<RefCell<ServerState>>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method url` with `status` and a raw JSON `body`.
    pub fn respond_with(&self, method: Method, url: &str, status: u16, body: &str) {
        self.state.borrow_mut().routes.push(Route {
            method,
            url: url.to_owned(),
            reply: Reply::Status {
                status,
                body: body.to_owned(),
            },
        });
    }

    /// Fail `method url` without any response.
    pub fn fail_with(&self, method: Method, url: &str, reason: &str) {
        self.state.borrow_mut().routes.push(Route {
            method,
            url: url.to_owned(),
            reply: Reply::NetworkError(reason.to_owned()),
        });
    }

    /// Complete every pending request. Returns how many were completed.
    ///
    /// Requests dispatched by callbacks while responding stay pending until the
    /// next call.
    pub fn respond(&self) -> usize {
        let pending = mem::take(&mut self.state.borrow_mut().pending);
        let count = pending.len();
        for request in pending {
            self.complete(request);
        }
        count
    }

    /// Every request dispatched so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.borrow().log.clone()
    }

    pub fn pending_count(&self) -> usize {
        self.state.borrow().pending.len()
    }

    fn reply_for(&self, method: Method, url: &str) -> Reply {
        self.state
            .borrow()
            .routes
            .iter()
            .rev()
            .find(|route| route.method == method && route.url == url)
            .map(|route| route.reply.clone())
            .unwrap_or(Reply::Status {
                status: 404,
                body: String::new(),
            })
    }

    fn complete(&self, request: PendingRequest) {
        let PendingRequest {
            descriptor,
            respond_to,
        } = request;
        let url = descriptor.url.clone();

        let outcome = match self.reply_for(descriptor.method, &url) {
            Reply::NetworkError(reason) => Err(TransportError::Network {
                url: url.clone(),
                reason,
            }),
            Reply::Status { status, .. } if !(200..300).contains(&status) => {
                Err(TransportError::Status {
                    url: url.clone(),
                    status,
                })
            }
            Reply::Status { status, body } if body.trim().is_empty() => Ok(Response {
                status,
                body: Value::Null,
            }),
            Reply::Status { status, body } => serde_json::from_str(&body)
                .map(|body| Response { status, body })
                .map_err(|e| TransportError::Parse {
                    url: url.clone(),
                    reason: e.to_string(),
                }),
        };

        debug!(%url, ok = outcome.is_ok(), "Fake server responding");
        match &outcome {
            Ok(response) => {
                if let Some(success) = descriptor.success {
                    success(response);
                }
            }
            Err(error) => {
                if let Some(callback) = descriptor.error {
                    callback(error);
                }
            }
        }
        let _ = respond_to.send(outcome);
    }
}

impl Transport for FakeServer {
    fn request(&self, descriptor: RequestDescriptor) -> TransportFuture {
        let (respond_to, response) = oneshot::channel();
        let url = descriptor.url.clone();
        {
            let mut state = self.state.borrow_mut();
            state.log.push(RecordedRequest {
                method: descriptor.method,
                url: descriptor.url.clone(),
                body: descriptor.body.clone(),
                has_success: descriptor.success.is_some(),
                has_error: descriptor.error.is_some(),
            });
            state.pending.push_back(PendingRequest {
                descriptor,
                respond_to,
            });
        }
        Box::pin(async move {
            response.await.unwrap_or_else(|_| {
                Err(TransportError::Network {
                    url,
                    reason: "fake server dropped the request".to_owned(),
                })
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn holds_requests_until_respond() {
        let server = FakeServer::new();
        server.respond_with(Method::Get, "/people/1", 200, r#"{"id": 1}"#);

        let future = server.request(RequestDescriptor::new("/people/1"));
        assert_eq!(server.pending_count(), 1);

        assert_eq!(server.respond(), 1);
        let response = future.await.unwrap();
        assert_eq!(response.body, serde_json::json!({"id": 1}));
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() {
        let server = FakeServer::new();
        let future = server.request(RequestDescriptor::new("/nowhere"));
        server.respond();
        assert_eq!(future.await.unwrap_err().status(), Some(404));
    }

    #[tokio::test]
    async fn garbled_bodies_are_parse_errors() {
        let server = FakeServer::new();
        server.respond_with(Method::Get, "/people/1", 200, "{ not json");
        let future = server.request(RequestDescriptor::new("/people/1"));
        server.respond();
        assert_eq!(future.await.unwrap_err().text_status(), "parsererror");
    }

    #[test]
    fn latest_route_wins() {
        let server = FakeServer::new();
        server.respond_with(Method::Get, "/people/1", 200, "{}");
        server.fail_with(Method::Get, "/people/1", "connection reset");

        let failed = Rc::new(RefCell::new(None));
        let slot = failed.clone();
        let _ = server.request(
            RequestDescriptor::new("/people/1").on_error(move |e| *slot.borrow_mut() = Some(e.clone())),
        );
        server.respond();

        assert!(matches!(
            failed.borrow().as_ref(),
            Some(TransportError::Network { .. })
        ));
    }
}
