//! # Transport
//!
//! The boundary between the cache and whatever actually talks to the network.
//!
//! The crate never performs I/O itself. A [`Transport`] receives a
//! [`RequestDescriptor`], dispatches it immediately, and later reports the outcome
//! twice: once through the descriptor's `success`/`error` callbacks, and once
//! by resolving the returned [`TransportFuture`]. Callers that only care about the
//! side effects (like [`crate::resource::Resource::fetch`]) may drop the future.
//!
//! Requests enter through [`ajax`], which normalizes a bare address or a full
//! descriptor into one canonical descriptor and makes sure every failure reaches
//! the configured error handler.

pub mod ajax;
pub mod error;

pub use ajax::*;
pub use error::*;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Called with the decoded response of a successful request.
pub type SuccessCallback = Box<dyn FnOnce(&Response)>;

/// Called with the failure of an unsuccessful request.
pub type ErrorCallback = Box<dyn FnOnce(&TransportError)>;

/// Completion of a dispatched request.
pub type TransportFuture = Pin<Box<dyn Future<Output = Result<Response, TransportError>>>>;

/// HTTP verb of a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

/// Canonical request handed to a [`Transport`].
pub struct RequestDescriptor {
    pub url: String,
    pub method: Method,
    pub body: Option<Value>,
    pub success: Option<SuccessCallback>,
    pub error: Option<ErrorCallback>,
}

impl RequestDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::default(),
            body: None,
            success: None,
            error: None,
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn on_success(mut self, callback: impl FnOnce(&Response) + 'static) -> Self {
        self.success = Some(Box::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl FnOnce(&TransportError) + 'static) -> Self {
        self.error = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("body", &self.body)
            .field("success", &self.success.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

/// What callers may pass to [`ajax`]: a bare address or a full descriptor.
#[derive(Debug)]
pub enum Request {
    Address(String),
    Descriptor(RequestDescriptor),
}

impl Request {
    pub fn into_descriptor(self) -> RequestDescriptor {
        match self {
            Request::Address(url) => RequestDescriptor::new(url),
            Request::Descriptor(descriptor) => descriptor,
        }
    }
}

impl From<&str> for Request {
    fn from(url: &str) -> Self {
        Request::Address(url.to_owned())
    }
}

impl From<String> for Request {
    fn from(url: String) -> Self {
        Request::Address(url)
    }
}

impl From<RequestDescriptor> for Request {
    fn from(descriptor: RequestDescriptor) -> Self {
        Request::Descriptor(descriptor)
    }
}

/// Something that can carry a request to a remote source.
///
/// # Contract
///
/// - The request is dispatched when `request` is called, not when the returned
///   future is first polled.
/// - On completion the transport invokes exactly one of `descriptor.success` or
///   `descriptor.error` (when present) and resolves the future with the same
///   outcome.
/// - Timeouts are the transport's responsibility; a request that never completes
///   leaves its resource fetching forever.
pub trait Transport {
    fn request(&self, descriptor: RequestDescriptor) -> TransportFuture;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_normalizes_to_a_get_descriptor() {
        let descriptor = Request::from("/people/1").into_descriptor();
        assert_eq!(descriptor.url, "/people/1");
        assert_eq!(descriptor.method, Method::Get);
        assert!(descriptor.success.is_none());
        assert!(descriptor.error.is_none());
    }

    #[test]
    fn descriptor_passes_through_untouched() {
        let descriptor = RequestDescriptor::new("/people")
            .with_method(Method::Post)
            .with_body(serde_json::json!({"name": "Mick"}))
            .on_success(|_| {});
        let normalized = Request::from(descriptor).into_descriptor();
        assert_eq!(normalized.method, Method::Post);
        assert!(normalized.body.is_some());
        assert!(normalized.success.is_some());
    }
}
