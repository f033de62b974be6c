//! Request dispatch wrapper.
//!
//! [`ajax`] is the single entry point through which the cache issues requests. It
//! owns two guarantees:
//!
//! 1. Whatever the caller passed (address or descriptor), the transport receives a
//!    descriptor whose `error` callback is set.
//! 2. That callback forwards to the error handler configured on the
//!    [`ResourceSystem`](crate::runtime::ResourceSystem), so failure instrumentation
//!    lives in one place.

use std::rc::Rc;

use tracing::{debug, instrument, warn};

use super::{Request, Transport, TransportError, TransportFuture};

/// Process-wide failure hook (telemetry, redirect on 401, ...).
pub type ErrorHandler = Rc<dyn Fn(&TransportError)>;

/// Normalize `request` and dispatch it through `transport`.
///
/// The injected `error` callback first runs the caller's own callback, if any,
/// then `error_handler`, if any. With neither, failures are swallowed here and
/// only observable through the returned future.
///
/// The handler is captured now: swapping the configured handler later does not
/// affect requests already dispatched.
#[instrument(skip_all)]
pub fn ajax(
    transport: &dyn Transport,
    error_handler: Option<ErrorHandler>,
    request: impl Into<Request>,
) -> TransportFuture {
    let mut descriptor = request.into().into_descriptor();
    let caller_error = descriptor.error.take();
    let url = descriptor.url.clone();

    descriptor.error = Some(Box::new(move |error: &TransportError| {
        warn!(%url, status = error.text_status(), %error, "Request failed");
        if let Some(callback) = caller_error {
            callback(error);
        }
        if let Some(handler) = error_handler {
            handler(error);
        }
    }));

    debug!(url = %descriptor.url, method = %descriptor.method, "Dispatching request");
    transport.request(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{RequestDescriptor, Response};
    use std::cell::{Cell, RefCell};

    /// Fails every request immediately through the descriptor callback.
    #[derive(Default)]
    struct FailingTransport {
        saw_error_callback: Cell<bool>,
    }

    impl Transport for FailingTransport {
        fn request(&self, descriptor: RequestDescriptor) -> TransportFuture {
            let error = TransportError::Status {
                url: descriptor.url.clone(),
                status: 500,
            };
            self.saw_error_callback.set(descriptor.error.is_some());
            if let Some(callback) = descriptor.error {
                callback(&error);
            }
            Box::pin(async move { Err::<Response, _>(error) })
        }
    }

    #[test]
    fn caller_callback_runs_before_the_handler() {
        let transport = FailingTransport::default();
        let order = Rc::new(RefCell::new(Vec::new()));

        let handler_log = order.clone();
        let handler: ErrorHandler = Rc::new(move |_| handler_log.borrow_mut().push("handler"));

        let caller_log = order.clone();
        let descriptor = RequestDescriptor::new("/boom").on_error(move |_| caller_log.borrow_mut().push("caller"));

        let _ = ajax(&transport, Some(handler), descriptor);
        assert_eq!(*order.borrow(), vec!["caller", "handler"]);
    }

    #[test]
    fn failures_without_a_handler_are_swallowed() {
        let transport = FailingTransport::default();
        let _ = ajax(&transport, None, "/boom");
        assert!(transport.saw_error_callback.get());
    }

    #[tokio::test]
    async fn returns_the_transport_future_unchanged() {
        let transport = FailingTransport::default();
        let result = ajax(&transport, None, "/boom").await;
        assert_eq!(
            result,
            Err(TransportError::Status {
                url: "/boom".into(),
                status: 500
            })
        );
    }
}
