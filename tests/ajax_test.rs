use std::cell::Cell;
use std::rc::Rc;

use resource_cache::mock::FakeServer;
use resource_cache::runtime::{ResourceConfig, ResourceSystem};
use resource_cache::transport::{Method, RequestDescriptor};

fn system_with(server: &FakeServer) -> ResourceSystem {
    ResourceSystem::new(Rc::new(server.clone()), ResourceConfig::default())
}

#[test]
fn test_passes_an_error_callback_for_descriptors() {
    let server = FakeServer::new();
    let system = system_with(&server);
    system.set_error_handler(|_| {});

    let _ = system.ajax(RequestDescriptor::new("/not/found/1"));

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].has_error);
}

#[test]
fn test_passes_an_error_callback_for_bare_addresses() {
    let server = FakeServer::new();
    let system = system_with(&server);
    system.set_error_handler(|_| {});

    // A bare address is widened into a GET descriptor
    let _ = system.ajax("/not/found/2");

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, "/not/found/2");
    assert_eq!(requests[0].method, Method::Get);
    assert!(requests[0].has_error);
}

#[test]
fn test_passes_an_error_callback_without_a_handler() {
    let server = FakeServer::new();
    let system = system_with(&server);

    let _ = system.ajax("/not/found/3");
    assert!(server.requests()[0].has_error);

    // Nothing is configured to hear about it, and nothing breaks.
    assert_eq!(server.respond(), 1);
}

#[tokio::test]
async fn test_routes_failures_to_the_handler_and_the_caller() {
    let server = FakeServer::new();
    let system = system_with(&server);
    let handled = Rc::new(Cell::new(0));
    let own = Rc::new(Cell::new(0));

    let counter = handled.clone();
    system.set_error_handler(move |e| {
        assert_eq!(e.status(), Some(404));
        counter.set(counter.get() + 1);
    });
    let counter = own.clone();
    let request = system.ajax(RequestDescriptor::new("/not/found/4").on_error(move |_| counter.set(counter.get() + 1)));

    // Unknown route answers 404; both callbacks run once
    server.respond();
    assert!(request.await.is_err());
    assert_eq!((handled.get(), own.get()), (1, 1));
}

#[tokio::test]
async fn test_success_does_not_touch_the_handler() {
    let server = FakeServer::new();
    server.respond_with(Method::Get, "/people/1", 200, r#"{"id": 1}"#);
    let system = system_with(&server);
    let handled = Rc::new(Cell::new(false));
    let flag = handled.clone();
    system.set_error_handler(move |_| flag.set(true));

    let request = system.ajax("/people/1");
    server.respond();

    let response = request.await.expect("request should succeed");
    assert_eq!(response.status, 200);
    assert!(!handled.get());
}
