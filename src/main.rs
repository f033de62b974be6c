//! # Resource Cache Demo
//!
//! Walks one resource through its lifecycle against the in-memory
//! [`FakeServer`]: fetch, cache hit, deferred expiry, refetch, and a failed
//! fetch that keeps the cached data.

use std::rc::Rc;

use resource_cache::lifecycle::Attribute;
use resource_cache::mock::FakeServer;
use resource_cache::resource::{FieldType, Fetch, ResourceDefinition, Schema};
use resource_cache::runtime::{setup_tracing, ResourceConfig, ResourceSystem};
use resource_cache::transport::Method;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let server = FakeServer::new();
    server.respond_with(
        Method::Get,
        "/people/1",
        200,
        r#"{ "id": 1, "name": "Mick Staugaard", "address": { "city": "Copenhagen" } }"#,
    );

    let config = ResourceConfig::default()
        .with_error_handler(|e| error!(status = e.text_status(), error = %e, "Request failed"));
    let system = ResourceSystem::new(Rc::new(server.clone()), config);

    let people = system.define(ResourceDefinition::new(
        "Person",
        "/people",
        Schema::new()
            .field("id", FieldType::Number)
            .field("name", FieldType::String),
    ));

    let person = people.create(1);
    let _watch = person.observe(Attribute::IsFetchable, |snapshot| {
        info!(fetchable = snapshot.is_fetchable, state = %snapshot.state, "Fetchability changed");
    });

    let Fetch::Dispatched(request) = person.fetch() else {
        return Err("first fetch should dispatch".to_owned());
    };
    server.respond();
    request.await.map_err(|e| e.to_string())?;
    info!(name = ?person.get("name"), city = ?person.get("address.city"), "Loaded");

    info!(outcome = ?person.fetch(), "Second fetch while fresh");

    person.expire();
    system.run_loop().run_turn();
    info!(expired = person.is_expired(), "Expired on the next turn");

    server.respond_with(Method::Get, "/people/1", 503, "");
    person.fetch();
    server.respond();
    info!(
        state = %person.state(),
        name = ?person.get("name"),
        "Failed refetch keeps the cached data"
    );

    Ok(())
}
