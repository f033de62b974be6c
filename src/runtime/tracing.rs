//! # Observability & Tracing
//!
//! The [`setup_tracing`] function initializes structured logging with the `tracing`
//! crate. The library itself only emits events; installing a subscriber is left to
//! the binary (or to a test that wants to see the logs).
//!
//! ## What Gets Traced
//!
//! - **Resource types**: definition and identity map evictions
//! - **Lifecycle**: every fetch, success, failure and observed attribute change
//! - **Requests**: dispatch through `ajax` and every transport failure
//!
//! ## Usage Examples
//!
//! ```bash
//! # Fetches, successes and failures
//! RUST_LOG=info cargo run
//!
//! # Every lifecycle change with the attributes that moved
//! RUST_LOG=debug cargo run
//!
//! # Clock ticks and run loop turns as well
//! RUST_LOG=trace cargo run
//! ```
//!
//! With `RUST_LOG=debug` a fetch reads like:
//!
//! ```text
//! DEBUG Lifecycle changed resource="Person" id=1 state=FETCHING changed=[ResourceState, IsFetchable]
//! INFO Fetching resource="Person" id=1 url=/people/1
//! DEBUG ajax: Dispatching request url=/people/1 method=GET
//! DEBUG Lifecycle changed resource="Person" id=1 state=FETCHED changed=[ResourceState, ExpireAt, HasBeenFetched]
//! INFO Fetched resource="Person" id=1
//! ```

/// Initializes the tracing subscriber.
///
/// Log verbosity comes from the `RUST_LOG` environment variable. The compact
/// format hides the module path (`with_target(false)`); events carry the
/// resource name and id as fields instead.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
