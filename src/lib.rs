//! # Resource Cache
//!
//! > **Lazily fetched, self-expiring records for single-threaded clients.**
//!
//! This crate manages record-like objects that are populated from a remote source
//! on demand, remember when their data goes stale, and tell interested observers
//! when that happens.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Why a lifecycle per resource?
//!
//! Each instance owns a small state machine (`UNFETCHED → FETCHING → FETCHED`, with
//! `ERROR` for failed attempts) plus an `expire_at` timestamp. From those two
//! facts everything else is derived: whether the data is expired, whether a new
//! fetch may go out, and whether the resource has ever been loaded. Because
//! `FETCHING` is never fetchable, a resource can have at most one request in
//! flight no matter how many callers ask for it.
//!
//! ### Why no global state?
//!
//! The clock, the error handler and the TTL policy are injected through
//! [`ResourceConfig`](runtime::ResourceConfig) into a
//! [`ResourceSystem`](runtime::ResourceSystem). Tests swap in a
//! [`VirtualClock`](clock::VirtualClock) and a [`FakeServer`](mock::FakeServer)
//! and get fully deterministic behavior.
//!
//! ## 🚀 Core Concepts
//!
//! ### Single-threaded and cooperative
//! Everything runs on one thread with `Rc`/`RefCell`; there are no locks. Deferred
//! work goes on an explicit [`RunLoop`](run_loop::RunLoop) that the host drains
//! each turn.
//!
//! ### Copy, never alias
//! Fetched payloads are merged with [`deep_set`](deep_set::deep_set), which always
//! writes a structural copy. No two resources ever share nested data.
//!
//! ### One place for failures
//! All requests go through [`ajax`](transport::ajax), which guarantees an error
//! callback and routes every failure to the configured error handler. Callers of
//! `fetch()` never see transport errors directly.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Engine ([`lifecycle`], [`resource`])
//! - **Role**: The state machine and the instances built around it.
//! - **Key items**: [`Lifecycle`](lifecycle::Lifecycle),
//!   [`Resource`](resource::Resource), [`ResourceType`](resource::ResourceType).
//!
//! ### 2. Time ([`clock`], [`run_loop`])
//! - **Role**: "Now", timers, and deferred tasks.
//!
//! ### 3. The Boundary ([`transport`], [`mock`])
//! - **Role**: Request normalization, error routing and a scripted test server.
//!
//! ### 4. The Orchestrator ([`runtime`])
//! - **Role**: Wires transport, configuration and run loop together.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Run the demo with info logs
//! RUST_LOG=info cargo run
//!
//! # Run the tests
//! cargo test
//! ```

pub mod clock;
pub mod deep_set;
pub mod lifecycle;
pub mod mock;
pub mod resource;
pub mod run_loop;
pub mod runtime;
pub mod transport;
