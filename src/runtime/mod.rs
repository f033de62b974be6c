//! Runtime composition and observability.
//!
//! This module contains the infrastructure that wires the cache together:
//!
//! - **Composition root**: [`ResourceSystem`] owns the transport, the run loop and
//!   the [`ResourceConfig`] (clock, error handler, TTL) and injects them into
//!   every resource type it defines
//! - **Observability setup**: [`setup_tracing`] initializes logging
//!
//! # Main Components
//!
//! - [`ResourceSystem`] - The single place where process-wide defaults are chosen
//! - [`setup_tracing`] - Initializes the tracing/logging infrastructure

pub mod system;
pub mod tracing;

pub use self::system::*;
pub use self::tracing::*;
