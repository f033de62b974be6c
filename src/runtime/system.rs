use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::lifecycle::Expiry;
use crate::resource::{Resource, ResourceDefinition, ResourceType, TypeRef};
use crate::run_loop::RunLoop;
use crate::transport::{ajax, ErrorHandler, Request, Transport, TransportError, TransportFuture};

/// Swappable settings shared by every resource of a [`ResourceSystem`].
///
/// `ResourceConfig::default()` is the only place that reaches for the shared
/// per-thread [`SystemClock`]; everything below it receives the clock through
/// this struct.
#[derive(Clone)]
pub struct ResourceConfig {
    /// Called for every failed request. `None` swallows failures.
    pub error_handler: Option<ErrorHandler>,
    /// Source of "now" for expiry decisions.
    pub clock: Rc<dyn Clock>,
    /// Expiry applied after each successful fetch.
    pub ttl: Expiry,
}

impl ResourceConfig {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            error_handler: None,
            clock,
            ttl: Expiry::default(),
        }
    }

    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_ttl(mut self, ttl: Expiry) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_error_handler(mut self, handler: impl Fn(&TransportError) + 'static) -> Self {
        self.error_handler = Some(Rc::new(handler));
        self
    }
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self::new(SystemClock::shared())
    }
}

impl fmt::Debug for ResourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceConfig")
            .field("error_handler", &self.error_handler.is_some())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

struct SystemInner {
    transport: Rc<dyn Transport>,
    run_loop: RunLoop,
    config: RefCell<ResourceConfig>,
    /// Every type defined so far, for moving timers when the clock changes.
    types: RefCell<Vec<TypeRef>>,
}

/// The composition root of the cache.
///
/// `ResourceSystem` owns the transport, the run loop and the configuration, and
/// hands them to every [`ResourceType`] it defines. Swapping the error handler
/// affects subsequent requests only; requests already in flight keep the handler
/// they were dispatched with. Swapping the clock moves every live resource's
/// expiry timer onto the new clock.
///
/// # Example
///
/// ```ignore
/// let server = FakeServer::new();
/// let system = ResourceSystem::new(Rc::new(server.clone()), ResourceConfig::default());
/// let people = system.define(ResourceDefinition::new("Person", "/people", Schema::new()));
///
/// let person = people.create(1);
/// person.fetch();
/// server.respond();
/// system.run_loop().run_turn();
/// ```
#[derive(Clone)]
pub struct ResourceSystem {
    inner: Rc<SystemInner>,
}

impl ResourceSystem {
    pub fn new(transport: Rc<dyn Transport>, config: ResourceConfig) -> Self {
        info!(?config, "Resource system started");
        Self {
            inner: Rc::new(SystemInner {
                transport,
                run_loop: RunLoop::new(),
                config: RefCell::new(config),
                types: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Define a resource type managed by this system.
    pub fn define(&self, definition: ResourceDefinition) -> ResourceType {
        let resource_type = ResourceType::new(self.clone(), definition);
        self.inner.types.borrow_mut().push(resource_type.downgrade());
        resource_type
    }

    /// Dispatch `request` through the transport with the current error handler.
    pub fn ajax(&self, request: impl Into<Request>) -> TransportFuture {
        let handler = self.error_handler();
        ajax(self.inner.transport.as_ref(), handler, request)
    }

    pub fn run_loop(&self) -> &RunLoop {
        &self.inner.run_loop
    }

    pub fn clock(&self) -> Rc<dyn Clock> {
        self.inner.config.borrow().clock.clone()
    }

    /// Replace the clock and re-arm pending expiry timers on it.
    ///
    /// Resources whose `expire_at` has already passed on the new clock notify
    /// their `is_expired` observers before this returns.
    pub fn set_clock(&self, clock: Rc<dyn Clock>) {
        self.inner.config.borrow_mut().clock = clock;

        let live: Vec<Resource> = {
            let mut types = self.inner.types.borrow_mut();
            types.retain(|t| t.strong_count() > 0);
            types
                .iter()
                .filter_map(|t| t.upgrade())
                .flat_map(|t| t.live_instances())
                .collect()
        };
        debug!(resources = live.len(), "Clock replaced");
        for resource in live {
            resource.rearm_expiry_timer();
        }
    }

    pub fn error_handler(&self) -> Option<ErrorHandler> {
        self.inner.config.borrow().error_handler.clone()
    }

    pub fn set_error_handler(&self, handler: impl Fn(&TransportError) + 'static) {
        debug!("Error handler replaced");
        self.inner.config.borrow_mut().error_handler = Some(Rc::new(handler));
    }

    pub fn clear_error_handler(&self) {
        debug!("Error handler cleared");
        self.inner.config.borrow_mut().error_handler = None;
    }

    pub fn ttl(&self) -> Expiry {
        self.inner.config.borrow().ttl
    }

    pub fn set_ttl(&self, ttl: Expiry) {
        self.inner.config.borrow_mut().ttl = ttl;
    }
}

impl fmt::Debug for ResourceSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceSystem")
            .field("config", &self.inner.config.borrow())
            .field("pending_tasks", &self.inner.run_loop.pending())
            .finish_non_exhaustive()
    }
}
