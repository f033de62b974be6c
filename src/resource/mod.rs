//! # Resource Instances
//!
//! A [`Resource`] is an addressable record that is populated lazily from a
//! remote source. It composes three things:
//!
//! - an identity ([`ResourceId`]) and a JSON data payload,
//! - a [`Lifecycle`] that decides whether a fetch may go out,
//! - observer lists so dependents learn about lifecycle changes without polling.
//!
//! Resources are created through a [`ResourceType`], which keeps one instance per
//! id. `Resource` itself is a cheap handle; clones share the same instance.
//!
//! ## Change notification
//!
//! Every transition takes a [`Snapshot`] before and after, and observers of the
//! attributes that differ are called synchronously once the transition is
//! complete. Time passing on its own is picked up through a clock timer armed at
//! `expire_at`, so `is_expired` observers fire on the clock tick that crosses it.
//!
//! ## Destruction
//!
//! [`Resource::destroy`] drops observers and evicts the instance from its type's
//! identity map. Afterwards `fetch`, `expire` and `expire_now` are silent no-ops,
//! and late transport completions are ignored.

pub mod definition;
pub mod error;
pub mod observe;

pub use definition::*;
pub use error::*;
pub use observe::*;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::clock::{Clock, TimerId, Timestamp};
use crate::deep_set::{deep_get, deep_merge, deep_set};
use crate::lifecycle::{Attribute, Lifecycle, ResourceState, Snapshot};
use crate::runtime::ResourceSystem;
use crate::transport::{RequestDescriptor, Response, TransportError, TransportFuture};

/// What a call to [`Resource::fetch`] did.
pub enum Fetch {
    /// A request went out. The future resolves once the transport completes,
    /// after the resource has already transitioned.
    Dispatched(TransportFuture),
    /// A fetch was already in flight; nothing new was sent.
    InFlight,
    /// The cached data is fetched and not expired.
    Fresh,
    /// The resource has been destroyed.
    Destroyed,
}

impl Fetch {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, Fetch::Dispatched(_))
    }
}

impl fmt::Debug for Fetch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fetch::Dispatched(_) => f.write_str("Dispatched"),
            Fetch::InFlight => f.write_str("InFlight"),
            Fetch::Fresh => f.write_str("Fresh"),
            Fetch::Destroyed => f.write_str("Destroyed"),
        }
    }
}

struct ResourceInner {
    id: ResourceId,
    url: String,
    system: ResourceSystem,
    resource_type: TypeRef,
    data: RefCell<Map<String, Value>>,
    lifecycle: RefCell<Lifecycle>,
    /// Last snapshot observers were told about.
    notified: Cell<Snapshot>,
    observers: RefCell<Observers>,
    destroyed: Cell<bool>,
    /// The pending timer for `expire_at`, if one is armed.
    expiry_timer: RefCell<Option<ArmedTimer>>,
}

/// A timer id together with the clock that issued it.
struct ArmedTimer {
    clock: Rc<dyn Clock>,
    id: TimerId,
}

/// Handle to a resource instance.
#[derive(Clone)]
pub struct Resource {
    inner: Rc<ResourceInner>,
}

impl Resource {
    pub(crate) fn new(
        id: ResourceId,
        url: String,
        data: Map<String, Value>,
        system: ResourceSystem,
        resource_type: TypeRef,
    ) -> Self {
        let lifecycle = Lifecycle::new();
        let snapshot = lifecycle.snapshot(system.clock().now());
        Self {
            inner: Rc::new(ResourceInner {
                id,
                url,
                system,
                resource_type,
                data: RefCell::new(data),
                lifecycle: RefCell::new(lifecycle),
                notified: Cell::new(snapshot),
                observers: RefCell::new(Observers::default()),
                destroyed: Cell::new(false),
                expiry_timer: RefCell::new(None),
            }),
        }
    }

    fn kind(&self) -> String {
        self.inner
            .resource_type
            .upgrade()
            .map(|t| t.definition.name.clone())
            .unwrap_or_default()
    }

    pub fn id(&self) -> &ResourceId {
        &self.inner.id
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    // --- Lifecycle attributes ---

    pub fn state(&self) -> ResourceState {
        self.inner.lifecycle.borrow().state()
    }

    pub fn expire_at(&self) -> Option<Timestamp> {
        self.inner.lifecycle.borrow().expire_at()
    }

    pub fn has_been_fetched(&self) -> bool {
        self.inner.lifecycle.borrow().has_been_fetched()
    }

    pub fn is_expired(&self) -> bool {
        let now = self.inner.system.clock().now();
        self.inner.lifecycle.borrow().is_expired(now)
    }

    pub fn is_fetchable(&self) -> bool {
        if self.inner.destroyed.get() {
            return false;
        }
        let now = self.inner.system.clock().now();
        self.inner.lifecycle.borrow().is_fetchable(now)
    }

    pub fn snapshot(&self) -> Snapshot {
        let now = self.inner.system.clock().now();
        self.inner.lifecycle.borrow().snapshot(now)
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    // --- Data ---

    /// A copy of the whole data payload.
    pub fn data(&self) -> Map<String, Value> {
        self.inner.data.borrow().clone()
    }

    /// A copy of the value at dotted `path`.
    pub fn get(&self, path: &str) -> Option<Value> {
        deep_get(&self.inner.data.borrow(), path).cloned()
    }

    /// Copy `value` into the payload at dotted `path`.
    pub fn set(&self, path: &str, value: &Value) {
        if self.inner.destroyed.get() {
            return;
        }
        deep_set(&mut self.inner.data.borrow_mut(), path, value);
    }

    pub(crate) fn assign(&self, attributes: &Map<String, Value>) {
        deep_merge(&mut self.inner.data.borrow_mut(), attributes);
    }

    // --- Operations ---

    /// Fetch the resource if it is fetchable.
    ///
    /// Transitions to `FETCHING` before returning, so a second call made before
    /// the transport completes returns [`Fetch::InFlight`] without sending
    /// anything. Transport failures never surface here; they land in the
    /// configured error handler and leave the resource in `ERROR`.
    pub fn fetch(&self) -> Fetch {
        if self.inner.destroyed.get() {
            debug!(id = %self.inner.id, "Fetch on destroyed resource ignored");
            return Fetch::Destroyed;
        }
        if self.state() == ResourceState::Fetching {
            debug!(resource = %self.kind(), id = %self.inner.id, "Fetch already in flight");
            return Fetch::InFlight;
        }
        if !self.transition(|lifecycle, now| lifecycle.begin_fetch(now)) {
            debug!(resource = %self.kind(), id = %self.inner.id, "Data is fresh, skipping fetch");
            return Fetch::Fresh;
        }

        info!(resource = %self.kind(), id = %self.inner.id, url = %self.inner.url, "Fetching");
        let on_success = Rc::downgrade(&self.inner);
        let on_error = Rc::downgrade(&self.inner);
        let descriptor = RequestDescriptor::new(self.inner.url.clone())
            .on_success(move |response| {
                if let Some(inner) = on_success.upgrade() {
                    Resource { inner }.fetch_succeeded(response);
                }
            })
            .on_error(move |error| {
                if let Some(inner) = on_error.upgrade() {
                    Resource { inner }.fetch_failed(error);
                }
            });

        Fetch::Dispatched(self.inner.system.ajax(descriptor))
    }

    /// Expire the data on the next run loop turn.
    ///
    /// Reads made before the turn still see the current expiry.
    pub fn expire(&self) {
        if self.inner.destroyed.get() {
            return;
        }
        let weak = Rc::downgrade(&self.inner);
        self.inner.system.run_loop().schedule(move || {
            if let Some(inner) = weak.upgrade() {
                Resource { inner }.expire_now();
            }
        });
    }

    /// Expire the data immediately, notifying observers before returning.
    pub fn expire_now(&self) {
        if self.inner.destroyed.get() {
            return;
        }
        debug!(resource = %self.kind(), id = %self.inner.id, "Expiring now");
        self.transition(|lifecycle, now| lifecycle.set_expire_at(Some(now)));
    }

    /// Expire the data `ttl` from now.
    ///
    /// A `ttl` too large to represent as an instant clears the expiry instead.
    pub fn expire_in(&self, ttl: Duration) {
        let at = self.inner.system.clock().now().checked_add(ttl);
        self.set_expire_at(at);
    }

    /// Set `expire_at` explicitly. `None` means the data never expires.
    pub fn set_expire_at(&self, expire_at: Option<Timestamp>) {
        if self.inner.destroyed.get() {
            return;
        }
        self.transition(|lifecycle, _| lifecycle.set_expire_at(expire_at));
    }

    /// Expire now and fetch again.
    pub fn refresh(&self) -> Fetch {
        if self.state() != ResourceState::Fetching {
            self.expire_now();
        }
        self.fetch()
    }

    /// Tear the instance down. Idempotent.
    pub fn destroy(&self) {
        if self.inner.destroyed.replace(true) {
            return;
        }
        self.inner.observers.borrow_mut().clear();
        self.cancel_expiry_timer();
        if let Some(resource_type) = self.inner.resource_type.upgrade() {
            resource_type.evict(&self.inner.id);
        }
        info!(resource = %self.kind(), id = %self.inner.id, "Destroyed");
    }

    /// Call `callback` whenever `attribute` changes.
    pub fn observe(&self, attribute: Attribute, callback: impl Fn(&Snapshot) + 'static) -> Subscription {
        let callback: Rc<ObserverFn> = Rc::new(callback);
        if !self.inner.destroyed.get() {
            self.inner.observers.borrow_mut().subscribe(attribute, &callback);
        }
        Subscription::new(callback)
    }

    // --- Transitions ---

    fn fetch_succeeded(&self, response: &Response) {
        if self.inner.destroyed.get() {
            return;
        }
        match &response.body {
            Value::Object(payload) => self.assign(payload),
            Value::Null => {}
            other => warn!(
                resource = %self.kind(),
                id = %self.inner.id,
                payload = %other,
                "Ignoring non-object payload"
            ),
        }
        let ttl = self.inner.system.ttl();
        if self.transition(|lifecycle, now| lifecycle.complete_fetch(now, ttl)) {
            info!(resource = %self.kind(), id = %self.inner.id, "Fetched");
        }
    }

    fn fetch_failed(&self, error: &TransportError) {
        if self.inner.destroyed.get() {
            return;
        }
        if self.transition(|lifecycle, _| lifecycle.fail_fetch()) {
            warn!(resource = %self.kind(), id = %self.inner.id, %error, "Fetch failed");
        }
    }

    /// Apply `change` to the lifecycle, then notify observers of whatever changed.
    fn transition<R>(&self, change: impl FnOnce(&mut Lifecycle, Timestamp) -> R) -> R {
        let now = self.inner.system.clock().now();
        let (result, expire_at_before) = {
            let mut lifecycle = self.inner.lifecycle.borrow_mut();
            let before = lifecycle.expire_at();
            (change(&mut *lifecycle, now), before)
        };
        let after = self.inner.lifecycle.borrow().snapshot(now);
        if after.expire_at != expire_at_before {
            self.arm_expiry_timer(after.expire_at, now);
        }
        self.publish(after);
        result
    }

    /// Re-evaluate time-dependent flags and notify on change.
    fn refresh_flags(&self) {
        let now = self.inner.system.clock().now();
        let snapshot = self.inner.lifecycle.borrow().snapshot(now);
        self.publish(snapshot);
    }

    fn publish(&self, snapshot: Snapshot) {
        let previous = self.inner.notified.replace(snapshot);
        let changed = previous.changed(&snapshot);
        if changed.is_empty() {
            return;
        }
        debug!(
            resource = %self.kind(),
            id = %self.inner.id,
            state = %snapshot.state,
            ?changed,
            "Lifecycle changed"
        );
        let callbacks = self.inner.observers.borrow_mut().collect(&changed);
        for callback in callbacks {
            callback(&snapshot);
        }
    }

    /// Move the expiry timer onto the system's current clock and re-evaluate
    /// time-dependent flags against it.
    pub(crate) fn rearm_expiry_timer(&self) {
        if self.inner.destroyed.get() {
            return;
        }
        let now = self.inner.system.clock().now();
        self.arm_expiry_timer(self.expire_at(), now);
        self.refresh_flags();
    }

    /// Replace any pending expiry timer with one for `expire_at`.
    fn arm_expiry_timer(&self, expire_at: Option<Timestamp>, now: Timestamp) {
        self.cancel_expiry_timer();

        let Some(at) = expire_at.filter(|at| *at > now) else {
            return;
        };
        let clock = self.inner.system.clock();
        let weak = Rc::downgrade(&self.inner);
        let id = clock.schedule_at(
            at,
            Box::new(move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                inner.expiry_timer.take();
                if inner.destroyed.get() {
                    return;
                }
                Resource { inner }.refresh_flags();
            }),
        );
        self.inner.expiry_timer.replace(Some(ArmedTimer { clock, id }));
    }

    fn cancel_expiry_timer(&self) {
        if let Some(armed) = self.inner.expiry_timer.take() {
            armed.clock.cancel(armed.id);
        }
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("id", &self.inner.id)
            .field("url", &self.inner.url)
            .field("lifecycle", &self.inner.lifecycle.borrow())
            .field("observers", &self.inner.observers.borrow().len())
            .field("destroyed", &self.inner.destroyed.get())
            .finish()
    }
}
