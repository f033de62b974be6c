//! Observer lists for lifecycle attributes.
//!
//! Observers are stored as weak references; the caller keeps the strong side in
//! a [`Subscription`]. Dropping the subscription silences the callback, and dead
//! entries are pruned the next time anything is notified.

use std::rc::{Rc, Weak};

use crate::lifecycle::{Attribute, Snapshot};

/// Callback invoked with the lifecycle snapshot taken right after a change.
pub type ObserverFn = dyn Fn(&Snapshot);

/// RAII guard keeping an observer alive.
#[must_use = "dropping a Subscription unsubscribes the observer"]
pub struct Subscription {
    _callback: Rc<ObserverFn>,
}

impl Subscription {
    pub(crate) fn new(callback: Rc<ObserverFn>) -> Self {
        Self {
            _callback: callback,
        }
    }
}

#[derive(Default)]
pub(crate) struct Observers {
    entries: Vec<(Attribute, Weak<ObserverFn>)>,
}

impl Observers {
    pub(crate) fn subscribe(&mut self, attribute: Attribute, callback: &Rc<ObserverFn>) {
        self.entries.push((attribute, Rc::downgrade(callback)));
    }

    /// Live callbacks registered for any of `changed`, in registration order.
    ///
    /// A callback registered for several changed attributes is returned once
    /// per attribute.
    pub(crate) fn collect(&mut self, changed: &[Attribute]) -> Vec<Rc<ObserverFn>> {
        self.entries.retain(|(_, callback)| callback.strong_count() > 0);
        self.entries
            .iter()
            .filter(|(attribute, _)| changed.contains(attribute))
            .filter_map(|(_, callback)| callback.upgrade())
            .collect()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn dropped_subscriptions_are_pruned() {
        let mut observers = Observers::default();
        let hits = Rc::new(Cell::new(0));

        let counter = hits.clone();
        let callback: Rc<ObserverFn> = Rc::new(move |_| counter.set(counter.get() + 1));
        observers.subscribe(Attribute::IsFetchable, &callback);
        let subscription = Subscription::new(callback);

        assert_eq!(observers.collect(&[Attribute::IsExpired]).len(), 0);
        assert_eq!(observers.collect(&[Attribute::IsFetchable]).len(), 1);

        drop(subscription);
        assert!(observers.collect(&[Attribute::IsFetchable]).is_empty());
        assert_eq!(observers.len(), 0);
    }
}
