//! # Run Loop
//!
//! Explicit task queue for deferred effects.
//!
//! The cache is single-threaded and cooperative. Work that must not happen inline
//! (today: [`Resource::expire`](crate::resource::Resource::expire)) is pushed here,
//! and the host drains the queue once per turn with [`RunLoop::run_turn`].

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::trace;

/// A deferred unit of work.
pub type Task = Box<dyn FnOnce()>;

/// Cheaply cloneable handle to a shared task queue.
#[derive(Clone, Default)]
pub struct RunLoop {
    queue: Rc<RefCell<VecDeque<Task>>>,
}

impl RunLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` for the next turn.
    pub fn schedule(&self, task: impl FnOnce() + 'static) {
        self.queue.borrow_mut().push_back(Box::new(task));
    }

    /// Run every task that was queued before this turn started.
    ///
    /// Tasks scheduled while the turn runs wait for the following turn.
    pub fn run_turn(&self) -> usize {
        let batch: Vec<Task> = self.queue.borrow_mut().drain(..).collect();
        let count = batch.len();
        for task in batch {
            task();
        }
        trace!(count, "Run loop turn finished");
        count
    }

    /// Run turns until the queue is empty. Returns the number of tasks run.
    pub fn run_until_idle(&self) -> usize {
        let mut total = 0;
        while self.pending() > 0 {
            total += self.run_turn();
        }
        total
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}
