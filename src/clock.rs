//! # Clock
//!
//! Time source used by the expiry subsystem.
//!
//! Everything that asks "what time is it?" goes through the [`Clock`] trait so the
//! production clock ([`SystemClock`]) and the deterministic test clock
//! ([`VirtualClock`]) are interchangeable. A clock also owns a small timer queue:
//! resources use [`Clock::schedule_at`] to be told when their `expire_at` instant
//! passes, and [`Clock::tick`] is the moment due timers fire. The returned
//! [`TimerId`] cancels a timer that is no longer wanted.
//!
//! ## Driving a clock
//!
//! A [`VirtualClock`] only moves when a test calls `tick`. A [`SystemClock`] reads
//! wall time, but its timers still need someone to call `tick` periodically. That is
//! what [`run_ticker`] does on a Tokio interval:
//!
//! ```ignore
//! let local = tokio::task::LocalSet::new();
//! local.spawn_local(run_ticker(clock.clone(), Duration::from_secs(1)));
//! ```

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::{Duration, SystemTime};

use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

/// Instants handed out by a [`Clock`].
pub type Timestamp = SystemTime;

/// Callback fired once its scheduled instant has been reached.
pub type TimerCallback = Box<dyn FnOnce()>;

/// Handle to a scheduled timer, valid only on the clock that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId {
    at: Timestamp,
    seq: u64,
}

impl TimerId {
    /// The instant the timer is due.
    pub fn at(&self) -> Timestamp {
        self.at
    }
}

/// A swappable source of "now" with scheduled callbacks.
pub trait Clock {
    /// The current instant according to this clock.
    fn now(&self) -> Timestamp;

    /// Advance the clock by `elapsed` and fire every timer that is now due.
    ///
    /// Clocks backed by real time ignore `elapsed` and only fire due timers.
    fn tick(&self, elapsed: Duration);

    /// Run `callback` on the first `tick` at or after `at`.
    fn schedule_at(&self, at: Timestamp, callback: TimerCallback) -> TimerId;

    /// Drop a timer before it fires. Returns `false` if it already fired or was
    /// cancelled.
    fn cancel(&self, timer: TimerId) -> bool;

    /// Number of timers waiting to fire.
    fn pending_timers(&self) -> usize;
}

/// Ordered timer storage shared by both clock implementations.
///
/// Timers are keyed by [`TimerId`], which orders by instant and then sequence,
/// so two timers for the same instant fire in registration order.
#[derive(Default)]
struct TimerQueue {
    next_seq: Cell<u64>,
    timers: RefCell<BTreeMap<TimerId, TimerCallback>>,
}

impl TimerQueue {
    fn push(&self, at: Timestamp, callback: TimerCallback) -> TimerId {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        let id = TimerId { at, seq };
        self.timers.borrow_mut().insert(id, callback);
        id
    }

    fn cancel(&self, id: TimerId) -> bool {
        self.timers.borrow_mut().remove(&id).is_some()
    }

    /// Fire due timers one at a time; callbacks may schedule new timers.
    fn fire_due(&self, now: Timestamp) -> usize {
        let mut fired = 0;
        loop {
            let next = {
                let mut timers = self.timers.borrow_mut();
                let due = timers
                    .first_key_value()
                    .is_some_and(|(id, _)| id.at <= now);
                if due {
                    timers.pop_first()
                } else {
                    None
                }
            };
            match next {
                Some((_, callback)) => {
                    callback();
                    fired += 1;
                }
                None => break,
            }
        }
        fired
    }

    fn len(&self) -> usize {
        self.timers.borrow().len()
    }
}

/// Deterministic clock that only moves when told to.
///
/// Starts at the wall-clock time of construction unless built with
/// [`VirtualClock::starting_at`], so expiry timestamps remain comparable with
/// real dates.
pub struct VirtualClock {
    now: Cell<Timestamp>,
    ticks: Cell<u64>,
    timers: TimerQueue,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::starting_at(SystemTime::now())
    }

    pub fn starting_at(start: Timestamp) -> Self {
        Self {
            now: Cell::new(start),
            ticks: Cell::new(0),
            timers: TimerQueue::default(),
        }
    }

    /// How many times [`Clock::tick`] has been called on this clock.
    pub fn tick_count(&self) -> u64 {
        self.ticks.get()
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Timestamp {
        self.now.get()
    }

    fn tick(&self, elapsed: Duration) {
        self.ticks.set(self.ticks.get() + 1);
        let now = self.now.get() + elapsed;
        self.now.set(now);
        let fired = self.timers.fire_due(now);
        trace!(?elapsed, fired, "Virtual clock ticked");
    }

    fn schedule_at(&self, at: Timestamp, callback: TimerCallback) -> TimerId {
        self.timers.push(at, callback)
    }

    fn cancel(&self, timer: TimerId) -> bool {
        self.timers.cancel(timer)
    }

    fn pending_timers(&self) -> usize {
        self.timers.len()
    }
}

/// Clock backed by [`SystemTime::now`].
#[derive(Default)]
pub struct SystemClock {
    timers: TimerQueue,
}

thread_local! {
    static SHARED_SYSTEM_CLOCK: Rc<SystemClock> = Rc::new(SystemClock::default());
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// The per-thread shared instance used when no clock is configured.
    pub fn shared() -> Rc<SystemClock> {
        SHARED_SYSTEM_CLOCK.with(Rc::clone)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
    }

    fn tick(&self, _elapsed: Duration) {
        let fired = self.timers.fire_due(SystemTime::now());
        trace!(fired, "System clock ticked");
    }

    fn schedule_at(&self, at: Timestamp, callback: TimerCallback) -> TimerId {
        self.timers.push(at, callback)
    }

    fn cancel(&self, timer: TimerId) -> bool {
        self.timers.cancel(timer)
    }

    fn pending_timers(&self) -> usize {
        self.timers.len()
    }
}

/// Tick `clock` every `period` forever.
///
/// The future is `!Send` (clocks are single-threaded); spawn it on a
/// [`tokio::task::LocalSet`] and abort the task to stop ticking.
pub async fn run_ticker(clock: Rc<dyn Clock>, period: Duration) {
    debug!(?period, "Clock ticker started");
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of a Tokio interval completes immediately.
    interval.tick().await;
    loop {
        interval.tick().await;
        clock.tick(period);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_clock_only_moves_on_tick() {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let clock = VirtualClock::starting_at(start);
        assert_eq!(clock.now(), start);

        clock.tick(Duration::from_secs(5));
        assert_eq!(clock.now(), start + Duration::from_secs(5));
        assert_eq!(clock.tick_count(), 1);
    }

    #[test]
    fn timers_fire_in_order_once_due() {
        let start = SystemTime::UNIX_EPOCH;
        let clock = VirtualClock::starting_at(start);
        let fired = Rc::new(RefCell::new(Vec::new()));

        for (label, secs) in [("late", 10), ("early", 2), ("also-early", 2)] {
            let fired = fired.clone();
            clock.schedule_at(
                start + Duration::from_secs(secs),
                Box::new(move || fired.borrow_mut().push(label)),
            );
        }

        clock.tick(Duration::from_secs(1));
        assert!(fired.borrow().is_empty());

        clock.tick(Duration::from_secs(1));
        assert_eq!(*fired.borrow(), vec!["early", "also-early"]);
        assert_eq!(clock.pending_timers(), 1);

        clock.tick(Duration::from_secs(60));
        assert_eq!(*fired.borrow(), vec!["early", "also-early", "late"]);
        assert_eq!(clock.pending_timers(), 0);
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let start = SystemTime::UNIX_EPOCH;
        let clock = VirtualClock::starting_at(start);
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        let timer = clock.schedule_at(start + Duration::from_secs(1), Box::new(move || flag.set(true)));
        assert_eq!(timer.at(), start + Duration::from_secs(1));

        assert!(clock.cancel(timer));
        assert!(!clock.cancel(timer));
        assert_eq!(clock.pending_timers(), 0);

        clock.tick(Duration::from_secs(5));
        assert!(!fired.get());
    }

    #[test]
    fn system_clock_fires_past_timers_on_tick() {
        let clock = SystemClock::new();
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        clock.schedule_at(SystemTime::now() - Duration::from_secs(1), Box::new(move || flag.set(true)));

        clock.tick(Duration::ZERO);
        assert!(fired.get());
    }

    #[test]
    fn shared_system_clock_is_one_instance_per_thread() {
        assert!(Rc::ptr_eq(&SystemClock::shared(), &SystemClock::shared()));
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_drives_the_clock_on_an_interval() {
        let clock = Rc::new(VirtualClock::new());
        let local = tokio::task::LocalSet::new();

        local
            .run_until(async {
                let handle = tokio::task::spawn_local(run_ticker(clock.clone(), Duration::from_secs(1)));
                tokio::time::sleep(Duration::from_millis(3_500)).await;
                handle.abort();
            })
            .await;

        assert_eq!(clock.tick_count(), 3);
    }
}
