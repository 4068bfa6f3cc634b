use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Source of the current time for the supervisor's timers.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Monotonic wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// A single pending scheduled action: a one-shot deadline, or a deadline that moves forward
/// by its period each time it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    deadline: Instant,
    period: Option<Duration>,
}

impl TimerHandle {
    pub fn one_shot(now: Instant, delay: Duration) -> Self {
        TimerHandle {
            deadline: now + delay,
            period: None,
        }
    }

    /// `period` must be greater than zero.
    pub fn periodic(now: Instant, period: Duration) -> Self {
        TimerHandle {
            deadline: now + period,
            period: Some(period),
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    #[inline]
    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    /// Moves a periodic timer to its next deadline. Returns `false` for a one-shot timer,
    /// which has nothing left to fire.
    pub(crate) fn advance(&mut self) -> bool {
        match self.period {
            Some(period) => {
                self.deadline += period;
                true
            },
            None => false,
        }
    }
}

/// Cancels the timer in `slot`. Cancelling an empty slot is a no-op.
#[inline]
pub(crate) fn cancel(slot: &mut Option<TimerHandle>) -> bool {
    slot.take().is_some()
}

/// Arms `timer` in `slot`, replacing whatever was armed there before.
#[inline]
pub(crate) fn arm(slot: &mut Option<TimerHandle>, timer: TimerHandle) {
    cancel(slot);
    *slot = Some(timer);
}
