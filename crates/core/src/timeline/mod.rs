use std::{cell::Cell, fmt, rc::Rc, time::Instant};

/// Source of wall-clock time for frame budgeting and transition progress.
pub trait Clock: fmt::Debug {
    /// Milliseconds elapsed since an arbitrary, fixed origin.
    fn now_ms(&self) -> f64;
}

/// Production clock backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-driven clock. Clones share the same time source, so a test or an
/// offline simulation can keep one handle and advance it between frames
/// while the engines hold the others.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(ms: f64) -> Self {
        let clock = Self::new();
        clock.set_ms(ms);
        clock
    }

    pub fn set_ms(&self, ms: f64) {
        self.now.set(ms.max(0.0));
    }

    pub fn advance_ms(&self, delta: f64) {
        self.now.set((self.now.get() + delta).max(0.0));
    }

    pub fn advance_secs(&self, delta: f64) {
        self.advance_ms(delta * 1000.0);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}
