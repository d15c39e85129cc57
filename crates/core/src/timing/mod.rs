use std::{cell::Cell, rc::Rc, time::Instant};

/// Monotonic millisecond clock. The counter is allowed to wrap; consumers
/// must only ever look at differences between two readings.
pub trait TimeSource {
    fn now_millis(&self) -> u32;
}

/// Default time source backed by `Instant::now`.
#[derive(Debug, Clone)]
pub struct SystemTimeSource {
    start: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn now_millis(&self) -> u32 {
        // Truncation is the wrap.
        self.start.elapsed().as_millis() as u32
    }
}

/// Hand-driven clock. Clones share the same counter, so a test (or a
/// simulation) can hand one copy to the engine and advance another.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    now: Rc<Cell<u32>>,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(millis: u32) -> Self {
        let clock = Self::default();
        clock.set(millis);
        clock
    }

    pub fn set(&self, millis: u32) {
        self.now.set(millis);
    }

    pub fn advance(&self, delta: u32) {
        self.now.set(self.now.get().wrapping_add(delta));
    }
}

impl TimeSource for ManualTimeSource {
    fn now_millis(&self) -> u32 {
        self.now.get()
    }
}

/// Milliseconds elapsed since the last [`ElapsedMillis::reset`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElapsedMillis {
    started: u32,
}

impl ElapsedMillis {
    pub fn starting_at(now: u32) -> Self {
        Self { started: now }
    }

    pub fn reset(&mut self, now: u32) {
        self.started = now;
    }

    pub fn elapsed(&self, now: u32) -> u32 {
        now.wrapping_sub(self.started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualTimeSource::new();
        let view = clock.clone();
        clock.advance(25);
        assert_eq!(view.now_millis(), 25);
    }

    #[test]
    fn elapsed_survives_counter_wrap() {
        let clock = ManualTimeSource::starting_at(u32::MAX - 10);
        let timer = ElapsedMillis::starting_at(clock.now_millis());

        clock.advance(30);
        assert_eq!(clock.now_millis(), 19);
        assert_eq!(timer.elapsed(clock.now_millis()), 30);
    }

    #[test]
    fn reset_restarts_the_count() {
        let clock = ManualTimeSource::new();
        let mut timer = ElapsedMillis::starting_at(clock.now_millis());
        clock.advance(120);
        timer.reset(clock.now_millis());
        clock.advance(5);
        assert_eq!(timer.elapsed(clock.now_millis()), 5);
    }
}
