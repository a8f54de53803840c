use std::time::Instant;

/// Timing information for one frame.
///
/// A plain value so simulation code can be driven by hand-built frames.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameTime {
    /// Seconds since the clock was started.
    pub elapsed: f32,
    /// Seconds since the previous frame.
    pub delta: f32,
    /// Number of frames ticked before this one.
    pub frame: u64,
}

impl FrameTime {
    /// Build a frame time directly. Mostly useful in tests.
    pub fn new(elapsed: f32, delta: f32, frame: u64) -> Self {
        Self {
            elapsed,
            delta,
            frame,
        }
    }
}

/// Monotonic clock that hands out one [`FrameTime`] per frame.
pub struct FrameClock {
    start: Instant,
    last: Instant,
    frame: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            frame: 0,
        }
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock. Call exactly once at the top of every frame.
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let time = FrameTime {
            elapsed: now.duration_since(self.start).as_secs_f32(),
            delta: now.duration_since(self.last).as_secs_f32(),
            frame: self.frame,
        };
        self.last = now;
        self.frame += 1;
        time
    }

    /// Current frames per second estimate from a frame delta.
    pub fn fps(time: &FrameTime) -> f32 {
        if time.delta > 0.0 { 1.0 / time.delta } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_are_monotonic() {
        let mut clock = FrameClock::new();
        let a = clock.tick();
        let b = clock.tick();
        assert_eq!(a.frame, 0);
        assert_eq!(b.frame, 1);
        assert!(b.elapsed >= a.elapsed);
        assert!(b.delta >= 0.0);
    }

    #[test]
    fn fps_of_zero_delta_is_zero() {
        assert_eq!(FrameClock::fps(&FrameTime::default()), 0.0);
        assert_eq!(FrameClock::fps(&FrameTime::new(1.0, 0.5, 3)), 2.0);
    }
}
