//! Frame clock with hidden-view throttling

/// Decides which ticks render. Visible views render every tick; hidden
/// views render once per `hidden_interval` seconds.
#[derive(Debug, Clone)]
pub struct FrameClock {
    /// Total elapsed time in seconds
    pub total_time: f64,
    /// Time since last tick in seconds, clamped
    pub delta_time: f64,
    /// Minimum spacing between frames while hidden
    pub hidden_interval: f64,
    /// Time accumulated while hidden since the last rendered frame
    accumulator: f64,
    frames: u64,
    stopped: bool,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl FrameClock {
    pub fn new(hidden_interval: f64) -> Self {
        Self {
            total_time: 0.0,
            delta_time: 0.0,
            hidden_interval,
            accumulator: 0.0,
            frames: 0,
            stopped: false,
        }
    }

    /// Advance by `dt` seconds. Returns true when this tick should render.
    pub fn tick(&mut self, dt: f64, visible: bool) -> bool {
        if self.stopped {
            return false;
        }
        let dt = dt.max(0.0);
        // Clamp to avoid huge jumps after a stall (max 250ms frame time)
        self.delta_time = dt.min(0.25);
        self.total_time += dt;

        let render = if visible {
            self.accumulator = 0.0;
            true
        } else {
            self.accumulator += dt;
            if self.accumulator >= self.hidden_interval {
                self.accumulator = 0.0;
                true
            } else {
                false
            }
        };
        if render {
            self.frames += 1;
        }
        render
    }

    /// Frames rendered so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Cancel the tick for good
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}
