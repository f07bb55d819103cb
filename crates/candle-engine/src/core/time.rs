/// Monotonic session clock fed by per-frame deltas from the host.
///
/// Wall-clock timers are not available in the browser build, so all timing
/// (cooldowns, scheduled transitions) runs off the accumulated frame time.
/// The clock also hands out fixed animation steps for the confetti.
pub struct FrameClock {
    /// Milliseconds since the clock was created.
    now_ms: f64,
    /// Fixed step length in seconds.
    step: f32,
    /// Leftover time not yet consumed by a fixed step.
    accumulator: f32,
}

impl FrameClock {
    /// Longest single frame honored. Longer gaps (tab in background) are cut.
    pub const MAX_FRAME_SECONDS: f32 = 0.25;

    pub fn new(step: f32) -> Self {
        Self {
            now_ms: 0.0,
            step,
            accumulator: 0.0,
        }
    }

    /// Advance by one frame. Returns the number of fixed steps to run.
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        let dt = frame_dt.clamp(0.0, Self::MAX_FRAME_SECONDS);
        self.now_ms += dt as f64 * 1000.0;
        self.accumulator += dt;
        // Cap to prevent spiral of death (max 10 steps per frame)
        self.accumulator = self.accumulator.min(self.step * 10.0);
        let steps = (self.accumulator / self.step) as u32;
        self.accumulator -= steps as f32 * self.step;
        steps
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    pub fn step(&self) -> f32 {
        self.step
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(1.0 / 60.0)
    }
}
