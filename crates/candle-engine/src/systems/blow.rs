//! Blow detection: turns per-frame microphone magnitudes (or a manual tap)
//! into discrete blow events, behind a listening gate and a cooldown.

use serde::{Deserialize, Serialize};

/// Detector tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Mean magnitude (0–255 scale) a frame must exceed to count as a blow.
    pub threshold: f32,
    /// Minimum time between two accepted blow events.
    pub cooldown_ms: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            threshold: 50.0,
            cooldown_ms: 1000.0,
        }
    }
}

/// Where a blow event came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlowSource {
    /// Frame mean crossed the threshold.
    Microphone { level: f32 },
    /// The fallback tap.
    Manual,
}

/// A discrete "the user blew" signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlowEvent {
    pub source: BlowSource,
    pub at_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectorState {
    /// Gate closed, samples and taps are ignored.
    Idle,
    /// Gate open, every frame is checked.
    Listening,
    /// An event was just accepted; nothing is accepted before `until_ms`.
    CoolingDown { until_ms: f64 },
}

#[derive(Debug, Clone)]
pub struct BlowDetector {
    config: DetectorConfig,
    state: DetectorState,
    gate_open: bool,
}

/// Arithmetic mean of one frame of magnitudes. Empty frames are silent.
pub fn frame_level(frame: &[u8]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum: u64 = frame.iter().map(|&b| b as u64).sum();
    sum as f32 / frame.len() as f32
}

impl BlowDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            state: DetectorState::Idle,
            gate_open: false,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn is_gate_open(&self) -> bool {
        self.gate_open
    }

    pub fn is_listening(&self) -> bool {
        self.state == DetectorState::Listening
    }

    pub fn open_gate(&mut self) {
        self.gate_open = true;
        if self.state == DetectorState::Idle {
            self.state = DetectorState::Listening;
        }
    }

    /// Close the gate. A running cooldown keeps running and ends in `Idle`.
    pub fn close_gate(&mut self) {
        self.gate_open = false;
        if self.state == DetectorState::Listening {
            self.state = DetectorState::Idle;
        }
    }

    /// Expire the cooldown once its time has passed.
    pub fn tick(&mut self, now_ms: f64) {
        if let DetectorState::CoolingDown { until_ms } = self.state {
            if now_ms >= until_ms {
                self.state = if self.gate_open {
                    DetectorState::Listening
                } else {
                    DetectorState::Idle
                };
            }
        }
    }

    /// Feed one frame of magnitudes.
    pub fn sample(&mut self, frame: &[u8], now_ms: f64) -> Option<BlowEvent> {
        self.tick(now_ms);
        if !self.is_listening() {
            return None;
        }
        let level = frame_level(frame);
        if level > self.config.threshold {
            Some(self.accept(BlowSource::Microphone { level }, now_ms))
        } else {
            None
        }
    }

    /// The fallback tap: bypasses the threshold but not the gate or cooldown.
    pub fn manual_trigger(&mut self, now_ms: f64) -> Option<BlowEvent> {
        self.tick(now_ms);
        if !self.is_listening() {
            log::debug!("manual blow ignored in state {:?}", self.state);
            return None;
        }
        Some(self.accept(BlowSource::Manual, now_ms))
    }

    fn accept(&mut self, source: BlowSource, now_ms: f64) -> BlowEvent {
        self.state = DetectorState::CoolingDown {
            until_ms: now_ms + self.config.cooldown_ms,
        };
        BlowEvent { source, at_ms: now_ms }
    }
}

impl Default for BlowDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}
