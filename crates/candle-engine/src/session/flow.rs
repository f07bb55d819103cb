//! The three-blow progression: First → Second → Final → Done.
//!
//! Each attempt is gated on a blow event from the detector. A blow closes
//! the gate and puts out candles; the presentation then acknowledges the
//! result, which reopens the gate for the next attempt. The final blow is
//! terminal and needs no acknowledgement.

use crate::error::{Error, Result};
use crate::systems::blow::{BlowDetector, BlowEvent, DetectorConfig};
use crate::systems::candles::CandleField;
use crate::systems::sequencer::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BlowAttempt {
    NotStarted,
    First,
    Second,
    Final,
    Done,
}

impl BlowAttempt {
    /// Zero-based ordinal of a blowing attempt, `None` outside the three rounds.
    pub fn ordinal(self) -> Option<usize> {
        match self {
            BlowAttempt::First => Some(0),
            BlowAttempt::Second => Some(1),
            BlowAttempt::Final => Some(2),
            BlowAttempt::NotStarted | BlowAttempt::Done => None,
        }
    }

    pub fn next(self) -> Self {
        match self {
            BlowAttempt::NotStarted => BlowAttempt::First,
            BlowAttempt::First => BlowAttempt::Second,
            BlowAttempt::Second => BlowAttempt::Final,
            BlowAttempt::Final | BlowAttempt::Done => BlowAttempt::Done,
        }
    }

    pub fn is_blowing(self) -> bool {
        self.ordinal().is_some()
    }
}

/// Cumulative fraction of candles out after each attempt.
pub const DEFAULT_FRACTIONS: [f64; 3] = [0.3, 0.7, 1.0];

/// What the flow tells the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowSignal {
    /// Blow input is accepted again for `attempt`.
    GateOpened { attempt: BlowAttempt },
    /// These candles just went out.
    CandlesExtinguished { attempt: BlowAttempt, indices: Vec<usize> },
    /// First or second attempt done; waiting for an acknowledgement.
    AttemptComplete { attempt: BlowAttempt },
    /// Final blow done. Terminal.
    Finished,
}

pub struct SessionFlow {
    attempt: BlowAttempt,
    /// A non-final blow landed and the next attempt waits for acknowledgement.
    awaiting_ack: bool,
    candles: CandleField,
    detector: BlowDetector,
    fractions: [f64; 3],
    rng: Rng,
}

impl SessionFlow {
    pub fn new(candle_count: usize, detector: DetectorConfig, fractions: [f64; 3], seed: u64) -> Self {
        Self {
            attempt: BlowAttempt::NotStarted,
            awaiting_ack: false,
            candles: CandleField::new(candle_count),
            detector: BlowDetector::new(detector),
            fractions,
            rng: Rng::new(seed),
        }
    }

    pub fn attempt(&self) -> BlowAttempt {
        self.attempt
    }

    pub fn candles(&self) -> &CandleField {
        &self.candles
    }

    pub fn detector(&self) -> &BlowDetector {
        &self.detector
    }

    pub fn is_awaiting_ack(&self) -> bool {
        self.awaiting_ack
    }

    pub fn is_done(&self) -> bool {
        self.attempt == BlowAttempt::Done
    }

    /// True while samples can turn into a blow right now.
    pub fn is_listening(&self) -> bool {
        self.attempt.is_blowing() && self.detector.is_listening()
    }

    /// Start the first attempt and open the gate. Ignored once started.
    pub fn begin(&mut self) -> Vec<FlowSignal> {
        if self.attempt != BlowAttempt::NotStarted {
            log::debug!("begin ignored in {:?}", self.attempt);
            return Vec::new();
        }
        self.attempt = BlowAttempt::First;
        self.detector.open_gate();
        log::info!("blowing started");
        vec![FlowSignal::GateOpened { attempt: self.attempt }]
    }

    /// Acknowledge a completed attempt: advance and reopen the gate.
    /// Redundant or early acknowledgements are dropped.
    pub fn acknowledge(&mut self) -> Vec<FlowSignal> {
        if !self.awaiting_ack {
            log::debug!("acknowledgement ignored in {:?}", self.attempt);
            return Vec::new();
        }
        self.awaiting_ack = false;
        self.attempt = self.attempt.next();
        self.detector.open_gate();
        vec![FlowSignal::GateOpened { attempt: self.attempt }]
    }

    /// Let a running cooldown expire.
    pub fn tick(&mut self, now_ms: f64) {
        self.detector.tick(now_ms);
    }

    /// Feed one amplitude frame.
    pub fn sample(&mut self, frame: &[u8], now_ms: f64) -> Result<Vec<FlowSignal>> {
        if !self.attempt.is_blowing() {
            return Ok(Vec::new());
        }
        match self.detector.sample(frame, now_ms) {
            Some(event) => self.on_blow(event),
            None => Ok(Vec::new()),
        }
    }

    /// The fallback tap.
    pub fn manual_trigger(&mut self, now_ms: f64) -> Result<Vec<FlowSignal>> {
        if !self.attempt.is_blowing() {
            log::debug!("manual blow ignored in {:?}", self.attempt);
            return Ok(Vec::new());
        }
        match self.detector.manual_trigger(now_ms) {
            Some(event) => self.on_blow(event),
            None => Ok(Vec::new()),
        }
    }

    fn on_blow(&mut self, event: BlowEvent) -> Result<Vec<FlowSignal>> {
        let attempt = self.attempt;
        let Some(ordinal) = attempt.ordinal() else {
            return Ok(Vec::new());
        };
        let fraction = self.fractions[ordinal];
        // Checked before the gate closes, or the attempt could never reopen.
        if !(0.0..=1.0).contains(&fraction) {
            return Err(Error::InvalidFraction(fraction));
        }
        self.detector.close_gate();

        let indices = self.candles.extinguish(fraction, &mut self.rng)?;
        log::info!(
            "blow {:?} via {:?}: {} candles out, {} lit",
            attempt,
            event.source,
            indices.len(),
            self.candles.count_lit()
        );

        let mut signals = vec![FlowSignal::CandlesExtinguished { attempt, indices }];
        if attempt == BlowAttempt::Final {
            self.attempt = BlowAttempt::Done;
            signals.push(FlowSignal::Finished);
        } else {
            self.awaiting_ack = true;
            signals.push(FlowSignal::AttemptComplete { attempt });
        }
        Ok(signals)
    }
}
