use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::session::flow::DEFAULT_FRACTIONS;
use crate::systems::blow::DetectorConfig;
use crate::systems::confetti::parse_hex_color;

/// Configuration for a greeting, provided by the greeting or loaded from JSON.
/// Every field has a default, so a partial JSON object is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GreetingConfig {
    /// Candles on the cake (default: 35).
    pub total_candles: usize,
    /// Cumulative fraction of candles out after each of the three blows.
    pub attempt_fractions: [f64; 3],
    /// Blow threshold and cooldown.
    pub detector: DetectorConfig,
    /// Analyser FFT size requested from the page's audio graph (default: 256).
    pub fft_size: u32,
    /// Delay between leaving the name screen and showing the cake.
    pub transition_delay_ms: f64,
    /// Fade-out time of a modal before the next step runs.
    pub modal_fade_ms: f64,
    /// Pause after candles go out before the feedback modal shows.
    pub blow_feedback_delay_ms: f64,
    /// Pause after the confetti starts before the fun message shows.
    pub fun_message_delay_ms: f64,
    /// How long after the first instruction the tap fallback may appear.
    pub fallback_delay_ms: f64,
    /// Confetti pieces spawned at the finale (default: 150).
    pub confetti_count: usize,
    /// Confetti palette as `#RRGGBB` strings.
    pub confetti_colors: Vec<String>,
    /// One instruction line per blow.
    pub instructions: [String; 3],
    /// One of these is picked at random for the finale.
    pub fun_messages: Vec<String>,
    /// RNG seed. `None` lets the host choose one.
    pub seed: Option<u64>,
}

impl Default for GreetingConfig {
    fn default() -> Self {
        Self {
            total_candles: 35,
            attempt_fractions: DEFAULT_FRACTIONS,
            detector: DetectorConfig::default(),
            fft_size: 256,
            transition_delay_ms: 600.0,
            modal_fade_ms: 300.0,
            blow_feedback_delay_ms: 800.0,
            fun_message_delay_ms: 500.0,
            fallback_delay_ms: 500.0,
            confetti_count: 150,
            confetti_colors: ["#FFB6C1", "#FFD700", "#87CEEB", "#98FB98", "#DDA0DD", "#F0E68C"]
                .into_iter()
                .map(String::from)
                .collect(),
            instructions: [
                "Give it a try! Blow softly and see which candles listen to you.".into(),
                "You've got this. Blow again and see the magic happen!".into(),
                "Final blow! This is the moment!".into(),
            ],
            fun_messages: vec!["Happy birthday!".into()],
            seed: None,
        }
    }
}

impl GreetingConfig {
    /// Parse and validate a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.total_candles == 0 {
            return Err(Error::InvalidConfig("total_candles must be at least 1".into()));
        }
        let mut previous = 0.0;
        for &f in &self.attempt_fractions {
            if !(0.0..=1.0).contains(&f) {
                return Err(Error::InvalidFraction(f));
            }
            if f < previous {
                return Err(Error::InvalidConfig(
                    "attempt_fractions must be non-decreasing".into(),
                ));
            }
            previous = f;
        }
        let threshold = self.detector.threshold;
        if !(0.0..=255.0).contains(&threshold) {
            return Err(Error::InvalidConfig(format!(
                "detector threshold {threshold} is outside 0-255"
            )));
        }
        let delays = [
            self.detector.cooldown_ms,
            self.transition_delay_ms,
            self.modal_fade_ms,
            self.blow_feedback_delay_ms,
            self.fun_message_delay_ms,
            self.fallback_delay_ms,
        ];
        if delays.iter().any(|d| !d.is_finite() || *d < 0.0) {
            return Err(Error::InvalidConfig("delays must be finite and non-negative".into()));
        }
        if !self.fft_size.is_power_of_two() || !(32..=32768).contains(&self.fft_size) {
            return Err(Error::InvalidConfig(format!(
                "fft_size {} must be a power of two in 32-32768",
                self.fft_size
            )));
        }
        if let Some(bad) = self.confetti_colors.iter().find(|c| parse_hex_color(c).is_none()) {
            return Err(Error::InvalidConfig(format!("confetti color {bad:?} is not #RRGGBB")));
        }
        if self.fun_messages.is_empty() {
            return Err(Error::InvalidConfig("at least one fun message is required".into()));
        }
        Ok(())
    }

    /// The palette as RGB channels. Invalid entries are skipped.
    pub fn confetti_palette(&self) -> Vec<[f32; 3]> {
        self.confetti_colors
            .iter()
            .filter_map(|c| parse_hex_color(c))
            .collect()
    }
}

/// The contract every greeting fulfills. Everything but the config has a default.
pub trait Greeting {
    /// Return the greeting's configuration. Called once before the session starts.
    fn config(&self) -> GreetingConfig {
        GreetingConfig::default()
    }

    /// The name was accepted and the cake is about to show.
    fn on_name(&mut self, _name: &str) {}

    /// All candles are out.
    fn on_finished(&mut self, _name: &str) {}
}
