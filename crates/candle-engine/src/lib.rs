pub mod api;
pub mod core;
pub mod error;
pub mod input;
pub mod session;
pub mod systems;

// Re-export key types at crate root for convenience
pub use api::greeting::{Greeting, GreetingConfig};
pub use api::types::{event_kind, GreetingEvent, Modal, SoundEvent, Stage};
pub use crate::core::time::FrameClock;
pub use crate::core::timeline::Timeline;
pub use error::{Error, Result};
pub use input::queue::{InputEvent, InputQueue};
pub use session::context::{MicrophoneState, Session};
pub use session::flow::{BlowAttempt, FlowSignal, SessionFlow, DEFAULT_FRACTIONS};
pub use systems::blow::{frame_level, BlowDetector, BlowEvent, BlowSource, DetectorConfig, DetectorState};
pub use systems::candles::CandleField;
pub use systems::capture::{AmplitudeSource, AmplitudeStream, Capture};
pub use systems::confetti::{parse_hex_color, Confetti, ConfettiInstance, ConfettiPiece};
pub use systems::sequencer::Rng;
