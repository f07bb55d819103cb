pub mod blow;
pub mod candles;
pub mod capture;
pub mod confetti;
pub mod sequencer;
