use thiserror::Error;

/// Errors raised by the greeting engine.
///
/// Only `InvalidFraction` and the config variants indicate a programming or
/// setup mistake. Capture failures are recovered by the session, which falls
/// back to the manual trigger.
#[derive(Debug, Error)]
pub enum Error {
    /// The amplitude source could not be opened (microphone permission refused).
    #[error("amplitude source unavailable: permission denied")]
    PermissionDenied,

    /// The audio graph around a granted stream could not be built.
    #[error("audio graph setup failed: {0}")]
    AudioGraph(String),

    /// `extinguish` was asked for a fraction outside `[0, 1]`.
    #[error("extinguish fraction {0} is outside [0, 1]")]
    InvalidFraction(f64),

    #[error("invalid greeting config: {0}")]
    InvalidConfig(String),

    #[error("failed to parse greeting config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl Error {
    /// True for failures that leave the session usable through the manual trigger.
    pub fn is_capture_failure(&self) -> bool {
        matches!(self, Error::PermissionDenied | Error::AudioGraph(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_failures_are_recoverable() {
        assert!(Error::PermissionDenied.is_capture_failure());
        assert!(Error::AudioGraph("no context".into()).is_capture_failure());
        assert!(!Error::InvalidFraction(1.5).is_capture_failure());
    }

    #[test]
    fn display_includes_fraction() {
        let msg = Error::InvalidFraction(-0.25).to_string();
        assert!(msg.contains("-0.25"), "message was {msg}");
    }
}
