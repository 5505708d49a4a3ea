use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by the desk core. Every operation returns these to its
/// caller; nothing in the core logs-and-continues over a fault.
#[derive(Debug, Error)]
pub enum DeskError {
    /// The position characteristic returned a payload of the wrong size.
    #[error("malformed position reading: expected 2 bytes, got {len}")]
    MalformedReading { len: usize },

    /// A BLE read or write transaction failed.
    #[error("bluetooth transport failure: {0}")]
    Transport(#[from] btleplug::Error),

    /// No advertised device matched the requested name or address in time.
    #[error("no matching desk found within {0:?}")]
    ConnectTimeout(Duration),

    /// A desk was discovered but the connection handshake or service
    /// resolution failed.
    #[error("failed to connect to desk: {0}")]
    ConnectFailed(String),

    /// The requested target height is outside the device limits.
    #[error("target height {target_cm:.1} cm is outside the supported range {min_cm:.1}-{max_cm:.1} cm")]
    OutOfRange {
        target_cm: f64,
        min_cm: f64,
        max_cm: f64,
    },

    /// The desk stopped closing in on the target, e.g. it is at a hardware
    /// limit or the motor is blocked.
    #[error("desk made no progress toward the target (best distance {best_distance_cm:.2} cm)")]
    NoProgress { best_distance_cm: f64 },
}
