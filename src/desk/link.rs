use super::error::DeskError;
use super::protocol::Direction;

/// Transport capability the position controller drives: one read and one
/// write transaction against the desk's GATT characteristics.
///
/// Implemented by [`BleDeskLink`](super::bluetooth::BleDeskLink) in
/// production and by in-memory simulated desks in tests. Faults come back
/// as errors; an implementation must never substitute a default height for
/// a failed read.
#[allow(async_fn_in_trait)]
pub trait DeskLink {
    /// Read the current height in centimeters. One BLE read transaction.
    async fn read_position(&self) -> Result<f64, DeskError>;

    /// Pulse the motor in `direction`. One BLE write transaction;
    /// fire-and-forget, the desk firmware owns the pulse duration.
    async fn send_command(&self, direction: Direction) -> Result<(), DeskError>;
}
