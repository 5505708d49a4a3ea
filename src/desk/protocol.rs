use uuid::Uuid;

use super::error::DeskError;

/// Linak/Idasen BLE characteristic UUIDs, from reverse engineering of the
/// DPG (Desk Panel Gateway) protocol.

// Current height, 16-bit little-endian, hundredths of a cm above the base.
pub const POSITION_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x99fa0021_338a_1024_8a49_009c0215f78a);

// Movement commands, 16-bit little-endian opcode.
pub const CONTROL_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x99fa0002_338a_1024_8a49_009c0215f78a);

/// Height of the desk frame when the raw reading is zero.
pub const BASE_HEIGHT_CM: f64 = 63.00;

/// Lowest height the desk accepts a move command for.
pub const MIN_HEIGHT_CM: f64 = 65.0;

/// Highest height the desk accepts a move command for.
pub const MAX_HEIGHT_CM: f64 = 128.0;

/// Direction of a motor pulse. The desk keeps moving in the pulsed
/// direction until the firmware times the pulse out or a new command
/// supersedes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn opcode(self) -> u16 {
        match self {
            Self::Up => 71,
            Self::Down => 70,
        }
    }

    /// Wire encoding for the control characteristic.
    pub fn to_bytes(self) -> [u8; 2] {
        self.opcode().to_le_bytes()
    }
}

/// Decode a position characteristic payload into a height in centimeters.
///
/// The payload must be exactly two bytes: an unsigned 16-bit little-endian
/// count of hundredths of a cm above [`BASE_HEIGHT_CM`].
pub fn decode_position(data: &[u8]) -> Result<f64, DeskError> {
    let raw: [u8; 2] = data
        .try_into()
        .map_err(|_| DeskError::MalformedReading { len: data.len() })?;

    Ok(BASE_HEIGHT_CM + f64::from(u16::from_le_bytes(raw)) / 100.0)
}
