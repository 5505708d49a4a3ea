use std::time::Duration;

use super::bluetooth::BleDeskLink;
use super::controller::{ControllerConfig, PositionController};
use super::error::DeskError;
use super::link::DeskLink;
use super::protocol::{MAX_HEIGHT_CM, MIN_HEIGHT_CM};

/// A connected desk behind the name-or-address abstraction the CLI works
/// with. Owns the link for the duration of one run; generic over the link
/// so the control path can be exercised against a simulated desk.
pub struct DeskSession<L = BleDeskLink> {
    link: L,
    controller: ControllerConfig,
}

impl DeskSession<BleDeskLink> {
    /// Discover and connect to the desk advertised under `name_or_addr`.
    pub async fn connect(name_or_addr: &str, timeout: Duration) -> Result<Self, DeskError> {
        let link = BleDeskLink::connect(name_or_addr, timeout).await?;
        Ok(Self::with_link(link))
    }

    pub async fn disconnect(&self) -> Result<(), DeskError> {
        self.link.disconnect().await
    }
}

impl<L: DeskLink> DeskSession<L> {
    pub fn with_link(link: L) -> Self {
        Self {
            link,
            controller: ControllerConfig::default(),
        }
    }

    /// Drive the desk to `target_cm`. Targets outside the device limits are
    /// rejected before any BLE transaction happens.
    pub async fn move_to(&self, target_cm: f64) -> Result<(), DeskError> {
        if !(MIN_HEIGHT_CM..=MAX_HEIGHT_CM).contains(&target_cm) {
            return Err(DeskError::OutOfRange {
                target_cm,
                min_cm: MIN_HEIGHT_CM,
                max_cm: MAX_HEIGHT_CM,
            });
        }

        PositionController::new(&self.link, self.controller.clone())
            .move_to(target_cm)
            .await
    }

    /// One-shot height read, used to capture the current position as a
    /// favorite.
    pub async fn current_position(&self) -> Result<f64, DeskError> {
        self.link.read_position().await
    }
}
