use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Manager, Peripheral};
use futures::{Stream, StreamExt};
use uuid::Uuid;

use super::error::DeskError;
use super::link::DeskLink;
use super::protocol::{
    self, Direction, CONTROL_CHARACTERISTIC_UUID, POSITION_CHARACTERISTIC_UUID,
};

/// Production [`DeskLink`]: an open btleplug connection with the two desk
/// characteristics resolved. Created by discovery, released by the caller
/// through [`disconnect`](Self::disconnect).
pub struct BleDeskLink {
    peripheral: Peripheral,
    position_char: Characteristic,
    control_char: Characteristic,
}

impl BleDeskLink {
    /// Scan for a desk advertised under `name_or_addr` (local name or
    /// address string) and connect to it.
    ///
    /// The scan races `timeout`: whichever of {match, deadline} happens
    /// first decides the outcome and the losing branch is dropped, so a
    /// late match can never touch a torn-down scan.
    pub async fn connect(name_or_addr: &str, timeout: Duration) -> Result<Self, DeskError> {
        let manager = Manager::new().await?;
        let central = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DeskError::ConnectFailed("no Bluetooth adapters found".into()))?;

        // Subscribe before scanning so no advertisement is missed.
        let events = central.events().await?;
        log::info!("Scanning for desk {name_or_addr:?} (timeout {timeout:?})");
        central.start_scan(ScanFilter::default()).await?;

        let found = first_match(events, timeout, |event| {
            let central = central.clone();
            let target = name_or_addr.to_string();
            async move {
                let id = match event {
                    CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
                    _ => return None,
                };
                let peripheral = central.peripheral(&id).await.ok()?;
                if matches_target(&peripheral, &target).await {
                    Some(peripheral)
                } else {
                    None
                }
            }
        })
        .await;

        if let Err(e) = central.stop_scan().await {
            log::warn!("Failed to stop scan: {e}");
        }

        Self::attach(found?).await
    }

    async fn attach(peripheral: Peripheral) -> Result<Self, DeskError> {
        log::info!("Connecting to desk...");
        peripheral
            .connect()
            .await
            .map_err(|e| DeskError::ConnectFailed(e.to_string()))?;
        peripheral
            .discover_services()
            .await
            .map_err(|e| DeskError::ConnectFailed(e.to_string()))?;

        let chars = peripheral.characteristics();
        let position_char = find_characteristic(&chars, POSITION_CHARACTERISTIC_UUID)?;
        let control_char = find_characteristic(&chars, CONTROL_CHARACTERISTIC_UUID)?;
        log::info!("Desk link established");

        Ok(Self {
            peripheral,
            position_char,
            control_char,
        })
    }

    /// Close the connection. Safe to call on an already-closed link.
    pub async fn disconnect(&self) -> Result<(), DeskError> {
        if self.peripheral.is_connected().await? {
            self.peripheral.disconnect().await?;
            log::info!("Disconnected from desk");
        }
        Ok(())
    }
}

impl DeskLink for BleDeskLink {
    async fn read_position(&self) -> Result<f64, DeskError> {
        let data = self.peripheral.read(&self.position_char).await?;
        log::debug!("Position characteristic: {data:02X?}");
        protocol::decode_position(&data)
    }

    async fn send_command(&self, direction: Direction) -> Result<(), DeskError> {
        let bytes = direction.to_bytes();
        log::debug!("Sending {direction:?} -> {bytes:02X?}");
        self.peripheral
            .write(&self.control_char, &bytes, WriteType::WithoutResponse)
            .await?;
        Ok(())
    }
}

impl Drop for BleDeskLink {
    fn drop(&mut self) {
        // Best effort; callers that care about the outcome use disconnect().
        let _ = futures::executor::block_on(self.disconnect());
    }
}

async fn matches_target(peripheral: &Peripheral, target: &str) -> bool {
    let props = match peripheral.properties().await {
        Ok(Some(props)) => props,
        _ => return false,
    };

    if props.address.to_string().eq_ignore_ascii_case(target) {
        return true;
    }
    props.local_name.as_deref() == Some(target)
}

fn find_characteristic(
    chars: &BTreeSet<Characteristic>,
    uuid: Uuid,
) -> Result<Characteristic, DeskError> {
    chars
        .iter()
        .find(|c| c.uuid == uuid)
        .cloned()
        .ok_or_else(|| DeskError::ConnectFailed(format!("desk does not expose characteristic {uuid}")))
}

/// Run `accept` over `candidates` until it produces a hit, racing the
/// deadline. Exactly one of {hit, timeout} yields the result; the in-flight
/// search is cancelled when the deadline wins. A candidate stream that ends
/// without a hit counts as a timeout too.
async fn first_match<S, T, R, F, Fut>(
    mut candidates: S,
    timeout: Duration,
    mut accept: F,
) -> Result<R, DeskError>
where
    S: Stream<Item = T> + Unpin,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Option<R>>,
{
    let search = async {
        while let Some(candidate) = candidates.next().await {
            if let Some(hit) = accept(candidate).await {
                return Some(hit);
            }
        }
        None
    };

    match tokio::time::timeout(timeout, search).await {
        Ok(Some(hit)) => Ok(hit),
        Ok(None) | Err(_) => Err(DeskError::ConnectTimeout(timeout)),
    }
}
