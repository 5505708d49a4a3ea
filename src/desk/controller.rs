use std::time::Duration;
use tokio::time::sleep;

use super::error::DeskError;
use super::link::DeskLink;
use super::protocol::Direction;

/// Distance improvement below which an iteration counts as stalled. The
/// desk reports hundredths of a cm, so anything smaller is noise.
const PROGRESS_EPSILON_CM: f64 = 0.01;

/// Tuning for the convergence loop. Injected rather than global so tests
/// can run against a simulated link without real-time delays.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Absolute distance from the target that counts as arrived.
    pub tolerance_cm: f64,

    /// Pause between command and next read, giving the desk time to move
    /// and the BLE stack time to settle. Shorter floods the firmware with
    /// commands; longer reads stale positions.
    pub poll_interval: Duration,

    /// Hard cap on loop iterations.
    pub max_iterations: u32,

    /// Consecutive reads without measurable progress before giving up.
    pub stall_iterations: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tolerance_cm: 1.0,
            poll_interval: Duration::from_millis(500),
            max_iterations: 240,
            stall_iterations: 8,
        }
    }
}

/// Drives a borrowed [`DeskLink`] toward a target height. Holds no state
/// across invocations and never manages the link's lifecycle.
pub struct PositionController<'a, L> {
    link: &'a L,
    config: ControllerConfig,
}

impl<'a, L: DeskLink> PositionController<'a, L> {
    pub fn new(link: &'a L, config: ControllerConfig) -> Self {
        Self { link, config }
    }

    /// Converge the desk to `target_cm`.
    ///
    /// Each iteration reads the position, stops if within tolerance,
    /// otherwise pulses the motor toward the target and sleeps one poll
    /// interval. A failed read or write is terminal; the caller may retry
    /// the whole call. A desk that stops closing the distance (hardware
    /// limit, blocked motor) fails with [`DeskError::NoProgress`] instead
    /// of looping forever.
    pub async fn move_to(&self, target_cm: f64) -> Result<(), DeskError> {
        let mut best_distance = f64::INFINITY;
        let mut stalled = 0u32;

        for iteration in 0..self.config.max_iterations {
            let current = self.link.read_position().await?;
            let distance = (current - target_cm).abs();
            log::debug!(
                "Iteration {iteration}: at {current:.2} cm, target {target_cm:.2} cm, distance {distance:.2} cm"
            );

            if distance <= self.config.tolerance_cm {
                log::info!("Reached {current:.2} cm (target {target_cm:.2} cm) after {iteration} commands");
                return Ok(());
            }

            if distance + PROGRESS_EPSILON_CM < best_distance {
                best_distance = distance;
                stalled = 0;
            } else {
                stalled += 1;
                if stalled >= self.config.stall_iterations {
                    log::warn!(
                        "No progress after {stalled} reads, best distance {best_distance:.2} cm"
                    );
                    return Err(DeskError::NoProgress {
                        best_distance_cm: best_distance,
                    });
                }
            }

            // Tolerance already excluded |current - target| <= tolerance,
            // so equality here still means "move down".
            let direction = if current < target_cm {
                Direction::Up
            } else {
                Direction::Down
            };
            self.link.send_command(direction).await?;

            sleep(self.config.poll_interval).await;
        }

        Err(DeskError::NoProgress {
            best_distance_cm: best_distance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// In-memory desk: moves `step_cm` toward the last commanded direction
    /// per command, optionally failing the n-th read.
    struct SimulatedDesk {
        state: Mutex<SimState>,
    }

    struct SimState {
        position_cm: f64,
        step_cm: f64,
        commands: Vec<Direction>,
        reads: u32,
        fail_read_at: Option<u32>,
    }

    impl SimulatedDesk {
        fn new(position_cm: f64, step_cm: f64) -> Self {
            Self {
                state: Mutex::new(SimState {
                    position_cm,
                    step_cm,
                    commands: Vec::new(),
                    reads: 0,
                    fail_read_at: None,
                }),
            }
        }

        fn failing_read_at(position_cm: f64, step_cm: f64, read: u32) -> Self {
            let desk = Self::new(position_cm, step_cm);
            desk.state.lock().unwrap().fail_read_at = Some(read);
            desk
        }

        fn commands_sent(&self) -> usize {
            self.state.lock().unwrap().commands.len()
        }

        fn position(&self) -> f64 {
            self.state.lock().unwrap().position_cm
        }
    }

    impl DeskLink for SimulatedDesk {
        async fn read_position(&self) -> Result<f64, DeskError> {
            let mut state = self.state.lock().unwrap();
            state.reads += 1;
            if state.fail_read_at == Some(state.reads) {
                return Err(DeskError::Transport(btleplug::Error::NotConnected));
            }
            Ok(state.position_cm)
        }

        async fn send_command(&self, direction: Direction) -> Result<(), DeskError> {
            let mut state = self.state.lock().unwrap();
            state.commands.push(direction);
            let step = state.step_cm;
            match direction {
                Direction::Up => state.position_cm += step,
                Direction::Down => state.position_cm -= step,
            }
            Ok(())
        }
    }

    fn fast_config() -> ControllerConfig {
        ControllerConfig {
            poll_interval: Duration::from_millis(1),
            ..ControllerConfig::default()
        }
    }

    #[tokio::test]
    async fn converges_to_targets_in_range() {
        for target in [70.0, 100.0, 127.5] {
            let desk = SimulatedDesk::new(72.0, 0.5);
            let config = fast_config();
            let tolerance = config.tolerance_cm;

            PositionController::new(&desk, config)
                .move_to(target)
                .await
                .unwrap_or_else(|e| panic!("move to {target} failed: {e}"));

            let distance = (desk.position() - target).abs();
            assert!(
                distance <= tolerance,
                "stopped {distance:.2} cm from target {target}"
            );
        }
    }

    #[tokio::test]
    async fn already_in_tolerance_sends_no_commands() {
        let desk = SimulatedDesk::new(99.4, 0.5);
        PositionController::new(&desk, fast_config())
            .move_to(100.0)
            .await
            .unwrap();
        assert_eq!(desk.commands_sent(), 0);
    }

    #[tokio::test]
    async fn stuck_desk_fails_with_no_progress() {
        // Commands move nothing, as if the desk were at a hardware limit.
        let desk = SimulatedDesk::new(65.0, 0.0);
        let config = fast_config();
        let stall_bound = config.stall_iterations as usize;

        let err = PositionController::new(&desk, config)
            .move_to(120.0)
            .await
            .unwrap_err();

        assert!(matches!(err, DeskError::NoProgress { .. }), "got {err}");
        assert!(
            desk.commands_sent() <= stall_bound,
            "kept commanding a stuck desk: {} pulses",
            desk.commands_sent()
        );
    }

    #[tokio::test]
    async fn failed_read_is_terminal() {
        let desk = SimulatedDesk::failing_read_at(72.0, 0.5, 3);

        let err = PositionController::new(&desk, fast_config())
            .move_to(100.0)
            .await
            .unwrap_err();

        assert!(matches!(err, DeskError::Transport(_)), "got {err}");
        // Two successful reads each produced a command; nothing after the
        // failure.
        assert_eq!(desk.commands_sent(), 2);
    }

    #[tokio::test]
    async fn descends_when_above_target() {
        let desk = SimulatedDesk::new(120.0, 0.5);
        PositionController::new(&desk, fast_config())
            .move_to(80.0)
            .await
            .unwrap();

        let state = desk.state.lock().unwrap();
        assert!(state.commands.iter().all(|&d| d == Direction::Down));
    }
}
