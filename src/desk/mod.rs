pub mod bluetooth;
pub mod controller;
pub mod error;
pub mod link;
pub mod protocol;
pub mod session;

pub use error::DeskError;
pub use protocol::{MAX_HEIGHT_CM, MIN_HEIGHT_CM};
pub use session::DeskSession;
