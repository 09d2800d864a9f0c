pub mod protocol;
pub mod registry;
pub mod ws;

pub use protocol::{ClientMessage, ServerMessage};
pub use registry::RoomRegistry;
