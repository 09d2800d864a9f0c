pub mod events;
pub mod pairing;

use serde::Serialize;

/// Plain success acknowledgement for operations with nothing else to return.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Self { success: true }
    }
}
