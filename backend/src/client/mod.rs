//! Library side of the pairing core: a JSON API client, the relay channel,
//! and the cached pairing controller an application embeds.

pub mod api;
pub mod channel;
pub mod controller;

pub use api::{ClientError, PairingApi};
pub use controller::{PairingController, PairingState};
