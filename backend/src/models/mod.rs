pub mod couples;
pub mod events;
pub mod users;

pub use couples::{Couple, CoupleWithPartner, IncomingRequest, PairRequest, ordered_pair};
pub use events::{CoupleEvent, EventKind, Position};
pub use users::{User, UserPublic};
