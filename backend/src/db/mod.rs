pub mod connection;
pub mod couples;
pub mod events;
pub mod migrations;
pub mod users;

pub use connection::{DatabaseConfig, get_db_pool};
