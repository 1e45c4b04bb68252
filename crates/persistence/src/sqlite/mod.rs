//! SQLite database management

mod accounts;
mod connection;
mod verifications;

pub use accounts::*;
pub use connection::Database;
pub use verifications::*;
