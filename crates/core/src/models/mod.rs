//! Data models: reconciliation primitives and backend responses

mod account;
mod envelope;
mod history;
mod lenient;
mod mission;
mod poll;
mod reward;
mod rule;
mod snapshot;
mod user;
mod vip;
mod wallet;

pub use account::*;
pub use envelope::*;
pub use history::*;
pub use mission::*;
pub use poll::*;
pub use reward::*;
pub use rule::*;
pub use snapshot::*;
pub use user::*;
pub use vip::*;
pub use wallet::*;
