//! Database models split into domain-specific modules.

pub mod car;
pub mod chat;
pub mod common;
pub mod spot;
pub mod trip;
pub mod user;

pub use car::*;
pub use chat::*;
pub use common::*;
pub use spot::*;
pub use trip::*;
pub use user::*;
