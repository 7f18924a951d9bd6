//! Instruction handlers

pub mod admin;
pub mod game;
pub mod payout;

pub use admin::*;
pub use game::*;
pub use payout::*;
