#![doc = include_str!("../README.md")]

mod base56;
mod error;
mod generator;
mod hash;
mod id;
mod leaderboard;
mod mono_clock;
mod service;
mod session;
mod time;

pub use crate::base56::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::id::*;
pub use crate::leaderboard::*;
pub use crate::mono_clock::*;
pub use crate::service::*;
pub use crate::session::*;
pub use crate::time::*;
