mod config;
mod ranking;
mod store;

pub use config::*;
pub use ranking::RankedStake;
pub use store::*;
