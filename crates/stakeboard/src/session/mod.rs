mod config;
mod store;
mod sweeper;
#[cfg(test)]
mod tests;

pub use config::*;
pub use store::*;
pub use sweeper::*;
