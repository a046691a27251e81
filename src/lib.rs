pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::ScorerConfig;

pub use crate::core::live::{LiveMatch, LiveMatchHandle};
pub use crate::core::reducer::{reduce, Action, Transition};
pub use crate::core::session::{Control, MatchSession, RaidEntry};
pub use utils::error::{Result, ScorerError};
