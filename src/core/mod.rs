pub mod live;
pub mod raid;
pub mod reducer;
pub mod session;
pub mod setup;
pub mod toss;

pub use crate::domain::model::{MatchState, RaidData, TeamId};
pub use crate::domain::ports::{MatchStore, PlayerDirectory};
pub use crate::utils::error::Result;
