use crate::domain::model::TeamId;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TossChoice {
    /// Winner raids first.
    Raid,
    /// Winner picks a court side; the other team raids first.
    Court,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TossResult {
    pub winner: TeamId,
    pub choice: TossChoice,
}

impl TossResult {
    pub fn first_raiding_team(&self) -> TeamId {
        match self.choice {
            TossChoice::Raid => self.winner,
            TossChoice::Court => self.winner.other(),
        }
    }
}

pub fn flip<R: Rng + ?Sized>(rng: &mut R) -> TeamId {
    if rng.gen_bool(0.5) {
        TeamId::TeamA
    } else {
        TeamId::TeamB
    }
}
