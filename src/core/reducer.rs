//! Match state transitions.
//!
//! `MatchState::apply` is the single place the match moves forward. It is
//! synchronous and deterministic given the timestamp it is handed; guards
//! for expected conditions (clock already at zero, no timeouts left, wrong
//! status) turn the action into a no-op instead of an error.

use crate::core::raid::{resolve_raid, RaidOutcome};
use crate::domain::model::{
    EventKind, MatchEvent, MatchState, MatchStatus, Player, PlayerId, RaidData, TeamId,
};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};

pub const MATCH_STARTED: &str = "Match started";
pub const FIRST_HALF_ENDED: &str = "First half ended";
pub const MATCH_FINISHED: &str = "Match finished";
pub const SECOND_HALF_STARTED: &str = "Second half started";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    AddPlayer { team: TeamId, player: Player },
    RemovePlayer { team: TeamId, player_id: PlayerId },
    UpdateTeamName { team: TeamId, name: String },
    /// Toss result: who raids first.
    SetRaidingTeam { team: TeamId },
    StartMatch,
    Tick,
    TogglePause,
    TakeTimeout { team: TeamId },
    StartHalfTime,
    ProcessRaid(RaidData),
    EndMatch,
    StartRaidTimer,
    DecrementRaidTimer,
    EndRaidTimer,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::AddPlayer { .. } => "add_player",
            Action::RemovePlayer { .. } => "remove_player",
            Action::UpdateTeamName { .. } => "update_team_name",
            Action::SetRaidingTeam { .. } => "set_raiding_team",
            Action::StartMatch => "start_match",
            Action::Tick => "tick",
            Action::TogglePause => "toggle_pause",
            Action::TakeTimeout { .. } => "take_timeout",
            Action::StartHalfTime => "start_half_time",
            Action::ProcessRaid(_) => "process_raid",
            Action::EndMatch => "end_match",
            Action::StartRaidTimer => "start_raid_timer",
            Action::DecrementRaidTimer => "decrement_raid_timer",
            Action::EndRaidTimer => "end_raid_timer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Guarded out; the state is exactly as before.
    Ignored,
    Applied,
    Raid(RaidOutcome),
}

impl Transition {
    pub fn changed(&self) -> bool {
        !matches!(self, Transition::Ignored)
    }
}

impl MatchState {
    pub fn apply(&mut self, action: &Action, now: DateTime<Utc>) -> Result<Transition> {
        if self.status == MatchStatus::Finished {
            return Ok(Transition::Ignored);
        }

        let transition = match action {
            Action::AddPlayer { team, player } => {
                self.teams.get_mut(*team).players.push(player.clone());
                Transition::Applied
            }
            Action::RemovePlayer { team, player_id } => {
                let players = &mut self.teams.get_mut(*team).players;
                let before = players.len();
                players.retain(|p| &p.id != player_id);
                if players.len() == before {
                    Transition::Ignored
                } else {
                    Transition::Applied
                }
            }
            Action::UpdateTeamName { team, name } => {
                self.teams.get_mut(*team).name = name.clone();
                Transition::Applied
            }
            Action::SetRaidingTeam { team } => {
                if self.status != MatchStatus::Setup {
                    return Ok(Transition::Ignored);
                }
                self.raiding_team = *team;
                Transition::Applied
            }
            Action::StartMatch => {
                if self.status != MatchStatus::Setup {
                    return Ok(Transition::Ignored);
                }
                self.status = MatchStatus::Playing;
                self.match_history = vec![MatchEvent::new(EventKind::Start, MATCH_STARTED, now)];
                Transition::Applied
            }
            Action::Tick => self.tick(now),
            Action::TogglePause => match self.status {
                MatchStatus::Playing => {
                    self.status = MatchStatus::Paused;
                    Transition::Applied
                }
                MatchStatus::Paused => {
                    self.status = MatchStatus::Playing;
                    Transition::Applied
                }
                _ => Transition::Ignored,
            },
            Action::TakeTimeout { team } => self.take_timeout(*team, now),
            Action::StartHalfTime => self.start_half_time(now),
            Action::ProcessRaid(raid) => {
                let outcome =
                    resolve_raid(&mut self.teams, self.raiding_team, &mut self.out_counter, raid)?;
                self.match_history
                    .push(MatchEvent::new(EventKind::Raid, outcome.summary.clone(), now));
                self.raiding_team = self.raiding_team.other();
                Transition::Raid(outcome)
            }
            Action::EndMatch => {
                self.status = MatchStatus::Finished;
                self.raid_timer = None;
                Transition::Applied
            }
            Action::StartRaidTimer => {
                self.raid_timer = Some(self.rules.raid_duration_seconds);
                Transition::Applied
            }
            Action::DecrementRaidTimer => match self.raid_timer {
                Some(remaining) if remaining > 0 => {
                    self.raid_timer = Some(remaining - 1);
                    Transition::Applied
                }
                _ => Transition::Ignored,
            },
            Action::EndRaidTimer => match self.raid_timer.take() {
                Some(_) => Transition::Applied,
                None => Transition::Ignored,
            },
        };

        Ok(transition)
    }

    fn tick(&mut self, now: DateTime<Utc>) -> Transition {
        if self.status != MatchStatus::Playing || self.timer == 0 {
            return Transition::Ignored;
        }

        self.timer -= 1;
        if self.timer == 0 {
            let (status, kind, summary) = if self.current_half == 1 {
                (MatchStatus::Halftime, EventKind::Half, FIRST_HALF_ENDED)
            } else {
                (MatchStatus::Finished, EventKind::End, MATCH_FINISHED)
            };
            self.status = status;
            self.raid_timer = None;
            self.match_history.push(MatchEvent::new(kind, summary, now));
        }
        Transition::Applied
    }

    fn take_timeout(&mut self, team_id: TeamId, now: DateTime<Utc>) -> Transition {
        if !matches!(self.status, MatchStatus::Playing | MatchStatus::Paused) {
            return Transition::Ignored;
        }
        let team = self.teams.get_mut(team_id);
        if team.timeouts == 0 {
            return Transition::Ignored;
        }

        team.timeouts -= 1;
        let summary = format!("{} took a timeout.", team.name);
        self.status = MatchStatus::Paused;
        self.match_history
            .push(MatchEvent::new(EventKind::Timeout, summary, now));
        Transition::Applied
    }

    fn start_half_time(&mut self, now: DateTime<Utc>) -> Transition {
        if self.status != MatchStatus::Halftime {
            return Transition::Ignored;
        }

        let timeouts = self.rules.timeouts_per_half;
        for team in self.teams.iter_mut() {
            team.timeouts = timeouts;
            team.revive_all();
        }
        self.status = MatchStatus::Playing;
        self.current_half = 2;
        self.timer = self.rules.half_duration_seconds;
        self.raiding_team = self.raiding_team.other();
        self.out_counter = 0;
        self.raid_timer = None;
        self.match_history
            .push(MatchEvent::new(EventKind::Half, SECOND_HALF_STARTED, now));
        Transition::Applied
    }
}

/// Pure form of [`MatchState::apply`]: the input is never modified.
pub fn reduce(state: &MatchState, action: &Action, now: DateTime<Utc>) -> Result<MatchState> {
    let mut next = state.clone();
    next.apply(action, now)?;
    Ok(next)
}
