//! One match being scored.
//!
//! `MatchSession` is the calling layer around the reducer: it owns the
//! state, rejects input the scorer's table should never submit, queues
//! snapshots for persistence and keeps track of the raider whose countdown
//! is running.

use crate::core::raid::RaidOutcome;
use crate::core::reducer::{Action, Transition};
use crate::core::setup::{register_player, Registration};
use crate::core::toss::TossResult;
use crate::domain::model::{
    MatchRules, MatchState, MatchStatus, Player, PlayerId, RaidData, TeamId,
};
use crate::domain::ports::{MatchStore, PlayerDirectory};
use crate::utils::error::{Result, ScorerError};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

enum PersistRequest {
    Save(Box<MatchState>),
    Flush(oneshot::Sender<()>),
}

/// Ordered, fire-and-forget writer for one match. Failures are logged and
/// never reach the scoring path.
#[derive(Debug)]
pub struct Persister {
    tx: mpsc::UnboundedSender<PersistRequest>,
}

impl std::fmt::Debug for PersistRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistRequest::Save(_) => f.write_str("Save"),
            PersistRequest::Flush(_) => f.write_str("Flush"),
        }
    }
}

impl Persister {
    pub fn spawn(store: Arc<dyn MatchStore>, match_id: String) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<PersistRequest>();
        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                match request {
                    PersistRequest::Save(state) => {
                        if let Err(e) = store.save(&match_id, &state).await {
                            tracing::warn!(
                                "Saving match {} failed: {} ({})",
                                match_id,
                                e,
                                e.recovery_suggestion()
                            );
                        }
                    }
                    PersistRequest::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
            tracing::debug!("Persistence writer for {} stopped", match_id);
        });
        Self { tx }
    }

    pub fn save(&self, state: &MatchState) {
        if self
            .tx
            .send(PersistRequest::Save(Box::new(state.clone())))
            .is_err()
        {
            tracing::warn!("Persistence writer is gone; snapshot dropped");
        }
    }

    /// Resolves once every snapshot queued before this call was handled.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(PersistRequest::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }
}

/// Session-level commands that need no collaborator round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    RenameTeam { team: TeamId, name: String },
    RemovePlayer { team: TeamId, player_id: PlayerId },
    Toss(TossResult),
    StartMatch,
    TogglePause,
    TakeTimeout(TeamId),
    StartSecondHalf,
    BeginRaid(PlayerId),
    EndMatch,
}

/// A raid as entered at the table, before it is checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RaidEntry {
    pub raider_id: PlayerId,
    pub touched_player_ids: Vec<PlayerId>,
    pub bonus: bool,
    pub tackled: bool,
    pub tackler_id: Option<PlayerId>,
}

impl RaidEntry {
    pub fn new(raider_id: impl Into<PlayerId>) -> Self {
        Self {
            raider_id: raider_id.into(),
            ..Self::default()
        }
    }

    pub fn touch(mut self, defender_id: impl Into<PlayerId>) -> Self {
        self.touched_player_ids.push(defender_id.into());
        self
    }

    pub fn bonus(mut self) -> Self {
        self.bonus = true;
        self
    }

    pub fn tackled_by(mut self, tackler_id: impl Into<PlayerId>) -> Self {
        self.tackled = true;
        self.tackler_id = Some(tackler_id.into());
        self
    }

    /// A tackle wipes any touches or bonus ticked on the same entry.
    pub fn into_raid_data(self) -> Result<RaidData> {
        if self.tackled {
            let tackler = self
                .tackler_id
                .ok_or_else(|| ScorerError::validation("Please select the tackler."))?;
            return Ok(RaidData::tackled(self.raider_id, tackler));
        }
        Ok(RaidData {
            raider_id: self.raider_id,
            touched_player_ids: self.touched_player_ids,
            bonus: self.bonus,
            tackled_by_id: None,
        })
    }
}

pub struct MatchSession {
    match_id: String,
    state: MatchState,
    persister: Option<Persister>,
    directory: Option<Arc<dyn PlayerDirectory>>,
    pending_raider: Option<PlayerId>,
}

impl MatchSession {
    pub fn new(match_id: impl Into<String>, rules: MatchRules) -> Self {
        Self::from_state(match_id, MatchState::new(rules))
    }

    pub fn from_state(match_id: impl Into<String>, state: MatchState) -> Self {
        Self {
            match_id: match_id.into(),
            state,
            persister: None,
            directory: None,
            pending_raider: None,
        }
    }

    /// Picks up a stored match, or starts a new one when there is none or
    /// the store cannot be read.
    pub async fn resume(
        match_id: impl Into<String>,
        rules: MatchRules,
        store: Arc<dyn MatchStore>,
    ) -> Self {
        let match_id = match_id.into();
        let state = match store.load(&match_id).await {
            Ok(Some(state)) => {
                tracing::info!(
                    "Resumed match {} ({}, half {}, {}s left)",
                    match_id,
                    state.status,
                    state.current_half,
                    state.timer
                );
                state
            }
            Ok(None) => {
                tracing::info!("Starting new match {}", match_id);
                MatchState::new(rules)
            }
            Err(e) => {
                tracing::warn!("Loading match {} failed, starting fresh: {}", match_id, e);
                MatchState::new(rules)
            }
        };
        Self::from_state(match_id, state).with_store(store)
    }

    pub fn with_store(mut self, store: Arc<dyn MatchStore>) -> Self {
        self.persister = Some(Persister::spawn(store, self.match_id.clone()));
        self
    }

    pub fn with_directory(mut self, directory: Arc<dyn PlayerDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn pending_raider(&self) -> Option<&str> {
        self.pending_raider.as_deref()
    }

    /// Applies one action and queues the new state for persistence.
    pub fn dispatch(&mut self, action: Action) -> Result<Transition> {
        let transition = self.state.apply(&action, Utc::now())?;
        if transition.changed() {
            tracing::debug!(action = action.name(), status = %self.state.status, "applied");
            if let Some(persister) = &self.persister {
                persister.save(&self.state);
            }
        }
        Ok(transition)
    }

    pub async fn flush(&self) {
        if let Some(persister) = &self.persister {
            persister.flush().await;
        }
    }

    fn reject<T>(&self, message: impl Into<String>) -> Result<T> {
        let err = ScorerError::validation(message);
        tracing::warn!("Rejected: {}", err);
        Err(err)
    }

    pub async fn add_player(
        &mut self,
        team: TeamId,
        name: &str,
        phone_number: Option<&str>,
    ) -> Result<Registration> {
        let name = name.trim();
        if name.is_empty() {
            return self.reject("Player name cannot be empty.");
        }
        let roster_size = self.state.rules.roster_size;
        if self.state.team(team).players.len() >= roster_size {
            return self.reject(format!(
                "A team can have a maximum of {} players.",
                roster_size
            ));
        }

        let registration = match &self.directory {
            Some(directory) => register_player(directory.as_ref(), name, phone_number).await,
            None => Registration::LocalOnly(Player::with_generated_id(name)),
        };

        let id = &registration.player().id;
        for side in [TeamId::TeamA, TeamId::TeamB] {
            if self.state.team(side).player(id).is_some() {
                return self.reject(format!(
                    "{} is already on {}.",
                    name,
                    self.state.team(side).name
                ));
            }
        }

        self.dispatch(Action::AddPlayer {
            team,
            player: registration.player().clone(),
        })?;
        Ok(registration)
    }

    pub fn control(&mut self, control: Control) -> Result<()> {
        match control {
            Control::RenameTeam { team, name } => {
                self.dispatch(Action::UpdateTeamName { team, name })?;
            }
            Control::RemovePlayer { team, player_id } => {
                let transition = self.dispatch(Action::RemovePlayer { team, player_id })?;
                if !transition.changed() {
                    return self.reject("No such player on that team.");
                }
            }
            Control::Toss(result) => self.apply_toss(result)?,
            Control::StartMatch => self.start_match()?,
            Control::TogglePause => self.toggle_pause()?,
            Control::TakeTimeout(team) => self.take_timeout(team)?,
            Control::StartSecondHalf => self.start_second_half()?,
            Control::BeginRaid(raider_id) => self.begin_raid(raider_id)?,
            Control::EndMatch => self.end_match()?,
        }
        Ok(())
    }

    pub fn apply_toss(&mut self, result: TossResult) -> Result<()> {
        if self.state.status != MatchStatus::Setup {
            return self.reject("The toss happens before the match starts.");
        }
        let first = result.first_raiding_team();
        self.dispatch(Action::SetRaidingTeam { team: first })?;
        tracing::info!(
            "{} won the toss and chose {:?}; {} raids first",
            self.state.team(result.winner).name,
            result.choice,
            self.state.team(first).name
        );
        Ok(())
    }

    pub fn start_match(&mut self) -> Result<()> {
        if self.state.status != MatchStatus::Setup {
            return self.reject("The match has already started.");
        }
        let roster_size = self.state.rules.roster_size;
        if self.state.teams.team_a.players.len() < roster_size
            || self.state.teams.team_b.players.len() < roster_size
        {
            return self.reject(format!(
                "Both teams must have at least {} players to start.",
                roster_size
            ));
        }
        self.dispatch(Action::StartMatch)?;
        tracing::info!(
            "Match {} started: {} vs {}",
            self.match_id,
            self.state.teams.team_a.name,
            self.state.teams.team_b.name
        );
        Ok(())
    }

    pub fn toggle_pause(&mut self) -> Result<()> {
        if !matches!(
            self.state.status,
            MatchStatus::Playing | MatchStatus::Paused
        ) {
            return self.reject(format!("Cannot pause while {}.", self.state.status));
        }
        self.dispatch(Action::TogglePause)?;
        Ok(())
    }

    pub fn take_timeout(&mut self, team: TeamId) -> Result<()> {
        if !matches!(
            self.state.status,
            MatchStatus::Playing | MatchStatus::Paused
        ) {
            return self.reject("Timeouts can only be taken during play.");
        }
        let side = self.state.team(team);
        if side.timeouts == 0 {
            return self.reject(format!("{} has no timeouts remaining.", side.name));
        }
        self.dispatch(Action::TakeTimeout { team })?;
        tracing::info!("{} took a timeout", self.state.team(team).name);
        Ok(())
    }

    pub fn start_second_half(&mut self) -> Result<()> {
        if self.state.status != MatchStatus::Halftime {
            return self.reject("The second half starts from half-time only.");
        }
        self.pending_raider = None;
        self.dispatch(Action::StartHalfTime)?;
        tracing::info!("Second half started");
        Ok(())
    }

    pub fn end_match(&mut self) -> Result<()> {
        if self.state.status == MatchStatus::Finished {
            return self.reject("The match is already finished.");
        }
        self.pending_raider = None;
        self.dispatch(Action::EndMatch)?;
        tracing::info!(
            "Match {} ended: {} {} - {} {}",
            self.match_id,
            self.state.teams.team_a.name,
            self.state.teams.team_a.score,
            self.state.teams.team_b.score,
            self.state.teams.team_b.name
        );
        Ok(())
    }

    /// Selects the raider and starts the raid countdown.
    pub fn begin_raid(&mut self, raider_id: PlayerId) -> Result<()> {
        if self.state.status != MatchStatus::Playing {
            return self.reject("Raids start only while the clock is running.");
        }
        if self.state.raid_timer.is_some() {
            return self.reject("A raid is already in progress.");
        }
        self.check_participants(&RaidData::empty(raider_id.clone()))?;
        self.pending_raider = Some(raider_id);
        self.dispatch(Action::StartRaidTimer)?;
        Ok(())
    }

    /// Raider must be active on the raiding side; touched players and the
    /// tackler must be active defenders.
    fn check_participants(&self, raid: &RaidData) -> Result<()> {
        let raiding = self.state.team(self.state.raiding_team);
        match raiding.player(&raid.raider_id) {
            Some(p) if p.is_active() => {}
            Some(p) => return self.reject(format!("{} is out and cannot raid.", p.name)),
            None => return self.reject(format!("The raider must come from {}.", raiding.name)),
        }

        let defending = self.state.team(self.state.defending_team());
        let defenders = raid
            .touched_player_ids
            .iter()
            .chain(raid.tackled_by_id.iter());
        for id in defenders {
            match defending.player(id) {
                Some(p) if p.is_active() => {}
                Some(p) => return self.reject(format!("{} is already out.", p.name)),
                None => {
                    return self.reject(format!("Defenders must come from {}.", defending.name))
                }
            }
        }
        Ok(())
    }

    pub fn submit_raid(&mut self, entry: RaidEntry) -> Result<RaidOutcome> {
        if !matches!(
            self.state.status,
            MatchStatus::Playing | MatchStatus::Paused
        ) {
            return self.reject(format!("Raids cannot be scored while {}.", self.state.status));
        }
        let raid = match entry.into_raid_data() {
            Ok(raid) => raid,
            Err(e) => {
                tracing::warn!("Rejected: {}", e);
                return Err(e);
            }
        };
        self.check_participants(&raid)?;

        let defending = self.state.team(self.state.defending_team());
        let min_defenders = self.state.rules.bonus_min_defenders;
        if raid.bonus && raid.tackled_by_id.is_none() && defending.active_count() < min_defenders {
            return self.reject(format!(
                "A bonus needs at least {} active defenders.",
                min_defenders
            ));
        }

        self.process_raid(raid)
    }

    fn process_raid(&mut self, raid: RaidData) -> Result<RaidOutcome> {
        let transition = self.dispatch(Action::ProcessRaid(raid))?;
        self.pending_raider = None;
        self.dispatch(Action::EndRaidTimer)?;

        match transition {
            Transition::Raid(outcome) => {
                tracing::info!("{}", outcome.summary);
                Ok(outcome)
            }
            _ => self.reject("The raid could not be recorded."),
        }
    }

    /// One second of match clock.
    pub fn tick(&mut self) -> Result<Transition> {
        let before = self.state.status;
        let transition = self.dispatch(Action::Tick)?;
        if self.state.status != before {
            self.pending_raider = None;
            tracing::info!(
                "Clock expired in half {}: {} {} - {} {}",
                self.state.current_half,
                self.state.teams.team_a.name,
                self.state.teams.team_a.score,
                self.state.teams.team_b.score,
                self.state.teams.team_b.name
            );
        }
        Ok(transition)
    }

    /// One second of raid countdown. An expired raid is scored as an empty
    /// raid for the selected raider.
    pub fn raid_tick(&mut self) -> Result<Option<RaidOutcome>> {
        self.dispatch(Action::DecrementRaidTimer)?;
        if self.state.raid_timer != Some(0) {
            return Ok(None);
        }

        match self.pending_raider.take() {
            Some(raider_id) => {
                tracing::info!("Raid time expired");
                self.process_raid(RaidData::empty(raider_id)).map(Some)
            }
            None => {
                self.dispatch(Action::EndRaidTimer)?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> MatchRules {
        MatchRules {
            roster_size: 2,
            bonus_min_defenders: 2,
            raid_duration_seconds: 2,
            ..MatchRules::default()
        }
    }

    async fn ready_session() -> MatchSession {
        let mut session = MatchSession::new("unit", rules());
        for (team, name) in [
            (TeamId::TeamA, "Pardeep"),
            (TeamId::TeamA, "Naveen"),
            (TeamId::TeamB, "Fazel"),
            (TeamId::TeamB, "Surjeet"),
        ] {
            session.add_player(team, name, None).await.unwrap();
        }
        session
    }

    fn id_of(session: &MatchSession, team: TeamId, name: &str) -> PlayerId {
        session
            .state()
            .team(team)
            .player_by_name(name)
            .unwrap()
            .id
            .clone()
    }

    #[tokio::test]
    async fn test_roster_rules_are_enforced() {
        let mut session = ready_session().await;

        let empty = session.add_player(TeamId::TeamA, "   ", None).await;
        assert!(matches!(empty, Err(ScorerError::ValidationError { .. })));

        let full = session.add_player(TeamId::TeamA, "Rohit", None).await;
        assert!(full.is_err());
        assert_eq!(session.state().teams.team_a.players.len(), 2);
    }

    #[tokio::test]
    async fn test_start_needs_full_rosters() {
        let mut session = MatchSession::new("unit", rules());
        session.add_player(TeamId::TeamA, "Pardeep", None).await.unwrap();
        assert!(session.start_match().is_err());
        assert_eq!(session.state().status, MatchStatus::Setup);
    }

    #[tokio::test]
    async fn test_tackle_without_tackler_is_rejected() {
        let mut session = ready_session().await;
        session.start_match().unwrap();
        let raider = id_of(&session, TeamId::TeamA, "Pardeep");

        let mut entry = RaidEntry::new(raider);
        entry.tackled = true;
        let err = session.submit_raid(entry).unwrap_err();
        assert_eq!(err.user_friendly_message(), "Please select the tackler.");
        assert_eq!(session.state().match_history.len(), 1);
    }

    #[tokio::test]
    async fn test_bonus_needs_enough_defenders() {
        let mut session = ready_session().await;
        session.start_match().unwrap();
        let raider = id_of(&session, TeamId::TeamA, "Pardeep");
        let fazel = id_of(&session, TeamId::TeamB, "Fazel");

        session
            .submit_raid(RaidEntry::new(raider.clone()).touch(fazel))
            .unwrap();
        // Team B raids, then Team A again with only one active defender.
        let b_raider = id_of(&session, TeamId::TeamB, "Surjeet");
        session.submit_raid(RaidEntry::new(b_raider)).unwrap();

        let err = session.submit_raid(RaidEntry::new(raider).bonus());
        assert!(err.is_err());
        assert_eq!(session.state().raiding_team, TeamId::TeamA);
    }

    #[tokio::test]
    async fn test_expired_raid_is_scored_empty() {
        let mut session = ready_session().await;
        session.start_match().unwrap();
        let raider = id_of(&session, TeamId::TeamA, "Naveen");

        session.begin_raid(raider.clone()).unwrap();
        assert_eq!(session.state().raid_timer, Some(2));
        assert_eq!(session.raid_tick().unwrap(), None);
        let outcome = session.raid_tick().unwrap().expect("raid should expire");

        assert_eq!(outcome.points_scored, 0);
        assert_eq!(session.state().raid_timer, None);
        assert_eq!(session.pending_raider(), None);
        assert_eq!(session.state().raiding_team, TeamId::TeamB);
        let naveen = session.state().team(TeamId::TeamA).player(&raider).unwrap();
        assert_eq!(naveen.stats.empty_raids, 1);
    }

    #[tokio::test]
    async fn test_begin_raid_checks_raider() {
        let mut session = ready_session().await;
        let raider = id_of(&session, TeamId::TeamA, "Naveen");
        assert!(session.begin_raid(raider.clone()).is_err());

        session.start_match().unwrap();
        let wrong_side = id_of(&session, TeamId::TeamB, "Fazel");
        assert!(session.begin_raid(wrong_side).is_err());
        session.begin_raid(raider.clone()).unwrap();
        assert!(session.begin_raid(raider).is_err());
    }

    #[tokio::test]
    async fn test_timeouts_run_out() {
        let mut session = ready_session().await;
        session.start_match().unwrap();
        session.take_timeout(TeamId::TeamB).unwrap();
        session.take_timeout(TeamId::TeamB).unwrap();

        let err = session.take_timeout(TeamId::TeamB).unwrap_err();
        assert_eq!(
            err.user_friendly_message(),
            "Team B has no timeouts remaining."
        );
    }

    #[tokio::test]
    async fn test_raids_only_count_during_play() {
        let mut session = ready_session().await;
        let raider = id_of(&session, TeamId::TeamA, "Pardeep");
        let fazel = id_of(&session, TeamId::TeamB, "Fazel");

        let err = session.submit_raid(RaidEntry::new(raider.clone()).touch(fazel.clone()));
        assert!(matches!(err, Err(ScorerError::ValidationError { .. })));
        assert_eq!(session.state().teams.team_a.score, 0);
        assert!(session.state().team(TeamId::TeamB).player(&fazel).unwrap().is_active());

        session.start_match().unwrap();
        session.toggle_pause().unwrap();
        session
            .submit_raid(RaidEntry::new(raider.clone()).touch(fazel))
            .unwrap();
        assert_eq!(session.state().teams.team_a.score, 1);

        session.end_match().unwrap();
        assert!(session.submit_raid(RaidEntry::new(raider)).is_err());
    }

    #[tokio::test]
    async fn test_touching_an_out_defender_is_rejected() {
        let mut session = ready_session().await;
        session.start_match().unwrap();
        let pardeep = id_of(&session, TeamId::TeamA, "Pardeep");
        let naveen = id_of(&session, TeamId::TeamA, "Naveen");
        let fazel = id_of(&session, TeamId::TeamB, "Fazel");
        let surjeet = id_of(&session, TeamId::TeamB, "Surjeet");

        session
            .submit_raid(RaidEntry::new(pardeep).touch(fazel.clone()))
            .unwrap();
        session.submit_raid(RaidEntry::new(surjeet)).unwrap();
        let before = session.state().clone();

        let err = session.submit_raid(RaidEntry::new(naveen.clone()).touch(fazel.clone()));
        assert!(err.is_err());
        let err = session.submit_raid(RaidEntry::new(naveen).tackled_by(fazel.clone()));
        assert!(err.is_err());
        assert_eq!(session.state(), &before);
        let fazel = session.state().team(TeamId::TeamB).player(&fazel).unwrap();
        assert_eq!(fazel.out_order, Some(0));
    }

    #[tokio::test]
    async fn test_out_or_foreign_raider_is_rejected() {
        let mut session = ready_session().await;
        session.start_match().unwrap();
        let pardeep = id_of(&session, TeamId::TeamA, "Pardeep");
        let naveen = id_of(&session, TeamId::TeamA, "Naveen");
        let fazel = id_of(&session, TeamId::TeamB, "Fazel");
        let surjeet = id_of(&session, TeamId::TeamB, "Surjeet");

        assert!(session.submit_raid(RaidEntry::new(fazel.clone())).is_err());
        assert!(session
            .submit_raid(RaidEntry::new(pardeep.clone()).touch(naveen))
            .is_err());

        // Fazel tackles Pardeep, so Pardeep is out when Team A raids again.
        session
            .submit_raid(RaidEntry::new(pardeep.clone()).tackled_by(fazel))
            .unwrap();
        session.submit_raid(RaidEntry::new(surjeet)).unwrap();
        let err = session.submit_raid(RaidEntry::new(pardeep)).unwrap_err();
        assert!(err.user_friendly_message().contains("cannot raid"));
        assert_eq!(session.state().raiding_team, TeamId::TeamA);
    }
}
