use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type PlayerId = String;

pub const DEFAULT_HALF_DURATION_SECONDS: u32 = 20 * 60;
pub const DEFAULT_TIMEOUTS_PER_HALF: u32 = 2;
pub const DEFAULT_RAID_DURATION_SECONDS: u32 = 30;
pub const DEFAULT_ROSTER_SIZE: usize = 7;
pub const DEFAULT_BONUS_MIN_DEFENDERS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamId {
    #[serde(rename = "teamA")]
    TeamA,
    #[serde(rename = "teamB")]
    TeamB,
}

impl TeamId {
    pub fn other(self) -> TeamId {
        match self {
            TeamId::TeamA => TeamId::TeamB,
            TeamId::TeamB => TeamId::TeamA,
        }
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamId::TeamA => f.write_str("teamA"),
            TeamId::TeamB => f.write_str("teamB"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    Active,
    Out,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub raid_points: u32,
    pub tackle_points: u32,
    pub total_raids: u32,
    pub successful_raids: u32,
    pub unsuccessful_raids: u32,
    pub empty_raids: u32,
    pub super_raids: u32,
    pub super_tackles: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub status: PlayerStatus,
    /// Revival priority; set exactly while the player is out.
    pub out_order: Option<u32>,
    #[serde(default)]
    pub stats: PlayerStats,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: PlayerStatus::Active,
            out_order: None,
            stats: PlayerStats::default(),
        }
    }

    /// A player with a freshly generated identity.
    pub fn with_generated_id(name: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), name)
    }

    pub fn is_active(&self) -> bool {
        self.status == PlayerStatus::Active
    }

    pub fn is_out(&self) -> bool {
        self.status == PlayerStatus::Out
    }

    pub(crate) fn put_out(&mut self, order: u32) {
        self.status = PlayerStatus::Out;
        self.out_order = Some(order);
    }

    pub(crate) fn revive(&mut self) {
        self.status = PlayerStatus::Active;
        self.out_order = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub name: String,
    pub score: u32,
    pub players: Vec<Player>,
    pub timeouts: u32,
}

impl Team {
    pub fn new(name: impl Into<String>, timeouts: u32) -> Self {
        Self {
            name: name.into(),
            score: 0,
            players: Vec::new(),
            timeouts,
        }
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn player_by_name(&self, name: &str) -> Option<&Player> {
        self.players
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn active_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_active()).count()
    }

    pub fn out_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_out()).count()
    }

    pub fn revive_all(&mut self) {
        for player in &mut self.players {
            player.revive();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teams {
    #[serde(rename = "teamA")]
    pub team_a: Team,
    #[serde(rename = "teamB")]
    pub team_b: Team,
}

impl Teams {
    pub fn get(&self, id: TeamId) -> &Team {
        match id {
            TeamId::TeamA => &self.team_a,
            TeamId::TeamB => &self.team_b,
        }
    }

    pub fn get_mut(&mut self, id: TeamId) -> &mut Team {
        match id {
            TeamId::TeamA => &mut self.team_a,
            TeamId::TeamB => &mut self.team_b,
        }
    }

    /// Borrows `(first, other)` mutably at the same time.
    pub fn pair_mut(&mut self, first: TeamId) -> (&mut Team, &mut Team) {
        match first {
            TeamId::TeamA => (&mut self.team_a, &mut self.team_b),
            TeamId::TeamB => (&mut self.team_b, &mut self.team_a),
        }
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Team> {
        [&mut self.team_a, &mut self.team_b].into_iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Setup,
    Playing,
    Paused,
    Halftime,
    Finished,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchStatus::Setup => "setup",
            MatchStatus::Playing => "playing",
            MatchStatus::Paused => "paused",
            MatchStatus::Halftime => "halftime",
            MatchStatus::Finished => "finished",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Raid,
    Penalty,
    Timeout,
    Half,
    Start,
    End,
    Tackle,
    Bonus,
    Technical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub summary: String,
    pub timestamp: DateTime<Utc>,
}

impl MatchEvent {
    pub fn new(kind: EventKind, summary: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            summary: summary.into(),
            timestamp,
        }
    }
}

/// Rules fixed when the match is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRules {
    pub half_duration_seconds: u32,
    pub timeouts_per_half: u32,
    pub raid_duration_seconds: u32,
    pub roster_size: usize,
    pub bonus_min_defenders: usize,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            half_duration_seconds: DEFAULT_HALF_DURATION_SECONDS,
            timeouts_per_half: DEFAULT_TIMEOUTS_PER_HALF,
            raid_duration_seconds: DEFAULT_RAID_DURATION_SECONDS,
            roster_size: DEFAULT_ROSTER_SIZE,
            bonus_min_defenders: DEFAULT_BONUS_MIN_DEFENDERS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchState {
    pub status: MatchStatus,
    pub teams: Teams,
    pub current_half: u8,
    pub timer: u32,
    pub raiding_team: TeamId,
    pub out_counter: u32,
    pub match_history: Vec<MatchEvent>,
    pub raid_timer: Option<u32>,
    #[serde(default)]
    pub rules: MatchRules,
}

impl MatchState {
    pub fn new(rules: MatchRules) -> Self {
        Self {
            status: MatchStatus::Setup,
            teams: Teams {
                team_a: Team::new("Team A", rules.timeouts_per_half),
                team_b: Team::new("Team B", rules.timeouts_per_half),
            },
            current_half: 1,
            timer: rules.half_duration_seconds,
            raiding_team: TeamId::TeamA,
            out_counter: 0,
            match_history: Vec::new(),
            raid_timer: None,
            rules,
        }
    }

    pub fn team(&self, id: TeamId) -> &Team {
        self.teams.get(id)
    }

    pub fn defending_team(&self) -> TeamId {
        self.raiding_team.other()
    }

    /// History for display, most recent first.
    pub fn recent_events(&self) -> impl Iterator<Item = &MatchEvent> {
        self.match_history.iter().rev()
    }
}

impl Default for MatchState {
    fn default() -> Self {
        Self::new(MatchRules::default())
    }
}

/// Raw facts of one raid as entered at the scorer's table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaidData {
    pub raider_id: PlayerId,
    pub touched_player_ids: Vec<PlayerId>,
    pub bonus: bool,
    pub tackled_by_id: Option<PlayerId>,
}

impl RaidData {
    /// No touches, no bonus, no tackle. Also how an expired raid is scored.
    pub fn empty(raider_id: impl Into<PlayerId>) -> Self {
        Self {
            raider_id: raider_id.into(),
            touched_player_ids: Vec::new(),
            bonus: false,
            tackled_by_id: None,
        }
    }

    pub fn touches<I, S>(raider_id: impl Into<PlayerId>, touched: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PlayerId>,
    {
        Self {
            touched_player_ids: touched.into_iter().map(Into::into).collect(),
            ..Self::empty(raider_id)
        }
    }

    pub fn tackled(raider_id: impl Into<PlayerId>, tackler_id: impl Into<PlayerId>) -> Self {
        Self {
            tackled_by_id: Some(tackler_id.into()),
            ..Self::empty(raider_id)
        }
    }

    pub fn with_bonus(mut self) -> Self {
        self.bonus = true;
        self
    }
}
