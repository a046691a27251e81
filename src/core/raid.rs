//! Raid outcome engine.
//!
//! Scores one raid against the two teams it is given: touches and bonus for
//! the raiding side, tackles for the defending side, then all-out and
//! revivals, then the raider's statistics.

use crate::domain::model::{Player, PlayerId, PlayerStatus, RaidData, Team, TeamId, Teams};
use crate::utils::error::{Result, ScorerError};

pub const SUPER_TACKLE_MAX_DEFENDERS: usize = 3;
pub const TACKLE_POINTS: u32 = 1;
pub const SUPER_TACKLE_POINTS: u32 = 2;
pub const ALL_OUT_BONUS: u32 = 2;
pub const SUPER_RAID_MIN_POINTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaidOutcome {
    /// Points credited to the raiding team for touches and bonus.
    pub points_scored: u32,
    /// Points credited to the defending team for a tackle.
    pub tackle_points: u32,
    pub tackled: bool,
    pub super_tackle: bool,
    pub all_out: bool,
    pub super_raid: bool,
    pub raiders_revived: usize,
    pub defenders_revived: usize,
    pub summary: String,
}

impl RaidOutcome {
    pub fn is_successful(&self) -> bool {
        self.points_scored > 0
    }
}

fn unknown_player(player_id: &str, team: TeamId) -> ScorerError {
    ScorerError::UnknownPlayerError {
        player_id: player_id.to_string(),
        team: team.to_string(),
    }
}

fn find_mut<'a>(team: &'a mut Team, player_id: &str, team_id: TeamId) -> Result<&'a mut Player> {
    team.player_mut(player_id)
        .ok_or_else(|| unknown_player(player_id, team_id))
}

fn next_out_order(out_counter: &mut u32) -> u32 {
    let order = *out_counter;
    *out_counter += 1;
    order
}

/// Revives up to `count` players who went out before `cutoff`, earliest first.
fn revive_earliest(team: &mut Team, count: usize, cutoff: u32) -> usize {
    let mut candidates: Vec<(u32, usize)> = team
        .players
        .iter()
        .enumerate()
        .filter_map(|(idx, p)| match (p.status, p.out_order) {
            (PlayerStatus::Out, Some(order)) if order < cutoff => Some((order, idx)),
            _ => None,
        })
        .collect();
    candidates.sort_unstable();

    let revived = candidates.len().min(count);
    for &(_, idx) in candidates.iter().take(revived) {
        team.players[idx].revive();
    }
    revived
}

/// Applies `raid` to `teams`, with `raiding_team` on the attack.
///
/// Every referenced id is resolved before anything is touched, so an unknown
/// raider, tackler or defender fails the whole raid and leaves `teams` and
/// `out_counter` as they were.
pub fn resolve_raid(
    teams: &mut Teams,
    raiding_team: TeamId,
    out_counter: &mut u32,
    raid: &RaidData,
) -> Result<RaidOutcome> {
    let defending_team = raiding_team.other();
    let (raiding, defending) = teams.pair_mut(raiding_team);

    let raider_name = raiding
        .player(&raid.raider_id)
        .map(|p| p.name.clone())
        .ok_or_else(|| unknown_player(&raid.raider_id, raiding_team))?;

    let tackler = match &raid.tackled_by_id {
        Some(id) => {
            let name = defending
                .player(id)
                .map(|p| p.name.clone())
                .ok_or_else(|| unknown_player(id, defending_team))?;
            Some((id, name))
        }
        None => None,
    };

    let mut touched: Vec<&PlayerId> = Vec::with_capacity(raid.touched_player_ids.len());
    if tackler.is_none() {
        for id in &raid.touched_player_ids {
            if defending.player(id).is_none() {
                return Err(unknown_player(id, defending_team));
            }
            if !touched.contains(&id) {
                touched.push(id);
            }
        }
    }

    // Players put out by this raid carry an order at or above the cutoff and
    // cannot be revived by it.
    let revival_cutoff = *out_counter;

    let mut summary = format!("{} raided.", raider_name);
    let mut points_scored = 0;
    let mut tackle_points = 0;
    let mut super_tackle = false;

    if let Some((tackler_id, tackler_name)) = &tackler {
        let order = next_out_order(out_counter);
        find_mut(raiding, &raid.raider_id, raiding_team)?.put_out(order);

        super_tackle = defending.active_count() <= SUPER_TACKLE_MAX_DEFENDERS;
        tackle_points = if super_tackle {
            SUPER_TACKLE_POINTS
        } else {
            TACKLE_POINTS
        };
        defending.score += tackle_points;
        summary.push_str(&format!(" Tackled by {}.", tackler_name));

        let stats = &mut find_mut(defending, tackler_id, defending_team)?.stats;
        stats.tackle_points += tackle_points;
        if super_tackle {
            stats.super_tackles += 1;
        }
    } else {
        for id in &touched {
            let order = next_out_order(out_counter);
            find_mut(defending, id, defending_team)?.put_out(order);
        }
        points_scored = touched.len() as u32;
        if !touched.is_empty() {
            summary.push_str(&format!(" Touched {} player(s).", touched.len()));
        }
        if raid.bonus {
            points_scored += 1;
            summary.push_str(" Bonus point taken.");
        }
    }

    raiding.score += points_scored;

    let all_out = !defending.players.is_empty() && defending.active_count() == 0;
    if all_out {
        raiding.score += ALL_OUT_BONUS;
        summary.push_str(" All Out!");
        defending.revive_all();
    }

    let raiders_revived = if tackler.is_some() {
        revive_earliest(raiding, 1, revival_cutoff)
    } else {
        0
    };
    let defenders_revived = if all_out {
        0
    } else {
        revive_earliest(defending, points_scored as usize, revival_cutoff)
    };

    let super_raid = points_scored >= SUPER_RAID_MIN_POINTS;
    let stats = &mut find_mut(raiding, &raid.raider_id, raiding_team)?.stats;
    stats.total_raids += 1;
    stats.raid_points += points_scored;
    if points_scored > 0 {
        stats.successful_raids += 1;
    } else if tackler.is_some() {
        stats.unsuccessful_raids += 1;
    } else {
        stats.empty_raids += 1;
    }
    if super_raid {
        stats.super_raids += 1;
        summary.push_str(" Super Raid!");
    }

    Ok(RaidOutcome {
        points_scored,
        tackle_points,
        tackled: tackler.is_some(),
        super_tackle,
        all_out,
        super_raid,
        raiders_revived,
        defenders_revived,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{MatchState, Player};

    fn seven_a_side() -> Teams {
        let mut state = MatchState::default();
        for i in 1..=7 {
            state
                .teams
                .team_a
                .players
                .push(Player::new(format!("a{i}"), format!("Raider {i}")));
            state
                .teams
                .team_b
                .players
                .push(Player::new(format!("b{i}"), format!("Defender {i}")));
        }
        state.teams
    }

    fn put_out(team: &mut Team, id: &str, order: u32) {
        team.player_mut(id).unwrap().put_out(order);
    }

    #[test]
    fn test_empty_raid_only_updates_raider_stats() {
        let mut teams = seven_a_side();
        let before = teams.clone();
        let mut counter = 0;

        let outcome =
            resolve_raid(&mut teams, TeamId::TeamA, &mut counter, &RaidData::empty("a1")).unwrap();

        assert_eq!(outcome.points_scored, 0);
        assert_eq!(outcome.summary, "Raider 1 raided.");
        assert_eq!(counter, 0);
        let raider = teams.team_a.player("a1").unwrap();
        assert_eq!(raider.stats.total_raids, 1);
        assert_eq!(raider.stats.empty_raids, 1);
        assert_eq!(raider.stats.successful_raids, 0);

        let mut expected = before;
        expected.team_a.player_mut("a1").unwrap().stats = raider.stats.clone();
        assert_eq!(teams, expected);
    }

    #[test]
    fn test_bonus_without_touches_scores_one() {
        let mut teams = seven_a_side();
        let mut counter = 0;
        let outcome = resolve_raid(
            &mut teams,
            TeamId::TeamA,
            &mut counter,
            &RaidData::empty("a2").with_bonus(),
        )
        .unwrap();

        assert_eq!(outcome.points_scored, 1);
        assert_eq!(teams.team_a.score, 1);
        assert_eq!(outcome.summary, "Raider 2 raided. Bonus point taken.");
        assert_eq!(teams.team_a.player("a2").unwrap().stats.successful_raids, 1);
        assert_eq!(teams.team_b.active_count(), 7);
    }

    #[test]
    fn test_touches_put_defenders_out_in_order() {
        let mut teams = seven_a_side();
        let mut counter = 0;
        let outcome = resolve_raid(
            &mut teams,
            TeamId::TeamA,
            &mut counter,
            &RaidData::touches("a1", ["b1", "b2"]),
        )
        .unwrap();

        assert_eq!(outcome.points_scored, 2);
        assert_eq!(teams.team_a.score, 2);
        assert_eq!(teams.team_b.player("b1").unwrap().out_order, Some(0));
        assert_eq!(teams.team_b.player("b2").unwrap().out_order, Some(1));
        assert_eq!(counter, 2);
        assert_eq!(outcome.defenders_revived, 0);
        assert_eq!(outcome.summary, "Raider 1 raided. Touched 2 player(s).");
    }

    #[test]
    fn test_duplicate_touch_counts_once() {
        let mut teams = seven_a_side();
        let mut counter = 0;
        let outcome = resolve_raid(
            &mut teams,
            TeamId::TeamA,
            &mut counter,
            &RaidData::touches("a1", ["b3", "b3"]),
        )
        .unwrap();

        assert_eq!(outcome.points_scored, 1);
        assert_eq!(counter, 1);
    }

    #[test]
    fn test_super_tackle_with_three_active_defenders() {
        let mut teams = seven_a_side();
        for (order, id) in ["b1", "b2", "b4", "b5"].iter().enumerate() {
            put_out(&mut teams.team_b, id, order as u32);
        }
        let mut counter = 4;

        let outcome = resolve_raid(
            &mut teams,
            TeamId::TeamA,
            &mut counter,
            &RaidData::tackled("a1", "b3"),
        )
        .unwrap();

        assert!(outcome.super_tackle);
        assert_eq!(outcome.tackle_points, 2);
        assert_eq!(teams.team_b.score, 2);
        assert_eq!(teams.team_a.score, 0);
        let raider = teams.team_a.player("a1").unwrap();
        assert!(raider.is_out());
        assert_eq!(raider.out_order, Some(4));
        assert_eq!(raider.stats.unsuccessful_raids, 1);
        let tackler = teams.team_b.player("b3").unwrap();
        assert_eq!(tackler.stats.super_tackles, 1);
        assert_eq!(tackler.stats.tackle_points, 2);
        assert_eq!(outcome.summary, "Raider 1 raided. Tackled by Defender 3.");
    }

    #[test]
    fn test_regular_tackle_ignores_touches_and_bonus() {
        let mut teams = seven_a_side();
        let mut counter = 0;
        let raid = RaidData {
            raider_id: "a1".to_string(),
            touched_player_ids: vec!["b1".to_string()],
            bonus: true,
            tackled_by_id: Some("b2".to_string()),
        };

        let outcome = resolve_raid(&mut teams, TeamId::TeamA, &mut counter, &raid).unwrap();

        assert!(!outcome.super_tackle);
        assert_eq!(outcome.tackle_points, 1);
        assert_eq!(outcome.points_scored, 0);
        assert!(teams.team_b.player("b1").unwrap().is_active());
        assert_eq!(teams.team_b.score, 1);
        assert_eq!(teams.team_a.score, 0);
    }

    #[test]
    fn test_tackle_revives_longest_out_teammate() {
        let mut teams = seven_a_side();
        put_out(&mut teams.team_a, "a5", 0);
        put_out(&mut teams.team_a, "a6", 2);
        let mut counter = 3;

        let outcome = resolve_raid(
            &mut teams,
            TeamId::TeamA,
            &mut counter,
            &RaidData::tackled("a1", "b1"),
        )
        .unwrap();

        assert_eq!(outcome.raiders_revived, 1);
        assert!(teams.team_a.player("a5").unwrap().is_active());
        assert!(teams.team_a.player("a6").unwrap().is_out());
        assert!(teams.team_a.player("a1").unwrap().is_out());
    }

    #[test]
    fn test_all_out_awards_bonus_and_revives_defenders() {
        let mut teams = seven_a_side();
        for (order, id) in ["b1", "b2", "b3", "b4", "b5"].iter().enumerate() {
            put_out(&mut teams.team_b, id, order as u32);
        }
        let mut counter = 5;

        let outcome = resolve_raid(
            &mut teams,
            TeamId::TeamA,
            &mut counter,
            &RaidData::touches("a1", ["b6", "b7"]),
        )
        .unwrap();

        assert!(outcome.all_out);
        assert_eq!(teams.team_a.score, 2 + ALL_OUT_BONUS);
        assert_eq!(teams.team_b.out_count(), 0);
        assert!(teams.team_b.players.iter().all(|p| p.out_order.is_none()));
        assert_eq!(outcome.summary, "Raider 1 raided. Touched 2 player(s). All Out!");
    }

    #[test]
    fn test_defender_revivals_capped_by_points_and_previous_outs() {
        let mut teams = seven_a_side();
        put_out(&mut teams.team_b, "b1", 0);
        let mut counter = 1;

        let outcome = resolve_raid(
            &mut teams,
            TeamId::TeamA,
            &mut counter,
            &RaidData::touches("a1", ["b2", "b3", "b4"]),
        )
        .unwrap();

        assert_eq!(outcome.points_scored, 3);
        assert_eq!(outcome.defenders_revived, 1);
        assert!(teams.team_b.player("b1").unwrap().is_active());
        for id in ["b2", "b3", "b4"] {
            assert!(teams.team_b.player(id).unwrap().is_out());
        }
        assert!(outcome.super_raid);
        assert_eq!(teams.team_a.player("a1").unwrap().stats.super_raids, 1);
        assert_eq!(
            outcome.summary,
            "Raider 1 raided. Touched 3 player(s). Super Raid!"
        );
    }

    #[test]
    fn test_unknown_raider_leaves_teams_untouched() {
        let mut teams = seven_a_side();
        let before = teams.clone();
        let mut counter = 0;

        let err = resolve_raid(
            &mut teams,
            TeamId::TeamA,
            &mut counter,
            &RaidData::touches("b1", ["b2"]),
        )
        .unwrap_err();

        assert!(matches!(err, ScorerError::UnknownPlayerError { .. }));
        assert_eq!(teams, before);
        assert_eq!(counter, 0);
    }

    #[test]
    fn test_unknown_touched_defender_fails_whole_raid() {
        let mut teams = seven_a_side();
        let before = teams.clone();
        let mut counter = 0;

        let result = resolve_raid(
            &mut teams,
            TeamId::TeamA,
            &mut counter,
            &RaidData::touches("a1", ["b1", "a2"]),
        );

        assert!(result.is_err());
        assert_eq!(teams, before);
    }
}
