use crate::domain::model::{MatchState, Team, TeamId};
use std::fmt::Write;

pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

fn write_team(out: &mut String, team: &Team, raiding: bool) {
    let _ = writeln!(
        out,
        "{}{}  {}  (timeouts left: {})",
        team.name,
        if raiding { " [raiding]" } else { "" },
        team.score,
        team.timeouts
    );
    for (idx, player) in team.players.iter().enumerate() {
        let status = match player.out_order {
            Some(order) => format!("out #{}", order),
            None => "active".to_string(),
        };
        let _ = writeln!(
            out,
            "  {:>2}. {:<20} {:<8} raid {:>3}  tackle {:>3}",
            idx + 1,
            player.name,
            status,
            player.stats.raid_points,
            player.stats.tackle_points
        );
    }
}

pub fn render_scoreboard(state: &MatchState) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "Half {} | {} | {}",
        state.current_half,
        format_clock(state.timer),
        state.status
    );
    if let Some(raid) = state.raid_timer {
        let _ = write!(out, " | raid {}", format_clock(raid));
    }
    out.push('\n');
    for id in [TeamId::TeamA, TeamId::TeamB] {
        write_team(&mut out, state.team(id), state.raiding_team == id);
    }
    out
}

/// Most recent first.
pub fn render_history(state: &MatchState, limit: usize) -> String {
    let mut out = String::new();
    for event in state.recent_events().take(limit) {
        let _ = writeln!(
            out,
            "{} [{:?}] {}",
            event.timestamp.format("%H:%M:%S"),
            event.kind,
            event.summary
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{EventKind, MatchEvent, Player};
    use chrono::Utc;

    #[test]
    fn test_clock_format() {
        assert_eq!(format_clock(1200), "20:00");
        assert_eq!(format_clock(65), "01:05");
        assert_eq!(format_clock(0), "00:00");
    }

    #[test]
    fn test_history_is_most_recent_first() {
        let mut state = MatchState::default();
        let now = Utc::now();
        state
            .match_history
            .push(MatchEvent::new(EventKind::Start, "Match started", now));
        state
            .match_history
            .push(MatchEvent::new(EventKind::Raid, "A1 raided.", now));

        let rendered = render_history(&state, 10);
        let lines: Vec<&str> = rendered.lines().collect();
        assert!(lines[0].ends_with("A1 raided."));
        assert!(lines[1].ends_with("Match started"));
    }

    #[test]
    fn test_scoreboard_marks_raiding_team_and_outs() {
        let mut state = MatchState::default();
        let mut out = Player::new("b1", "Fazel");
        out.put_out(0);
        state.teams.team_b.players.push(out);
        state.raid_timer = Some(30);

        let board = render_scoreboard(&state);
        assert!(board.contains("Team A [raiding]"));
        assert!(board.contains("out #0"));
        assert!(board.contains("raid 00:30"));
    }
}
