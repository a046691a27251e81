use crate::app::commands::{resolve_player, ConsoleCommand, HELP};
use crate::app::scoreboard::{render_history, render_scoreboard};
use crate::core::live::LiveMatchHandle;
use crate::core::session::{Control, RaidEntry};
use crate::core::setup::Registration;
use crate::core::toss::{self, TossResult};
use crate::utils::error::Result;
use rand::Rng;

const HISTORY_LINES: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue(String),
    Quit,
}

fn reply(message: impl Into<String>) -> Result<Flow> {
    Ok(Flow::Continue(message.into()))
}

/// Runs one console command against the live match.
pub async fn execute<R: Rng + ?Sized>(
    handle: &LiveMatchHandle,
    command: ConsoleCommand,
    rng: &mut R,
) -> Result<Flow> {
    match command {
        ConsoleCommand::TeamName { team, name } => {
            handle.control(Control::RenameTeam { team, name }).await?;
            reply(render_scoreboard(&handle.snapshot()))
        }
        ConsoleCommand::AddPlayer {
            team,
            name,
            phone_number,
        } => {
            let registration = handle.add_player(team, name, phone_number).await?;
            let note = match &registration {
                Registration::Existing(_) => "found in directory",
                Registration::Created(_) => "registered in directory",
                Registration::LocalOnly(_) => "directory unavailable, kept locally",
            };
            reply(format!(
                "Added {} to {} ({})",
                registration.player().name,
                handle.snapshot().team(team).name,
                note
            ))
        }
        ConsoleCommand::RemovePlayer { team, player } => {
            let player_id = resolve_player(handle.snapshot().team(team), &player)?;
            handle
                .control(Control::RemovePlayer { team, player_id })
                .await?;
            reply(render_scoreboard(&handle.snapshot()))
        }
        ConsoleCommand::Toss { choice } => {
            let result = TossResult {
                winner: toss::flip(rng),
                choice,
            };
            handle.control(Control::Toss(result)).await?;
            let state = handle.snapshot();
            reply(format!(
                "{} won the toss; {} raids first",
                state.team(result.winner).name,
                state.team(result.first_raiding_team()).name
            ))
        }
        ConsoleCommand::Start => {
            handle.control(Control::StartMatch).await?;
            reply(render_scoreboard(&handle.snapshot()))
        }
        ConsoleCommand::Pause => {
            handle.control(Control::TogglePause).await?;
            reply(handle.snapshot().status.to_string())
        }
        ConsoleCommand::Timeout { team } => {
            handle.control(Control::TakeTimeout(team)).await?;
            let state = handle.snapshot();
            reply(format!(
                "Timeout {} ({} left)",
                state.team(team).name,
                state.team(team).timeouts
            ))
        }
        ConsoleCommand::Raider { player } => {
            let state = handle.snapshot();
            let raider_id = resolve_player(state.team(state.raiding_team), &player)?;
            handle.control(Control::BeginRaid(raider_id)).await?;
            reply(format!(
                "Raid clock started ({}s)",
                state.rules.raid_duration_seconds
            ))
        }
        ConsoleCommand::Raid {
            raider,
            touched,
            bonus,
            tackler,
        } => {
            let state = handle.snapshot();
            let defending = state.team(state.defending_team());
            let mut entry = RaidEntry::new(resolve_player(state.team(state.raiding_team), &raider)?);
            for token in &touched {
                entry = entry.touch(resolve_player(defending, token)?);
            }
            if bonus {
                entry = entry.bonus();
            }
            if let Some(token) = tackler {
                entry = entry.tackled_by(resolve_player(defending, &token)?);
            }
            handle.submit_raid(entry).await?;
            reply(render_scoreboard(&handle.snapshot()))
        }
        ConsoleCommand::Half => {
            handle.control(Control::StartSecondHalf).await?;
            reply(render_scoreboard(&handle.snapshot()))
        }
        ConsoleCommand::End => {
            handle.control(Control::EndMatch).await?;
            reply(render_scoreboard(&handle.snapshot()))
        }
        ConsoleCommand::Show => reply(render_scoreboard(&handle.snapshot())),
        ConsoleCommand::Log => reply(render_history(&handle.snapshot(), HISTORY_LINES)),
        ConsoleCommand::Help => reply(HELP),
        ConsoleCommand::Quit => Ok(Flow::Quit),
    }
}
