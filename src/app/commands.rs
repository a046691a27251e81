//! Line commands understood by the console scorer.

use crate::core::toss::TossChoice;
use crate::domain::model::{PlayerId, Team, TeamId};
use crate::utils::error::{Result, ScorerError};

pub const HELP: &str = "\
commands:
  team <a|b> <name>              rename a team
  add <a|b> <name> [#phone]      add a player (looked up in the directory)
  remove <a|b> <player>          remove a player
  toss [raid|court]              flip the coin; the winner takes the choice
  start                          start the match
  pause                          pause / resume the clock
  timeout <a|b>                  take a timeout
  raider <player>                select the raider and start the raid clock
  raid <raider> [touch p1,p2] [bonus] [tackle <player>]
  half                           start the second half
  end                            end the match
  show | log | help | quit
players are given by roster number, name or id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    TeamName { team: TeamId, name: String },
    AddPlayer { team: TeamId, name: String, phone_number: Option<String> },
    RemovePlayer { team: TeamId, player: String },
    Toss { choice: TossChoice },
    Start,
    Pause,
    Timeout { team: TeamId },
    Raider { player: String },
    Raid {
        raider: String,
        touched: Vec<String>,
        bonus: bool,
        tackler: Option<String>,
    },
    Half,
    End,
    Show,
    Log,
    Help,
    Quit,
}

fn usage(message: &str) -> ScorerError {
    ScorerError::validation(format!("{} (type 'help' for usage)", message))
}

fn parse_team(token: Option<&str>) -> Result<TeamId> {
    match token.map(str::to_ascii_lowercase).as_deref() {
        Some("a") | Some("teama") => Ok(TeamId::TeamA),
        Some("b") | Some("teamb") => Ok(TeamId::TeamB),
        _ => Err(usage("Expected team 'a' or 'b'")),
    }
}

fn required<'a>(token: Option<&'a str>, what: &str) -> Result<&'a str> {
    token.ok_or_else(|| usage(&format!("Missing {}", what)))
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Result<Option<ConsoleCommand>> {
        let mut tokens = line.split_whitespace();
        let Some(verb) = tokens.next() else {
            return Ok(None);
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "team" => {
                let team = parse_team(tokens.next())?;
                let name = tokens.collect::<Vec<_>>().join(" ");
                if name.is_empty() {
                    return Err(usage("Missing team name"));
                }
                ConsoleCommand::TeamName { team, name }
            }
            "add" => {
                let team = parse_team(tokens.next())?;
                let mut name = Vec::new();
                let mut phone_number = None;
                for token in tokens {
                    match token.strip_prefix('#') {
                        Some(phone) => phone_number = Some(phone.to_string()),
                        None => name.push(token),
                    }
                }
                ConsoleCommand::AddPlayer {
                    team,
                    name: name.join(" "),
                    phone_number,
                }
            }
            "remove" => ConsoleCommand::RemovePlayer {
                team: parse_team(tokens.next())?,
                player: required(tokens.next(), "player")?.to_string(),
            },
            "toss" => {
                let choice = match tokens.next().map(str::to_ascii_lowercase).as_deref() {
                    None | Some("raid") => TossChoice::Raid,
                    Some("court") => TossChoice::Court,
                    Some(other) => return Err(usage(&format!("Unknown toss choice '{}'", other))),
                };
                ConsoleCommand::Toss { choice }
            }
            "start" => ConsoleCommand::Start,
            "pause" | "resume" => ConsoleCommand::Pause,
            "timeout" => ConsoleCommand::Timeout {
                team: parse_team(tokens.next())?,
            },
            "raider" => ConsoleCommand::Raider {
                player: required(tokens.next(), "raider")?.to_string(),
            },
            "raid" => Self::parse_raid(tokens)?,
            "half" => ConsoleCommand::Half,
            "end" => ConsoleCommand::End,
            "show" => ConsoleCommand::Show,
            "log" => ConsoleCommand::Log,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            other => return Err(usage(&format!("Unknown command '{}'", other))),
        };
        Ok(Some(command))
    }

    fn parse_raid<'a>(mut tokens: impl Iterator<Item = &'a str>) -> Result<ConsoleCommand> {
        let raider = required(tokens.next(), "raider")?.to_string();
        let mut touched = Vec::new();
        let mut bonus = false;
        let mut tackler = None;

        while let Some(token) = tokens.next() {
            match token.to_ascii_lowercase().as_str() {
                "touch" => {
                    let list = required(tokens.next(), "touched players")?;
                    touched.extend(
                        list.split(',')
                            .filter(|s| !s.is_empty())
                            .map(str::to_string),
                    );
                }
                "bonus" => bonus = true,
                "tackle" => tackler = Some(required(tokens.next(), "tackler")?.to_string()),
                other => return Err(usage(&format!("Unexpected '{}' in raid", other))),
            }
        }

        Ok(ConsoleCommand::Raid {
            raider,
            touched,
            bonus,
            tackler,
        })
    }
}

/// Finds a player by 1-based roster number, id or case-insensitive name.
pub fn resolve_player(team: &Team, token: &str) -> Result<PlayerId> {
    if let Ok(number) = token.parse::<usize>() {
        if let Some(player) = number.checked_sub(1).and_then(|i| team.players.get(i)) {
            return Ok(player.id.clone());
        }
    }
    team.player(token)
        .or_else(|| team.player_by_name(token))
        .map(|p| p.id.clone())
        .ok_or_else(|| ScorerError::validation(format!("No player '{}' on {}", token, team.name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Player;

    #[test]
    fn test_parse_full_raid() {
        let command = ConsoleCommand::parse("raid 3 touch 1,4 bonus").unwrap().unwrap();
        assert_eq!(
            command,
            ConsoleCommand::Raid {
                raider: "3".to_string(),
                touched: vec!["1".to_string(), "4".to_string()],
                bonus: true,
                tackler: None,
            }
        );

        let tackle = ConsoleCommand::parse("RAID pardeep tackle fazel").unwrap().unwrap();
        assert!(matches!(
            tackle,
            ConsoleCommand::Raid { tackler: Some(ref t), .. } if t == "fazel"
        ));
    }

    #[test]
    fn test_parse_add_with_phone() {
        let command = ConsoleCommand::parse("add b Fazel Atrachali #98450")
            .unwrap()
            .unwrap();
        assert_eq!(
            command,
            ConsoleCommand::AddPlayer {
                team: TeamId::TeamB,
                name: "Fazel Atrachali".to_string(),
                phone_number: Some("98450".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(ConsoleCommand::parse("timeout c").is_err());
        assert!(ConsoleCommand::parse("raid").is_err());
        assert!(ConsoleCommand::parse("raid 1 touch").is_err());
        assert!(ConsoleCommand::parse("dance").is_err());
        assert_eq!(ConsoleCommand::parse("   ").unwrap(), None);
    }

    #[test]
    fn test_resolve_player_by_number_name_and_id() {
        let mut team = Team::new("Patna", 2);
        team.players.push(Player::new("id-1", "Pardeep"));
        team.players.push(Player::new("id-2", "Sachin"));

        assert_eq!(resolve_player(&team, "2").unwrap(), "id-2");
        assert_eq!(resolve_player(&team, "pardeep").unwrap(), "id-1");
        assert_eq!(resolve_player(&team, "id-2").unwrap(), "id-2");
        assert!(resolve_player(&team, "0").is_err());
        assert!(resolve_player(&team, "Rahul").is_err());
    }
}
