//! Roster building against the player directory.

use crate::domain::model::Player;
use crate::domain::ports::{DirectoryPlayer, PlayerDirectory};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// Reused an existing directory record.
    Existing(Player),
    /// Created a new directory record.
    Created(Player),
    /// Directory unavailable; the player only exists in this match.
    LocalOnly(Player),
}

impl Registration {
    pub fn player(&self) -> &Player {
        match self {
            Registration::Existing(p) | Registration::Created(p) | Registration::LocalOnly(p) => p,
        }
    }

    pub fn into_player(self) -> Player {
        match self {
            Registration::Existing(p) | Registration::Created(p) | Registration::LocalOnly(p) => p,
        }
    }
}

fn from_record(record: DirectoryPlayer) -> Player {
    let mut player = Player::new(record.id, record.name);
    if let Some(stats) = record.stats {
        player.stats = stats;
    }
    player
}

async fn lookup(
    directory: &dyn PlayerDirectory,
    name: &str,
    phone_number: Option<&str>,
) -> crate::utils::error::Result<Option<DirectoryPlayer>> {
    if let Some(phone) = phone_number {
        if let Some(found) = directory.find_by_phone(phone).await?.into_iter().next() {
            return Ok(Some(found));
        }
    }
    Ok(directory.find_by_name(name).await?.into_iter().next())
}

/// Finds the player by phone, then by exact name, creating a record when
/// neither matches. Directory errors never block the roster.
pub async fn register_player(
    directory: &dyn PlayerDirectory,
    name: &str,
    phone_number: Option<&str>,
) -> Registration {
    let name = name.trim();
    let phone_number = phone_number.map(str::trim).filter(|p| !p.is_empty());

    match lookup(directory, name, phone_number).await {
        Ok(Some(record)) => {
            tracing::debug!("Reusing directory player {} ({})", record.name, record.id);
            return Registration::Existing(from_record(record));
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!("Player lookup for '{}' failed: {}", name, e);
            return Registration::LocalOnly(Player::with_generated_id(name));
        }
    }

    match directory.create(name, phone_number).await {
        Ok(id) => {
            tracing::info!("Registered new player {} ({})", name, id);
            Registration::Created(Player::new(id, name))
        }
        Err(e) => {
            tracing::warn!("Creating player '{}' failed: {}", name, e);
            Registration::LocalOnly(Player::with_generated_id(name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryPlayerDirectory;
    use crate::domain::model::PlayerStats;
    use crate::utils::error::{Result, ScorerError};
    use async_trait::async_trait;

    struct BrokenDirectory;

    #[async_trait]
    impl PlayerDirectory for BrokenDirectory {
        async fn find_by_name(&self, _name: &str) -> Result<Vec<DirectoryPlayer>> {
            Err(ScorerError::DirectoryError {
                message: "offline".to_string(),
            })
        }

        async fn find_by_phone(&self, _phone_number: &str) -> Result<Vec<DirectoryPlayer>> {
            Err(ScorerError::DirectoryError {
                message: "offline".to_string(),
            })
        }

        async fn create(&self, _name: &str, _phone_number: Option<&str>) -> Result<String> {
            Err(ScorerError::DirectoryError {
                message: "offline".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_phone_match_wins_over_name() {
        let directory = MemoryPlayerDirectory::new();
        directory.insert(DirectoryPlayer {
            id: "by-name".to_string(),
            name: "Rahul".to_string(),
            phone_number: None,
            stats: None,
        });
        directory.insert(DirectoryPlayer {
            id: "by-phone".to_string(),
            name: "Rahul C".to_string(),
            phone_number: Some("98450".to_string()),
            stats: Some(PlayerStats {
                raid_points: 40,
                ..PlayerStats::default()
            }),
        });

        let reg = register_player(&directory, " Rahul ", Some("98450")).await;
        match reg {
            Registration::Existing(player) => {
                assert_eq!(player.id, "by-phone");
                assert_eq!(player.stats.raid_points, 40);
            }
            other => panic!("expected existing player, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_player_is_created() {
        let directory = MemoryPlayerDirectory::new();
        let reg = register_player(&directory, "Deepak", None).await;
        assert!(matches!(reg, Registration::Created(_)));
        assert_eq!(directory.find_by_name("Deepak").await.unwrap().len(), 1);
        assert_eq!(
            directory.find_by_name("Deepak").await.unwrap()[0].id,
            reg.player().id
        );
    }

    #[tokio::test]
    async fn test_directory_failure_falls_back_to_local_player() {
        let reg = register_player(&BrokenDirectory, "Maninder", Some("1234")).await;
        match reg {
            Registration::LocalOnly(player) => {
                assert_eq!(player.name, "Maninder");
                assert!(!player.id.is_empty());
            }
            other => panic!("expected local player, got {:?}", other),
        }
    }
}
