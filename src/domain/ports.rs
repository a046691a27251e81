use crate::domain::model::{MatchState, PlayerId, PlayerStats};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Keyed storage of whole match snapshots. Saves overwrite wholesale.
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn load(&self, match_id: &str) -> Result<Option<MatchState>>;
    async fn save(&self, match_id: &str, state: &MatchState) -> Result<()>;
}

/// Record kept by the external player directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryPlayer {
    pub id: PlayerId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<PlayerStats>,
}

#[async_trait]
pub trait PlayerDirectory: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Vec<DirectoryPlayer>>;
    async fn find_by_phone(&self, phone_number: &str) -> Result<Vec<DirectoryPlayer>>;
    async fn create(&self, name: &str, phone_number: Option<&str>) -> Result<PlayerId>;
}
