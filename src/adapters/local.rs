use crate::domain::model::MatchState;
use crate::domain::ports::MatchStore;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// One pretty-printed JSON document per match under `base_path`.
#[derive(Debug, Clone)]
pub struct LocalMatchStore {
    base_path: PathBuf,
}

impl LocalMatchStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn path_for(&self, match_id: &str) -> PathBuf {
        Path::new(&self.base_path).join(format!("{}.json", match_id))
    }
}

#[async_trait]
impl MatchStore for LocalMatchStore {
    async fn load(&self, match_id: &str) -> Result<Option<MatchState>> {
        let path = self.path_for(match_id);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&data)?))
    }

    async fn save(&self, match_id: &str, state: &MatchState) -> Result<()> {
        let path = self.path_for(match_id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Readers only ever see a complete document.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(state)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}
