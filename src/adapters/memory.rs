use crate::domain::model::{MatchState, PlayerId};
use crate::domain::ports::{DirectoryPlayer, MatchStore, PlayerDirectory};
use crate::utils::error::{Result, ScorerError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>> {
    mutex.lock().map_err(|_| ScorerError::StoreError {
        message: format!("{} lock poisoned", what),
    })
}

/// Keeps matches for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryMatchStore {
    matches: Arc<Mutex<HashMap<String, MatchState>>>,
}

impl MemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, match_id: &str) -> Option<MatchState> {
        self.matches
            .lock()
            .ok()
            .and_then(|m| m.get(match_id).cloned())
    }

    pub fn len(&self) -> usize {
        self.matches.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MatchStore for MemoryMatchStore {
    async fn load(&self, match_id: &str) -> Result<Option<MatchState>> {
        Ok(lock(&self.matches, "match store")?.get(match_id).cloned())
    }

    async fn save(&self, match_id: &str, state: &MatchState) -> Result<()> {
        lock(&self.matches, "match store")?.insert(match_id.to_string(), state.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryPlayerDirectory {
    players: Arc<Mutex<Vec<DirectoryPlayer>>>,
}

impl MemoryPlayerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, player: DirectoryPlayer) {
        if let Ok(mut players) = self.players.lock() {
            players.push(player);
        }
    }

    fn matching<F>(&self, pred: F) -> Result<Vec<DirectoryPlayer>>
    where
        F: Fn(&DirectoryPlayer) -> bool,
    {
        Ok(lock(&self.players, "player directory")?
            .iter()
            .filter(|p| pred(p))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PlayerDirectory for MemoryPlayerDirectory {
    async fn find_by_name(&self, name: &str) -> Result<Vec<DirectoryPlayer>> {
        self.matching(|p| p.name == name)
    }

    async fn find_by_phone(&self, phone_number: &str) -> Result<Vec<DirectoryPlayer>> {
        self.matching(|p| p.phone_number.as_deref() == Some(phone_number))
    }

    async fn create(&self, name: &str, phone_number: Option<&str>) -> Result<PlayerId> {
        let id = uuid::Uuid::new_v4().to_string();
        lock(&self.players, "player directory")?.push(DirectoryPlayer {
            id: id.clone(),
            name: name.to_string(),
            phone_number: phone_number.map(str::to_string),
            stats: None,
        });
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::block_on;

    #[test]
    fn test_match_store_overwrites_wholesale() {
        let store = MemoryMatchStore::new();
        assert!(store.is_empty());
        assert_eq!(block_on(store.load("m")).unwrap(), None);

        let mut state = MatchState::default();
        block_on(store.save("m", &state)).unwrap();
        state.timer = 600;
        block_on(store.save("m", &state)).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("m").map(|s| s.timer), Some(600));
    }

    #[test]
    fn test_directory_lookups_are_exact() {
        let directory = MemoryPlayerDirectory::new();
        let id = block_on(directory.create("Pardeep Narwal", Some("98450"))).unwrap();

        let by_phone = block_on(directory.find_by_phone("98450")).unwrap();
        assert_eq!(by_phone.len(), 1);
        assert_eq!(by_phone[0].id, id);
        assert!(block_on(directory.find_by_name("pardeep narwal"))
            .unwrap()
            .is_empty());
        assert!(block_on(directory.find_by_phone("9845")).unwrap().is_empty());
    }
}
