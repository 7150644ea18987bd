//! In-memory game registry.
//!
//! One [`GameEntry`] per live game: the session behind an async mutex
//! (one in-flight mutation per game, reads clone a projection under the
//! lock) plus the per-seat credentials, which stay server-side and never
//! enter core state. The registry itself is a concurrent map; there is
//! no cross-session state and nothing survives a restart.

use dashmap::DashMap;
use hexagora_core::GameSession;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// One live game and its seat credentials
pub struct GameEntry {
    pub id: Uuid,
    pub session: Mutex<GameSession>,
    /// Stored API key per seat, same order as the players
    pub seat_keys: Vec<Option<String>>,
}

/// All live games
#[derive(Default)]
pub struct Registry {
    games: DashMap<Uuid, Arc<GameEntry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, session: GameSession, seat_keys: Vec<Option<String>>) -> Arc<GameEntry> {
        let id = Uuid::new_v4();
        let entry = Arc::new(GameEntry {
            id,
            session: Mutex::new(session),
            seat_keys,
        });
        self.games.insert(id, Arc::clone(&entry));
        entry
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<GameEntry>> {
        self.games.get(id).map(|e| Arc::clone(&e))
    }

    pub fn remove(&self, id: &Uuid) -> bool {
        self.games.remove(id).is_some()
    }

    /// Drop every game, returning how many were removed
    pub fn clear(&self) -> usize {
        let count = self.games.len();
        self.games.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexagora_core::AgentProfile;

    fn session() -> GameSession {
        GameSession::new(
            vec![
                ("A".to_string(), AgentProfile::default()),
                ("B".to_string(), AgentProfile::default()),
            ],
            Some(1),
        )
    }

    #[test]
    fn test_create_get_remove() {
        let registry = Registry::new();
        let entry = registry.create(session(), vec![None, Some("sk-test".to_string())]);

        assert_eq!(registry.len(), 1);
        let fetched = registry.get(&entry.id).unwrap();
        assert_eq!(fetched.id, entry.id);
        assert_eq!(fetched.seat_keys[1].as_deref(), Some("sk-test"));

        assert!(registry.remove(&entry.id));
        assert!(!registry.remove(&entry.id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_clear_reports_count() {
        let registry = Registry::new();
        registry.create(session(), vec![None, None]);
        registry.create(session(), vec![None, None]);
        assert_eq!(registry.clear(), 2);
        assert!(registry.is_empty());
    }
}
