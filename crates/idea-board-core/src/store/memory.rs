//! In-memory [`BoardStore`] implementation for testing and embedding.
//!
//! Keeps ideas and connections in insertion-ordered `Vec`s behind a single
//! `std::sync::RwLock`, so every mutation is atomic with respect to reads.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{Connection, Idea, IdeaUpdate, NewConnection, NewIdea};

use super::BoardStore;

#[derive(Default)]
struct Board {
    ideas: Vec<Idea>,
    connections: Vec<Connection>,
    last_idea_id: i64,
    last_connection_id: i64,
}

/// In-memory store for tests and hosts without SQLite.
#[derive(Default)]
pub struct InMemoryStore {
    board: RwLock<Board>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Board>> {
        self.board.read().map_err(|_| anyhow!("board lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Board>> {
        self.board.write().map_err(|_| anyhow!("board lock poisoned"))
    }
}

#[async_trait]
impl BoardStore for InMemoryStore {
    async fn list_ideas(&self) -> Result<Vec<Idea>> {
        Ok(self.read()?.ideas.clone())
    }

    async fn get_idea(&self, id: i64) -> Result<Option<Idea>> {
        Ok(self.read()?.ideas.iter().find(|i| i.id == id).cloned())
    }

    async fn insert_idea(&self, idea: &NewIdea) -> Result<i64> {
        let mut board = self.write()?;
        board.last_idea_id += 1;
        let id = board.last_idea_id;
        board.ideas.push(Idea {
            id,
            text: idea.text.clone(),
            x: idea.x,
            y: idea.y,
            z: idea.z,
            width: idea.width,
            height: idea.height,
        });
        Ok(id)
    }

    async fn update_idea(&self, id: i64, update: &IdeaUpdate) -> Result<bool> {
        let mut board = self.write()?;
        match board.ideas.iter_mut().find(|i| i.id == id) {
            Some(idea) => {
                update.apply_to(idea);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_idea(&self, id: i64) -> Result<bool> {
        let mut board = self.write()?;
        let before = board.ideas.len();
        board.ideas.retain(|i| i.id != id);
        Ok(board.ideas.len() != before)
    }

    async fn list_connections(&self) -> Result<Vec<Connection>> {
        Ok(self.read()?.connections.clone())
    }

    async fn insert_connection(&self, connection: &NewConnection) -> Result<i64> {
        let mut board = self.write()?;
        board.last_connection_id += 1;
        let id = board.last_connection_id;
        board.connections.push(Connection {
            id,
            source_id: connection.source_id,
            target_id: connection.target_id,
            source_point: connection.source_point.clone(),
            target_point: connection.target_point.clone(),
        });
        Ok(id)
    }

    async fn delete_connection(&self, id: i64) -> Result<bool> {
        let mut board = self.write()?;
        let before = board.connections.len();
        board.connections.retain(|c| c.id != id);
        Ok(board.connections.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateIdeaRequest;

    fn new_idea(text: &str) -> NewIdea {
        CreateIdeaRequest::with_text(text).into_new_idea().unwrap()
    }

    #[tokio::test]
    async fn test_ids_are_monotonic_and_not_reused() {
        let store = InMemoryStore::new();
        let a = store.insert_idea(&new_idea("a")).await.unwrap();
        let b = store.insert_idea(&new_idea("b")).await.unwrap();
        assert!(store.delete_idea(b).await.unwrap());
        let c = store.insert_idea(&new_idea("c")).await.unwrap();
        assert!(a < b && b < c);
    }

    #[tokio::test]
    async fn test_list_preserves_insertion_order() {
        let store = InMemoryStore::new();
        for text in ["one", "two", "three"] {
            store.insert_idea(&new_idea(text)).await.unwrap();
        }
        let texts: Vec<String> = store
            .list_ideas()
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.text)
            .collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_missing_ids_report_false() {
        let store = InMemoryStore::new();
        assert!(!store
            .update_idea(99, &IdeaUpdate::position(1, 1))
            .await
            .unwrap());
        assert!(!store.delete_idea(99).await.unwrap());
        assert!(!store.delete_connection(99).await.unwrap());
        assert!(store.get_idea(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_connections_roundtrip() {
        let store = InMemoryStore::new();
        let id = store
            .insert_connection(&NewConnection {
                source_id: 1,
                target_id: 2,
                source_point: "right".to_string(),
                target_point: "left".to_string(),
            })
            .await
            .unwrap();
        let conns = store.list_connections().await.unwrap();
        assert_eq!(conns.len(), 1);
        assert_eq!(conns[0].id, id);
        assert!(store.delete_connection(id).await.unwrap());
        assert!(store.list_connections().await.unwrap().is_empty());
    }
}
