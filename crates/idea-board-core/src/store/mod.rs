//! Storage abstraction for the board.
//!
//! The [`BoardStore`] trait is the persistence boundary: the board service
//! reads and mutates ideas and connections only through it. Implementations
//! must make each mutation atomic; ordering between concurrent calls is
//! their own business.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Connection, Idea, IdeaUpdate, NewConnection, NewIdea};

/// Abstract storage backend for ideas and connections.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`list_ideas`](BoardStore::list_ideas) | All ideas in storage order |
/// | [`get_idea`](BoardStore::get_idea) | One idea by id |
/// | [`insert_idea`](BoardStore::insert_idea) | Insert, returning the new id |
/// | [`update_idea`](BoardStore::update_idea) | Apply a partial update |
/// | [`delete_idea`](BoardStore::delete_idea) | Remove an idea (connections untouched) |
/// | [`list_connections`](BoardStore::list_connections) | All connections |
/// | [`insert_connection`](BoardStore::insert_connection) | Insert, returning the new id |
/// | [`delete_connection`](BoardStore::delete_connection) | Remove a connection |
///
/// Mutations keyed by id return `true` when a row was affected and `false`
/// when the id does not exist.
#[async_trait]
pub trait BoardStore: Send + Sync {
    /// All ideas, in the order they were stored.
    async fn list_ideas(&self) -> Result<Vec<Idea>>;

    async fn get_idea(&self, id: i64) -> Result<Option<Idea>>;

    /// Insert an idea. Ids are assigned monotonically and never reused.
    async fn insert_idea(&self, idea: &NewIdea) -> Result<i64>;

    /// Apply only the fields set in `update`.
    async fn update_idea(&self, id: i64, update: &IdeaUpdate) -> Result<bool>;

    async fn delete_idea(&self, id: i64) -> Result<bool>;

    async fn list_connections(&self) -> Result<Vec<Connection>>;

    async fn insert_connection(&self, connection: &NewConnection) -> Result<i64>;

    async fn delete_connection(&self, id: i64) -> Result<bool>;
}
