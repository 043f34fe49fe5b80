//! SQLite-backed [`BoardStore`] implementation.
//!
//! Every mutation is a single statement, so SQLite's own atomicity covers
//! the per-call guarantee. Partial updates use one fixed statement with
//! `COALESCE(?, column)` for each updatable field; unset fields bind `NULL`
//! and keep their current value.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use idea_board_core::models::{Connection, Idea, IdeaUpdate, NewConnection, NewIdea};
use idea_board_core::store::BoardStore;

/// SQLite implementation of the [`BoardStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn idea_from_row(row: &SqliteRow) -> Idea {
    Idea {
        id: row.get("id"),
        text: row.get("text"),
        x: row.get("x"),
        y: row.get("y"),
        z: row.get("z"),
        width: row.get("width"),
        height: row.get("height"),
    }
}

fn connection_from_row(row: &SqliteRow) -> Connection {
    Connection {
        id: row.get("id"),
        source_id: row.get("source_id"),
        target_id: row.get("target_id"),
        source_point: row.get("source_point"),
        target_point: row.get("target_point"),
    }
}

#[async_trait]
impl BoardStore for SqliteStore {
    async fn list_ideas(&self) -> Result<Vec<Idea>> {
        let rows = sqlx::query("SELECT id, text, x, y, z, width, height FROM ideas ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(idea_from_row).collect())
    }

    async fn get_idea(&self, id: i64) -> Result<Option<Idea>> {
        let row = sqlx::query("SELECT id, text, x, y, z, width, height FROM ideas WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(idea_from_row))
    }

    async fn insert_idea(&self, idea: &NewIdea) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO ideas (text, x, y, z, width, height) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&idea.text)
        .bind(idea.x)
        .bind(idea.y)
        .bind(idea.z)
        .bind(idea.width)
        .bind(idea.height)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn update_idea(&self, id: i64, update: &IdeaUpdate) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE ideas SET
                x = COALESCE(?, x),
                y = COALESCE(?, y),
                width = COALESCE(?, width),
                height = COALESCE(?, height),
                text = COALESCE(?, text)
            WHERE id = ?
            "#,
        )
        .bind(update.x)
        .bind(update.y)
        .bind(update.width)
        .bind(update.height)
        .bind(update.text.as_deref())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_idea(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM ideas WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_connections(&self) -> Result<Vec<Connection>> {
        let rows = sqlx::query(
            "SELECT id, source_id, target_id, source_point, target_point FROM connections ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(connection_from_row).collect())
    }

    async fn insert_connection(&self, connection: &NewConnection) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO connections (source_id, target_id, source_point, target_point) VALUES (?, ?, ?, ?)",
        )
        .bind(connection.source_id)
        .bind(connection.target_id)
        .bind(&connection.source_point)
        .bind(&connection.target_point)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn delete_connection(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM connections WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::{db, migrate};
    use idea_board_core::models::CreateIdeaRequest;
    use tempfile::TempDir;

    async fn open_store(tmp: &TempDir) -> SqliteStore {
        let mut config = Config::default();
        config.db.path = tmp.path().join("board.sqlite");
        let pool = db::connect(&config).await.unwrap();
        migrate::migrate_pool(&pool).await.unwrap();
        SqliteStore::new(pool)
    }

    fn new_idea(text: &str) -> NewIdea {
        CreateIdeaRequest::with_text(text).into_new_idea().unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_list_in_order() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        let a = store.insert_idea(&new_idea("first")).await.unwrap();
        let b = store.insert_idea(&new_idea("second")).await.unwrap();
        assert!(b > a);

        let ideas = store.list_ideas().await.unwrap();
        assert_eq!(ideas.len(), 2);
        assert_eq!(ideas[0].text, "first");
        assert_eq!(ideas[1].text, "second");
        assert_eq!((ideas[0].x, ideas[0].y, ideas[0].z), (200, 200, 0));
        assert_eq!((ideas[0].width, ideas[0].height), (200, 100));
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_columns() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        let id = store.insert_idea(&new_idea("note")).await.unwrap();

        let update = IdeaUpdate {
            x: Some(42),
            ..IdeaUpdate::default()
        };
        assert!(store.update_idea(id, &update).await.unwrap());

        let idea = store.get_idea(id).await.unwrap().unwrap();
        assert_eq!(idea.x, 42);
        assert_eq!(idea.y, 200);
        assert_eq!(idea.width, 200);
        assert_eq!(idea.height, 100);
        assert_eq!(idea.text, "note");

        assert!(store
            .update_idea(id, &IdeaUpdate::text("renamed"))
            .await
            .unwrap());
        let idea = store.get_idea(id).await.unwrap().unwrap();
        assert_eq!(idea.text, "renamed");
        assert_eq!(idea.x, 42);
    }

    #[tokio::test]
    async fn test_missing_ids() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        assert!(store.get_idea(7).await.unwrap().is_none());
        assert!(!store
            .update_idea(7, &IdeaUpdate::position(1, 1))
            .await
            .unwrap());
        assert!(!store.delete_idea(7).await.unwrap());
        assert!(!store.delete_connection(7).await.unwrap());
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_delete() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        let a = store.insert_idea(&new_idea("a")).await.unwrap();
        assert!(store.delete_idea(a).await.unwrap());
        let b = store.insert_idea(&new_idea("b")).await.unwrap();
        assert!(b > a);
    }

    #[tokio::test]
    async fn test_delete_idea_keeps_connections() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        let a = store.insert_idea(&new_idea("a")).await.unwrap();
        let b = store.insert_idea(&new_idea("b")).await.unwrap();
        let conn = store
            .insert_connection(&NewConnection {
                source_id: a,
                target_id: b,
                source_point: "bottom".to_string(),
                target_point: "top".to_string(),
            })
            .await
            .unwrap();

        store.delete_idea(a).await.unwrap();

        let conns = store.list_connections().await.unwrap();
        assert_eq!(conns.len(), 1);
        assert_eq!(conns[0].id, conn);
        assert_eq!(conns[0].source_id, a);
        assert_eq!(conns[0].source_point, "bottom");

        assert!(store.delete_connection(conn).await.unwrap());
        assert!(store.list_connections().await.unwrap().is_empty());
    }
}
