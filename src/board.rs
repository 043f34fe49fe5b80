//! Board wiring and CLI commands.
//!
//! [`open_service`] builds the full [`BoardService`] (SQLite store,
//! embedding provider, clustering parameters) used by `board serve` and
//! `board ideas`. `board add` and `board connections` talk to the store
//! directly and never load an embedding model.

use anyhow::Result;
use std::sync::Arc;

use idea_board_core::models::CreateIdeaRequest;
use idea_board_core::service::BoardService;
use idea_board_core::store::BoardStore;

use crate::config::Config;
use crate::db;
use crate::embedding;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

/// Open the database (running migrations) and return a store on it.
pub async fn open_store(config: &Config) -> Result<SqliteStore> {
    let pool = db::connect(config).await?;
    migrate::migrate_pool(&pool).await?;
    Ok(SqliteStore::new(pool))
}

/// Build the board service described by `config`.
///
/// Loads the embedding model once; fails with `ModelUnavailable` if it
/// cannot be loaded.
pub async fn open_service(config: &Config) -> Result<Arc<BoardService>> {
    let store = open_store(config).await?;
    let embedder = embedding::create_provider(&config.embedding).await?;

    let mut service = BoardService::new(Arc::new(store), embedder, config.clustering)?;
    if config.embedding.cache {
        service = service.with_embedding_cache();
    }

    tracing::info!(
        db = %config.db.path.display(),
        eps = config.clustering.eps,
        min_samples = config.clustering.min_samples,
        cache = config.embedding.cache,
        "board service ready"
    );

    Ok(Arc::new(service))
}

/// `board ideas`: print every idea in insertion order with its cluster label.
pub async fn run_list_ideas(config: &Config, json: bool) -> Result<()> {
    let service = open_service(config).await?;
    let ideas = service.list_ideas_with_clusters().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ideas)?);
        return Ok(());
    }

    if ideas.is_empty() {
        println!("No ideas.");
        return Ok(());
    }

    println!(
        "{:<6} {:>7} {:>6} {:>6} {:>6} {:>6}  TEXT",
        "ID", "CLUSTER", "X", "Y", "W", "H"
    );
    for entry in &ideas {
        let idea = &entry.idea;
        println!(
            "{:<6} {:>7} {:>6} {:>6} {:>6} {:>6}  {}",
            idea.id,
            entry.cluster,
            idea.x,
            idea.y,
            idea.width,
            idea.height,
            truncate(&idea.text, 60)
        );
    }
    println!();
    println!("{} idea(s)", ideas.len());
    Ok(())
}

/// `board add`: store one idea and print its id.
pub async fn run_add_idea(config: &Config, request: CreateIdeaRequest) -> Result<()> {
    let idea = request.into_new_idea()?;
    let store = open_store(config).await?;
    let id = store.insert_idea(&idea).await?;
    println!("Idea added: {}", id);
    Ok(())
}

/// `board connections`: print every connection.
pub async fn run_list_connections(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let connections = store.list_connections().await?;

    if connections.is_empty() {
        println!("No connections.");
        return Ok(());
    }

    for conn in &connections {
        println!(
            "{:<6} {} ({}) -> {} ({})",
            conn.id, conn.source_id, conn.source_point, conn.target_id, conn.target_point
        );
    }
    println!();
    println!("{} connection(s)", connections.len());
    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() <= max_chars {
        return single_line;
    }
    let cut: String = single_line.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a\nb", 10), "a b");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }

    #[tokio::test]
    async fn test_open_service_with_hashing_provider() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.db.path = tmp.path().join("board.sqlite");
        config.embedding.provider = "hashing".to_string();

        let service = open_service(&config).await.unwrap();
        service
            .create_idea(CreateIdeaRequest::with_text("buy milk"))
            .await
            .unwrap();
        service
            .create_idea(CreateIdeaRequest::with_text("buy oat milk"))
            .await
            .unwrap();
        service
            .create_idea(CreateIdeaRequest::with_text("write report"))
            .await
            .unwrap();

        let ideas = service.list_ideas_with_clusters().await.unwrap();
        let labels: Vec<i32> = ideas.iter().map(|i| i.cluster).collect();
        assert_eq!(labels, vec![0, 0, 1]);
    }

    #[tokio::test]
    async fn test_add_rejects_blank_text() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.db.path = tmp.path().join("board.sqlite");

        let err = run_add_idea(&config, CreateIdeaRequest::with_text("   "))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Idea text is required"));
    }
}
