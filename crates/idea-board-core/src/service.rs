//! Board service: the orchestration layer behind every board operation.
//!
//! Reads go store → embedding provider → cluster engine; mutations are
//! validated and forwarded to the store without touching embeddings.
//!
//! ```text
//! list_ideas_with_clusters()
//!   store.list_ideas()            [i0, i1, i2, …]   storage order
//!   texts                         [t0, t1, t2, …]   same positions
//!   embed (cache misses only)     [v0, v1, v2, …]
//!   cluster(eps, min_samples)     [l0, l1, l2, …]
//!   zip                           [(i0,l0), (i1,l1), …]
//! ```
//!
//! Positions are never reordered between the steps, so label `k` always
//! belongs to idea `k` of the same call.

use std::collections::HashSet;
use std::sync::Arc;

use crate::cache::EmbeddingCache;
use crate::cluster::{cluster, ClusterParams};
use crate::embedding::{embed_texts, EmbeddingProvider};
use crate::error::{BoardError, Result};
use crate::models::{
    ClusteredIdea, Connection, CreateConnectionRequest, CreateIdeaRequest, Idea, IdeaUpdate,
};
use crate::store::BoardStore;

/// Orchestrates the board store, embedding provider, and cluster engine.
///
/// Cheap to share: hold it in an `Arc` and call it from any number of
/// concurrent requests.
pub struct BoardService {
    store: Arc<dyn BoardStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    params: ClusterParams,
    cache: Option<EmbeddingCache>,
}

impl BoardService {
    /// Create a service.
    ///
    /// Fails with [`BoardError::InvalidParameters`] if `params` is invalid,
    /// so a misconfigured server never starts.
    pub fn new(
        store: Arc<dyn BoardStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        params: ClusterParams,
    ) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            store,
            embedder,
            params,
            cache: None,
        })
    }

    /// Reuse embeddings across list calls for ideas whose text is unchanged.
    pub fn with_embedding_cache(mut self) -> Self {
        self.cache = Some(EmbeddingCache::new());
        self
    }

    /// All ideas in storage order, each with its cluster label.
    ///
    /// An empty board returns an empty list without calling the embedding
    /// provider or the cluster engine.
    pub async fn list_ideas_with_clusters(&self) -> Result<Vec<ClusteredIdea>> {
        let ideas = self.store.list_ideas().await?;
        if ideas.is_empty() {
            if let Some(cache) = &self.cache {
                cache.retain_ids(&HashSet::new());
            }
            return Ok(Vec::new());
        }

        let vectors = self.embed_ideas(&ideas).await?;
        let labels = cluster(&vectors, &self.params)?;

        let clusters = labels.iter().copied().collect::<HashSet<_>>().len();
        tracing::debug!(
            ideas = ideas.len(),
            clusters,
            eps = self.params.eps,
            min_samples = self.params.min_samples,
            "clustered board"
        );

        Ok(ideas
            .into_iter()
            .zip(labels)
            .map(|(idea, cluster)| ClusteredIdea { idea, cluster })
            .collect())
    }

    /// Embed every idea's text, consulting the cache when enabled.
    async fn embed_ideas(&self, ideas: &[Idea]) -> Result<Vec<Vec<f32>>> {
        let Some(cache) = &self.cache else {
            let texts: Vec<String> = ideas.iter().map(|i| i.text.clone()).collect();
            return embed_texts(self.embedder.as_ref(), &texts).await;
        };

        let live: HashSet<i64> = ideas.iter().map(|i| i.id).collect();
        cache.retain_ids(&live);

        let mut vectors: Vec<Option<Vec<f32>>> =
            ideas.iter().map(|i| cache.get(i.id, &i.text)).collect();
        let misses: Vec<usize> = (0..ideas.len()).filter(|&k| vectors[k].is_none()).collect();
        let texts: Vec<String> = misses.iter().map(|&k| ideas[k].text.clone()).collect();

        let fresh = embed_texts(self.embedder.as_ref(), &texts).await?;
        for (k, vector) in misses.iter().copied().zip(fresh) {
            cache.insert(ideas[k].id, &ideas[k].text, vector.clone());
            vectors[k] = Some(vector);
        }

        tracing::debug!(
            hits = ideas.len() - misses.len(),
            misses = misses.len(),
            "embedding cache"
        );

        vectors
            .into_iter()
            .map(|v| v.ok_or_else(|| BoardError::Embedding("missing embedding".to_string())))
            .collect()
    }

    /// One idea by id, or [`BoardError::NotFound`].
    pub async fn get_idea(&self, id: i64) -> Result<Idea> {
        self.store
            .get_idea(id)
            .await?
            .ok_or_else(|| BoardError::NotFound(format!("idea {id}")))
    }

    /// Validate, apply default geometry, and insert. Returns the new id.
    pub async fn create_idea(&self, request: CreateIdeaRequest) -> Result<i64> {
        let idea = request.into_new_idea()?;
        let id = self.store.insert_idea(&idea).await?;
        tracing::debug!(id, "idea created");
        Ok(id)
    }

    /// Apply a non-empty partial update. Unknown ids are a no-op.
    pub async fn update_idea(&self, id: i64, update: IdeaUpdate) -> Result<()> {
        let update = update.validate()?;
        if !self.store.update_idea(id, &update).await? {
            tracing::debug!(id, "update for unknown idea ignored");
        }
        Ok(())
    }

    /// Remove an idea. Connections that reference it are left in place.
    pub async fn delete_idea(&self, id: i64) -> Result<()> {
        if !self.store.delete_idea(id).await? {
            tracing::debug!(id, "delete for unknown idea ignored");
        }
        Ok(())
    }

    /// Validate all four fields and insert. Returns the new id.
    pub async fn create_connection(&self, request: CreateConnectionRequest) -> Result<i64> {
        let connection = request.into_new_connection()?;
        let id = self.store.insert_connection(&connection).await?;
        tracing::debug!(id, "connection created");
        Ok(id)
    }

    pub async fn list_connections(&self) -> Result<Vec<Connection>> {
        Ok(self.store.list_connections().await?)
    }

    pub async fn delete_connection(&self, id: i64) -> Result<()> {
        if !self.store.delete_connection(id).await? {
            tracing::debug!(id, "delete for unknown connection ignored");
        }
        Ok(())
    }
}
