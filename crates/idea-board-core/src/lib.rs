//! # Idea Board Core
//!
//! The semantic grouping engine behind the idea board, plus the record
//! types and store abstraction it runs on.
//!
//! This crate contains no tokio, sqlx, network, or filesystem code. Model-
//! backed embedding providers and the SQLite store live in the `idea-board`
//! app crate.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Ideas, connections, and request validation |
//! | [`cluster`] | DBSCAN over cosine distance |
//! | [`embedding`] | Embedding provider trait and hashing embedder |
//! | [`cache`] | Embedding cache keyed by idea id and text hash |
//! | [`store`] | Board store trait and in-memory implementation |
//! | [`service`] | Board service orchestration |
//! | [`error`] | Error taxonomy |

pub mod cache;
pub mod cluster;
pub mod embedding;
pub mod error;
pub mod models;
pub mod service;
pub mod store;

pub use error::{BoardError, Result};
