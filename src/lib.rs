//! # Idea Board
//!
//! A spatial board of short notes ("ideas") that groups related notes into
//! semantic clusters, with optional directed links between notes.
//!
//! Each time the board is listed, every idea's text is embedded with a
//! sentence-embedding model and the vectors are clustered with DBSCAN over
//! cosine distance. The resulting labels are attached to the ideas in the
//! response and never stored.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────┐
//! │  HTTP /  │──▶│ BoardService │──▶│  SQLite  │
//! │   CLI    │   │  (core)      │   │  store   │
//! └──────────┘   └──────┬───────┘   └──────────┘
//!                       │
//!              ┌────────┴────────┐
//!              ▼                 ▼
//!        ┌───────────┐    ┌────────────┐
//!        │ Embedding │    │  DBSCAN    │
//!        │ provider  │    │  (cosine)  │
//!        └───────────┘    └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! board init                    # create database
//! board add "buy milk"          # store a note
//! board serve                   # start the HTTP API on 127.0.0.1:5000
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and env overrides |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite implementation of the board store |
//! | [`embedding`] | Local (fastembed), Ollama, and hashing providers |
//! | [`board`] | Service wiring and CLI commands |
//! | [`server`] | HTTP API |

pub mod board;
pub mod config;
pub mod db;
pub mod embedding;
pub mod migrate;
pub mod server;
pub mod sqlite_store;
