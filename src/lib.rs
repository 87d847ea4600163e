//! # WasteSight
//!
//! Geospatial-semantic similarity search and hotspot clustering for
//! citizen waste reports.
//!
//! Reports arrive with photos; the platform's analysis pipeline stores a
//! fixed-length image embedding per report. WasteSight is the subsystem
//! that turns those vectors plus coordinates into answers: which reports
//! look like this query, which reports look like this report, and where
//! are the hotspots.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐   ┌──────────────┐
//! │ ReportStore   │   │ Embedding    │
//! │ SQLite/memory │   │ Provider     │
//! └──────┬────────┘   └──────┬───────┘
//!        │  snapshot         │ query vector
//!        ▼                   ▼
//! ┌─────────────────────────────────┐
//! │  similarity (cosine)  geo (km)  │
//! └──────┬───────────────────┬──────┘
//!        ▼                   ▼
//! ┌────────────┐   ┌──────────────────┐
//! │ search /   │   │ cluster          │
//! │ similar    │   │ (greedy seeds)   │
//! └────────────┘   └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! wst init                              # create database
//! wst search "burning plastic pile"     # rank reports against a text query
//! wst similar 118                       # rank reports against report 118
//! wst cluster --days 30                 # hotspot clusters for the last month
//! wst stats                             # corpus health
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Typed error taxonomy |
//! | [`similarity`] | Cosine-distance scoring and ranking |
//! | [`geo`] | Great-circle distances and proximity counts |
//! | [`cluster`] | Greedy hotspot clustering |
//! | [`search`] | Semantic search over the corpus |
//! | [`similar`] | Report-to-report similarity |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Report corpus access (SQLite, in-memory) |
//! | [`stats`] | Corpus statistics |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod cluster;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod geo;
pub mod migrate;
pub mod models;
pub mod search;
pub mod similar;
pub mod similarity;
pub mod stats;
pub mod store;
