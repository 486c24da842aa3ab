//! # Analyst Copilot
//!
//! A local, offline analytics assistant. Questions are answered either from
//! a curated knowledge base (TF-IDF retrieval with a confidence threshold)
//! or, once a CSV/XLSX file has been uploaded, from the dataset itself
//! (profiling, group-by aggregations, column statistics).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌──────────────────────┐
//! │ knowledge    │──▶│ Similarity    │──▶│                      │
//! │ base (JSON)  │   │ Matcher       │   │     QueryRouter      │
//! └──────────────┘   └───────────────┘   │ (analyst-copilot-    │
//! ┌──────────────┐   ┌───────────────┐   │  core)               │
//! │ upload       │──▶│ Dataset       │──▶│                      │
//! │ CSV / XLSX   │   │ Profiler      │   └──────────┬───────────┘
//! └──────────────┘   └───────────────┘              │
//!                           ┌───────────────────────┤
//!                           ▼                       ▼
//!                      ┌──────────┐           ┌──────────┐
//!                      │   CLI    │           │   HTTP   │
//!                      │(copilot) │           │  (axum)  │
//!                      └──────────┘           └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`knowledge`] | Knowledge base loading and router construction |
//! | [`tabular`] | CSV/XLSX upload parsing |
//! | [`server`] | HTTP server |
//! | [`commands`] | One-shot CLI commands |

pub mod commands;
pub mod config;
pub mod knowledge;
pub mod server;
pub mod tabular;
