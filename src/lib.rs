//! # snippetfix — one-shot WPCode snippet patcher
//!
//! Replaces a broken line of embedded JavaScript in a single row of a
//! WordPress `wpcode_snippets` table, behind a confirmation token and a
//! capability check, then reminds the operator to remove the tool.
//!
//! ## Architecture
//!
//! - **[`config`]** — Configuration loading, validation, and defaults
//! - **[`auth`]** — `Authenticator` trait and the API-key implementation
//! - **[`db`]** — SQLite access to the host tables (snippets, transients)
//! - **[`cache`]** — `CacheFlusher` trait
//! - **[`patch`]** — Pattern-and-replacement rule
//! - **[`runner`]** — Authenticate → Fetch → Transform → Persist → Invalidate
//! - **[`report`]** — HTML outcome pages
//! - **[`server`]** — axum endpoint

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod patch;
pub mod report;
pub mod runner;
pub mod server;
