//! Backend for a lean team, project and ticket tracker.
//!
//! [`db::Database`] owns the SQLite store, [`commands`] holds the
//! operations, and [`server`] exposes them over HTTP.

pub mod commands;
pub mod db;
pub mod error;
pub mod models;
pub mod server;
