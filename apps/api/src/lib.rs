//! ccgram API server library.
//!
//! Exposes the building blocks (config, state, models, licensing, sync,
//! routes) so integration tests and the binary entrypoint can both access
//! them.

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod errors;
pub mod instagram;
pub mod licensing;
pub mod models;
pub mod photos;
pub mod routes;
pub mod state;
pub mod sync;
