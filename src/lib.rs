// Library exports for Chalkboard
// This allows integration tests and external code to use the stores directly

pub mod auth;
pub mod board;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod ids;
pub mod routes;
pub mod state;
pub mod storage;
