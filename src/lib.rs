// Library exports for Trellis
// This allows integration tests and external code to use Trellis modules

pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;
