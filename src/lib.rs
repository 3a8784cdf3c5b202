// Library exports for Vignette
// The binary, integration tests and client code all build on these modules.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;
