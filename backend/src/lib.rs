//! Central authentication service: password credentials, short-lived access tokens and revocable
//! server-side sessions behind an axum HTTP surface.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod types;
pub mod utils;
pub mod validation;
