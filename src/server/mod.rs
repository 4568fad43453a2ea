//! HTTP surface for the companion chat service.
//!
//! # Endpoints
//!
//! - `GET  /health`          — Liveness probe
//! - `POST /chat`            — Handle one chat message
//! - `GET  /usage/{user_id}` — Current quota standing for a user

pub mod routes;

pub use routes::{app_router, AppState};
