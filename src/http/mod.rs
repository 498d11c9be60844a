//! HTTP API server for the exam player UI
//!
//! This module provides a REST API over the single-session engine:
//! - POST /auth/register, /auth/login - one-time credentials
//! - POST /exam/begin, /exam/answer, /exam/advance, /exam/back - the attempt
//! - GET /exam/status - phase, countdown, audio state, result
//! - GET /admin/results, /admin/candidates - administrator views
//! - GET /audio/* - static listening tracks, GET /health - liveness

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::{AdminCredentials, AppState, EngineSeed};
