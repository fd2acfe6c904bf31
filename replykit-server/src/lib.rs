//! `replykit-server` exposes the reply pipeline over HTTP.
//!
//! `POST /generate` answers a customer message and returns the historical
//! exchange used as grounding. `GET /` serves a small page that calls it, and
//! `GET /health` reports the index size.

pub mod config;
pub mod error;
pub mod server;

pub use config::AppConfig;
pub use error::ApiError;
pub use server::{AppState, GenerateRequest, GenerateResponse, ServerConfig, app_router, run_server};
