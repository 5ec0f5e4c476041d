//! HTTP API for the agents.
//!
//! ## Endpoints
//! - `GET /health` - liveness
//! - `POST /api/v1/agents/planning/generate` - event plan
//! - `POST /api/v1/agents/finance/calculate` - budget
//! - `POST /api/v1/agents/maestro/process` - free-text request routing

mod routes;
mod types;

pub use routes::{router, serve, AppState, RESULT_SOURCE_HEADER};
pub use types::{ErrorDetail, HealthResponse};
