//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::agents::{
    fallback_plan, AgentContext, AgentError, EventPlan, FinanceAgent, Maestro, MaestroRequest,
    MaestroResponse, PlanningAgent,
};
use crate::budget::BudgetResult;
use crate::config::Config;
use crate::event::EventRequest;
use crate::llm::{HttpChatClient, RetryConfig};

use super::types::{ErrorDetail, HealthResponse};

/// Response header naming how the result was obtained
/// (`model`, `repaired`, `partial` or `fallback`).
pub const RESULT_SOURCE_HEADER: &str = "x-result-source";

const SERVICE_NAME: &str = "eventgenie-agents";

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub planning: Arc<PlanningAgent>,
    pub finance: Arc<FinanceAgent>,
    /// Routes to the same agent instances as the direct endpoints
    pub maestro: Maestro,
}

impl AppState {
    pub fn new(context: &AgentContext) -> Self {
        let planning = Arc::new(context.planning_agent());
        let finance = Arc::new(context.finance_agent());
        let maestro = context.maestro(Arc::clone(&planning), Arc::clone(&finance));
        Self {
            config: context.config.clone(),
            planning,
            finance,
            maestro,
        }
    }
}

type ApiError = (StatusCode, Json<ErrorDetail>);
type Sourced<T> = ([(&'static str, &'static str); 1], Json<T>);

fn internal_error(err: AgentError) -> ApiError {
    tracing::error!("Agent request failed: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorDetail {
            detail: err.to_string(),
        }),
    )
}

/// Build the router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/agents/planning/generate", post(generate_plan))
        .route("/api/v1/agents/finance/calculate", post(calculate_budget))
        .route("/api/v1/agents/maestro/process", post(process_maestro))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let llm = HttpChatClient::new(
        config.llm.api_url.clone(),
        config.llm.auth.clone(),
        config.llm.timeout,
        config.llm.accept_invalid_certs,
    )?
    .with_retry_config(RetryConfig::with_max_retries(config.llm.max_retries));
    tracing::info!(
        "Using model {} at {} (timeout {:?}, retries {})",
        config.llm.model,
        config.llm.api_url,
        config.llm.timeout,
        config.llm.max_retries
    );

    let context = AgentContext::new(config.clone(), Arc::new(llm));
    let state = Arc::new(AppState::new(&context));
    let app = router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    // Setup graceful shutdown on SIGTERM/SIGINT
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining in-flight requests...");
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Generate an event plan.
async fn generate_plan(
    State(state): State<Arc<AppState>>,
    Json(event): Json<EventRequest>,
) -> Result<Sourced<EventPlan>, ApiError> {
    tracing::info!("API: planning request for {}", event.event_name);

    let outcome = state
        .planning
        .generate_plan(&event)
        .await
        .map_err(internal_error)?;
    let source = outcome.source();
    let plan = outcome.into_inner().unwrap_or_else(fallback_plan);

    Ok(([(RESULT_SOURCE_HEADER, source)], Json(plan)))
}

/// Calculate an event budget.
async fn calculate_budget(
    State(state): State<Arc<AppState>>,
    Json(event): Json<EventRequest>,
) -> Result<Sourced<BudgetResult>, ApiError> {
    tracing::info!("API: budget request for {}", event.event_name);

    let outcome = state
        .finance
        .calculate_budget(&event)
        .await
        .map_err(internal_error)?;
    let source = outcome.source();
    let budget = outcome
        .into_inner()
        .unwrap_or_else(|| BudgetResult::error("no result"));

    Ok(([(RESULT_SOURCE_HEADER, source)], Json(budget)))
}

/// Route a free-text request through the orchestrator.
async fn process_maestro(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MaestroRequest>,
) -> Result<Json<MaestroResponse>, ApiError> {
    tracing::info!("API: maestro request from user {}", request.user_id);

    let response = state
        .maestro
        .process_request(request)
        .await
        .map_err(internal_error)?;
    Ok(Json(response))
}
