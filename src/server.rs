/// HTTP endpoint exposing the patch runner via axum.
///
/// Provides `AppState` (shared state) and `serve` (startup logic).
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderMap, Method, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{any, get},
};
use tokio::sync::Mutex as TokioMutex;
use tracing::info;

use crate::auth::{ApiKeyAuthenticator, bearer_token};
use crate::cache::CacheFlusher;
use crate::config::Config;
use crate::db::Db;
use crate::patch::PatchRule;
use crate::report;
use crate::runner::{PatchError, PatchRequest, PatchRunner};

/// Shared application state available to the handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<TokioMutex<Db>>,
    pub runner: Arc<PatchRunner>,
    pub flush_cache: bool,
    pub verify_url: Arc<str>,
}

impl AppState {
    /// Wire the runner, API-key authenticator and an already opened database.
    pub fn new(config: &Config, db: Db) -> Result<Self> {
        let rule = PatchRule::from_config(&config.patch).context("failed to compile patch rule")?;
        let authenticator = Arc::new(ApiKeyAuthenticator::new(&config.api_keys));
        let runner = PatchRunner::new(config, rule, authenticator);

        Ok(Self {
            db: Arc::new(TokioMutex::new(db)),
            runner: Arc::new(runner),
            flush_cache: config.flush_cache,
            verify_url: Arc::from(config.verify_url.as_str()),
        })
    }
}

pub fn router(state: AppState, endpoint_path: &str) -> Router {
    Router::new()
        .route("/health", get(health))
        // Every method reaches the runner so its method gate answers.
        .route(endpoint_path, any(patch_snippet))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn patch_snippet(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    // Repeated `run` keys: the last one wins.
    let run = query
        .iter()
        .rev()
        .find(|(key, _)| key == "run")
        .map(|(_, value)| value.as_str());

    let credentials = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token);

    let request = PatchRequest {
        method: &method,
        run,
        credentials,
    };

    let result = {
        let db = state.db.lock().await;
        let cache: Option<&dyn CacheFlusher> = if state.flush_cache { Some(&*db) } else { None };
        state.runner.run(&request, &*db, cache)
    };

    match result {
        Ok(outcome) => Html(report::render_success(&outcome, &state.verify_url)).into_response(),
        Err(error) => error.into_response(),
    }
}

fn status_code_for(error: &PatchError) -> StatusCode {
    match error {
        PatchError::Usage { .. } | PatchError::InvalidConfirmation => StatusCode::BAD_REQUEST,
        PatchError::Forbidden => StatusCode::FORBIDDEN,
        PatchError::NotFound(_) => StatusCode::NOT_FOUND,
        PatchError::Fetch(_) | PatchError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for PatchError {
    fn into_response(self) -> Response {
        let status = status_code_for(&self);
        if self.is_plain_text() {
            (status, self.to_string()).into_response()
        } else {
            (status, Html(report::render_failure(&self))).into_response()
        }
    }
}

/// Bind `listen_addr` and serve until Ctrl-C.
pub async fn serve(config: &Config, state: AppState) -> Result<()> {
    let app = router(state, &config.endpoint_path);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;

    info!(
        "Listening on http://{}{}?run=<token>",
        config.listen_addr, config.endpoint_path
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server encountered an error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {e}");
    }
}
