/// The patch transaction: authenticate, fetch, transform, persist, invalidate.
///
/// Every gate is checked before the store is touched. The runner itself is
/// synchronous; [`crate::server`] serves it over HTTP and [`crate::report`]
/// renders its outcome.
use std::sync::Arc;

use axum::http::Method;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::auth::Authenticator;
use crate::cache::CacheFlusher;
use crate::config::Config;
use crate::db::{SnippetStore, StoreError};
use crate::patch::{PatchRule, Transformed};

/// What the transport extracted from the incoming request.
#[derive(Debug, Clone, Copy)]
pub struct PatchRequest<'a> {
    pub method: &'a Method,
    /// Value of the `run` query parameter.
    pub run: Option<&'a str>,
    /// Bearer credentials, if any.
    pub credentials: Option<&'a str>,
}

#[derive(Error, Debug)]
pub enum PatchError {
    /// Wrong method or no confirmation flag at all.
    #[error("Access this endpoint via: {hint}")]
    Usage { hint: String },

    #[error("Invalid parameter")]
    InvalidConfirmation,

    #[error("You must be logged in as admin")]
    Forbidden,

    #[error("Snippet not found!")]
    NotFound(i64),

    #[error("Failed to read the snippet. Error: {0}")]
    Fetch(StoreError),

    #[error("Failed to update the snippet. Error: {0}")]
    Store(#[from] StoreError),
}

impl PatchError {
    /// Precondition and not-found failures are answered with plain text.
    #[must_use]
    pub fn is_plain_text(&self) -> bool {
        !matches!(self, PatchError::Fetch(_) | PatchError::Store(_))
    }
}

/// A completed patch.
#[derive(Debug, Clone)]
pub struct PatchOutcome {
    pub snippet_id: i64,
    /// Occurrences of the broken pattern that were replaced. Zero means the
    /// payload was written back unchanged.
    pub matches: usize,
    pub replacement: String,
    pub rows_updated: usize,
    /// Entries dropped from the host cache; `None` when no flusher is configured
    /// or the flush failed.
    pub cache_flushed: Option<usize>,
    pub applied_at: DateTime<Utc>,
}

impl PatchOutcome {
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.matches > 0
    }
}

pub struct PatchRunner {
    snippet_id: i64,
    endpoint_path: String,
    confirm_token: String,
    required_capability: String,
    rule: PatchRule,
    authenticator: Arc<dyn Authenticator>,
}

impl PatchRunner {
    pub fn new(config: &Config, rule: PatchRule, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            snippet_id: config.snippet_id,
            endpoint_path: config.endpoint_path.clone(),
            confirm_token: config.confirm_token.clone(),
            required_capability: config.required_capability.clone(),
            rule,
            authenticator,
        }
    }

    #[must_use]
    pub fn snippet_id(&self) -> i64 {
        self.snippet_id
    }

    #[must_use]
    pub fn rule(&self) -> &PatchRule {
        &self.rule
    }

    /// Check the precondition chain: method and flag, flag value, capability.
    pub fn authorize(&self, request: &PatchRequest<'_>) -> Result<(), PatchError> {
        let Some(run) = request.run.filter(|_| request.method == Method::GET) else {
            warn!(method = %request.method, "Rejected request without GET ?run=");
            return Err(PatchError::Usage {
                hint: format!("{}?run={}", self.endpoint_path, self.confirm_token),
            });
        };

        if run != self.confirm_token {
            warn!("Rejected request with wrong confirmation token");
            return Err(PatchError::InvalidConfirmation);
        }

        let caps = self.authenticator.capabilities(request.credentials);
        if !caps.contains(&self.required_capability) {
            warn!(
                capability = %self.required_capability,
                "Rejected caller without required capability"
            );
            return Err(PatchError::Forbidden);
        }

        Ok(())
    }

    /// Run the whole transaction for one request.
    pub fn run(
        &self,
        request: &PatchRequest<'_>,
        store: &dyn SnippetStore,
        cache: Option<&dyn CacheFlusher>,
    ) -> Result<PatchOutcome, PatchError> {
        self.authorize(request)?;

        let transformed = self.preview(store)?;
        if !transformed.is_changed() {
            info!(
                snippet_id = self.snippet_id,
                "Broken pattern not found; writing payload back unchanged"
            );
        }

        let rows_updated = store.update_code(self.snippet_id, &transformed.code)?;
        if rows_updated == 0 {
            // Row vanished between the read and the write.
            return Err(PatchError::NotFound(self.snippet_id));
        }

        let cache_flushed = cache.and_then(|cache| match cache.flush() {
            Ok(n) => Some(n),
            Err(e) => {
                warn!("Cache flush failed: {e}");
                None
            }
        });

        info!(
            snippet_id = self.snippet_id,
            matches = transformed.matches,
            rows_updated,
            "Snippet patched"
        );

        Ok(PatchOutcome {
            snippet_id: self.snippet_id,
            matches: transformed.matches,
            replacement: self.rule.replacement().to_string(),
            rows_updated,
            cache_flushed,
            applied_at: Utc::now(),
        })
    }

    /// Fetch and transform without writing anything.
    pub fn preview(&self, store: &dyn SnippetStore) -> Result<Transformed, PatchError> {
        let code = store
            .fetch_code(self.snippet_id)
            .map_err(PatchError::Fetch)?
            .ok_or(PatchError::NotFound(self.snippet_id))?;
        Ok(self.rule.apply(&code))
    }
}
