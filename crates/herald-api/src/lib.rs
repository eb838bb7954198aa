pub mod admin;
pub mod events;
pub mod messages;
pub mod middleware;
pub mod principal;
pub mod reactions;
pub mod search;

use std::sync::Arc;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use herald_core::CoreError;
use herald_core::feed::FeedEngine;
use herald_core::reactions::ReactionEngine;
use herald_core::search::SearchEngine;
use herald_gateway::Dispatcher;
use herald_store::Store;
use herald_types::api::VersionInfo;
use herald_types::config::ConfigHandle;

use crate::principal::PrincipalCache;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: Arc<Store>,
    pub config: ConfigHandle,
    pub feed: FeedEngine,
    pub reactions: ReactionEngine,
    pub search: SearchEngine,
    pub dispatcher: Dispatcher,
    pub principals: PrincipalCache,
    pub session_secret: String,
}

/// Core error → HTTP status. Store failures log the detail server-side and
/// return a generic message.
pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            CoreError::InvalidInput(m) | CoreError::InvalidQuery(m) => {
                (StatusCode::BAD_REQUEST, m.clone())
            }
            CoreError::RateLimited { message } => {
                (StatusCode::TOO_MANY_REQUESTS, message.clone())
            }
            CoreError::NotFound => (StatusCode::NOT_FOUND, "not found".to_string()),
            CoreError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
            CoreError::Store(err) => {
                error!("store failure: {err:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub async fn version() -> Json<VersionInfo> {
    Json(VersionInfo {
        version: env!("CARGO_PKG_VERSION"),
    })
}
