use axum::extract::State;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use tokio_util::sync::CancellationToken;

use herald_types::api::SearchRequest;
use herald_types::models::ViewerCapabilities;

use crate::{ApiError, AppState};

pub async fn search_messages(
    State(state): State<AppState>,
    Extension(caps): Extension<ViewerCapabilities>,
    Json(request): Json<SearchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Dropped when the client disconnects mid-scan, which cancels the
    // worker pool promptly.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let response = state.search.search(request, &caps, cancel).await?;
    Ok(Json(response))
}
