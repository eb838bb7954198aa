use axum::extract::State;
use axum::response::IntoResponse;
use axum::{Extension, Json};

use herald_core::CoreError;
use herald_types::api::{Ack, ReactionRequest};
use herald_types::models::ViewerCapabilities;

use crate::{ApiError, AppState};

pub async fn set_reaction(
    State(state): State<AppState>,
    Extension(caps): Extension<ViewerCapabilities>,
    Json(request): Json<ReactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(user) = caps.identity.clone().filter(|id| !id.is_empty()) else {
        return Err(ApiError(CoreError::Forbidden(
            "reactions require a signed-in user".into(),
        )));
    };

    state
        .reactions
        .set_reaction(request.message_id, request.emoji, user)
        .await?;

    Ok(Json(Ack { success: true }))
}
