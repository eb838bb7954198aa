use axum::extract::State;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Deserialize;

use herald_core::CoreError;
use herald_types::api::Ack;
use herald_types::models::{UserEntry, ViewerCapabilities};

use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct SetUsersRequest {
    pub list: Vec<UserEntry>,
}

pub async fn get_users(
    State(state): State<AppState>,
    Extension(caps): Extension<ViewerCapabilities>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&caps)?;

    let store = state.store.clone();
    let users = tokio::task::spawn_blocking(move || store.get_users())
        .await
        .map_err(|e| CoreError::Store(anyhow::anyhow!("blocking task failed: {e}")))?
        .map_err(CoreError::Store)?;

    Ok(Json(users))
}

pub async fn set_users(
    State(state): State<AppState>,
    Extension(caps): Extension<ViewerCapabilities>,
    Json(request): Json<SetUsersRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&caps)?;

    let store = state.store.clone();
    tokio::task::spawn_blocking(move || store.set_users(&request.list))
        .await
        .map_err(|e| CoreError::Store(anyhow::anyhow!("blocking task failed: {e}")))?
        .map_err(CoreError::Store)?;

    // the privilege cache mirrors the persisted list; every write
    // invalidates it
    state.principals.invalidate().await;

    Ok(Json(Ack { success: true }))
}

fn require_admin(caps: &ViewerCapabilities) -> Result<(), ApiError> {
    if caps.is_admin {
        Ok(())
    } else {
        Err(ApiError(CoreError::Forbidden(
            "admin privilege required".into(),
        )))
    }
}
