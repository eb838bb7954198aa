use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};

use herald_types::api::{Ack, EditMessageRequest, FeedQuery, MessageDraft};
use herald_types::models::ViewerCapabilities;

use crate::{ApiError, AppState};

pub async fn get_feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
    Extension(caps): Extension<ViewerCapabilities>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .feed
        .get_page(query.offset, query.limit, query.direction, &caps)
        .await?;
    Ok(Json(page))
}

pub async fn get_thread(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(caps): Extension<ViewerCapabilities>,
) -> Result<impl IntoResponse, ApiError> {
    let replies = state.feed.get_thread(id, &caps).await?;
    Ok(Json(replies))
}

pub async fn create_message(
    State(state): State<AppState>,
    Extension(caps): Extension<ViewerCapabilities>,
    Json(draft): Json<MessageDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.feed.create(draft, &caps).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn edit_message(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(caps): Extension<ViewerCapabilities>,
    Json(request): Json<EditMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.feed.edit(id, request, &caps).await?;
    Ok(Json(Ack { success: true }))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(caps): Extension<ViewerCapabilities>,
) -> Result<impl IntoResponse, ApiError> {
    state.feed.delete(id, &caps).await?;
    Ok(Json(Ack { success: true }))
}
