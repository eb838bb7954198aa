use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use herald_types::models::ViewerCapabilities;

use crate::AppState;

/// Session claims minted by the (external) login flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Opaque identity token.
    pub sub: String,
    pub email: String,
    /// Public display name.
    pub name: String,
    pub exp: usize,
}

/// Resolve the caller into `ViewerCapabilities` and attach it to the
/// request. Reads are open to everyone, so a missing or invalid session
/// degrades to anonymous instead of rejecting.
pub async fn resolve_capabilities(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let caps = viewer_from_headers(&state, req.headers()).await;
    req.extensions_mut().insert(caps);
    next.run(req).await
}

async fn viewer_from_headers(state: &AppState, headers: &HeaderMap) -> ViewerCapabilities {
    let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    else {
        return ViewerCapabilities::anonymous();
    };

    let Ok(data) = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.session_secret.as_bytes()),
        &Validation::default(),
    ) else {
        return ViewerCapabilities::anonymous();
    };
    let claims = data.claims;

    let entry = state.principals.lookup(&state.store, &claims.email).await;
    if entry.as_ref().is_some_and(|user| user.blocked) {
        return ViewerCapabilities::anonymous();
    }
    let privileges = entry.map(|user| user.privileges).unwrap_or_default();

    ViewerCapabilities {
        is_authenticated: true,
        is_admin: privileges.admin,
        is_moderator: privileges.moderator,
        is_writer: privileges.writer,
        identity: Some(claims.sub),
        display_name: Some(claims.name),
    }
}
