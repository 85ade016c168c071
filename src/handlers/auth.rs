use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::Result,
    handlers::AppState,
    models::LoginRequest,
    services::Session,
};

/// Exchange username and password for a bearer token
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let response = state.auth.login(&request).await?;
    Ok((StatusCode::OK, Json(response)))
}

/// Who the token belongs to
pub async fn me(session: Session) -> Result<impl IntoResponse> {
    Ok((StatusCode::OK, Json(session)))
}
