use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::{AppError, Result},
    handlers::AppState,
    models::{NewUser, UserDto},
    services::Session,
};

/// Get all users handler
pub async fn list_users(State(state): State<AppState>, session: Session) -> Result<impl IntoResponse> {
    session.authorize(|role| role.can_manage_users(), "manage users")?;

    let users = state.users.list().await?;
    let user_dtos: Vec<UserDto> = users.into_iter().map(UserDto::from).collect();
    Ok((StatusCode::OK, Json(user_dtos)))
}

/// Create user handler
pub async fn create_user(
    State(state): State<AppState>,
    session: Session,
    Json(new_user): Json<NewUser>,
) -> Result<impl IntoResponse> {
    session.authorize(|role| role.can_manage_users(), "manage users")?;

    let user = state.auth.register(&new_user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Delete user handler
pub async fn delete_user(
    State(state): State<AppState>,
    session: Session,
    Path(username): Path<String>,
) -> Result<impl IntoResponse> {
    session.authorize(|role| role.can_manage_users(), "manage users")?;

    if username.trim().to_lowercase() == session.username.to_lowercase() {
        return Err(AppError::Conflict("You cannot delete your own account".to_string()));
    }

    state.users.delete(&username).await?;
    Ok(StatusCode::NO_CONTENT)
}
