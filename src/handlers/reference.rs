use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::Result,
    handlers::AppState,
    models::{NewReference, ReferenceKind, ReferenceList},
    services::Session,
};

/// Names for a selection field; open to every signed-in role
pub async fn list_references(
    State(state): State<AppState>,
    _session: Session,
    Path(kind): Path<ReferenceKind>,
) -> Result<impl IntoResponse> {
    let names = state.references.list(kind).await?;
    Ok((StatusCode::OK, Json(ReferenceList { kind, names })))
}

pub async fn add_reference(
    State(state): State<AppState>,
    session: Session,
    Path(kind): Path<ReferenceKind>,
    Json(reference): Json<NewReference>,
) -> Result<impl IntoResponse> {
    session.authorize(|role| role.can_manage_references(), "manage reference lists")?;

    let name = state.references.add(kind, &reference.name).await?;
    Ok((StatusCode::CREATED, Json(NewReference { name })))
}

/// Existing shipments keep the removed name
pub async fn remove_reference(
    State(state): State<AppState>,
    session: Session,
    Path((kind, name)): Path<(ReferenceKind, String)>,
) -> Result<impl IntoResponse> {
    session.authorize(|role| role.can_manage_references(), "manage reference lists")?;

    state.references.remove(kind, &name).await?;
    Ok(StatusCode::NO_CONTENT)
}
