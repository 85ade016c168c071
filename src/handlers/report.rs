use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::Result,
    handlers::AppState,
    models::{ShipmentFilter, SummaryKey},
    services::Session,
};

async fn summary(
    state: AppState,
    session: Session,
    key: SummaryKey,
    filter: ShipmentFilter,
) -> Result<impl IntoResponse> {
    let rows = state.shipments.summarize(key, &filter, &session).await?;
    Ok((StatusCode::OK, Json(rows)))
}

pub async fn by_driver(
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<ShipmentFilter>,
) -> Result<impl IntoResponse> {
    summary(state, session, SummaryKey::Driver, filter).await
}

pub async fn by_object(
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<ShipmentFilter>,
) -> Result<impl IntoResponse> {
    summary(state, session, SummaryKey::Object, filter).await
}

pub async fn by_grade(
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<ShipmentFilter>,
) -> Result<impl IntoResponse> {
    summary(state, session, SummaryKey::Grade, filter).await
}

pub async fn by_day(
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<ShipmentFilter>,
) -> Result<impl IntoResponse> {
    summary(state, session, SummaryKey::Day, filter).await
}

/// Loads per site and grade
pub async fn by_object_grade(
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<ShipmentFilter>,
) -> Result<impl IntoResponse> {
    summary(state, session, SummaryKey::ObjectGrade, filter).await
}
