use axum::{
    extract::{Json, Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Local;
use serde::Deserialize;

use crate::{
    error::Result,
    handlers::AppState,
    models::{BatchRequest, ShipmentFilter, ShipmentPatch},
    services::{Session, export_service},
};

/// Optional recipient for the deep link
#[derive(Debug, Default, Deserialize)]
pub struct ShareQuery {
    pub phone: Option<String>,
}

/// Submit one order: every truck becomes its own record
pub async fn create_batch(
    State(state): State<AppState>,
    session: Session,
    Query(share): Query<ShareQuery>,
    Json(request): Json<BatchRequest>,
) -> Result<impl IntoResponse> {
    let receipt = state
        .shipments
        .submit_batch(&request, &session, share.phone.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn list_shipments(
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<ShipmentFilter>,
) -> Result<impl IntoResponse> {
    let records = state.shipments.list(&filter, &session).await?;
    Ok((StatusCode::OK, Json(records)))
}

pub async fn get_shipment(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let record = state.shipments.get(id, &session).await?;
    Ok((StatusCode::OK, Json(record)))
}

pub async fn update_shipment(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
    Json(patch): Json<ShipmentPatch>,
) -> Result<impl IntoResponse> {
    let record = state.shipments.update(id, patch, &session).await?;
    Ok((StatusCode::OK, Json(record)))
}

pub async fn delete_shipment(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.shipments.delete(id, &session).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Filtered log as a spreadsheet download
pub async fn export_shipments(
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<ShipmentFilter>,
) -> Result<impl IntoResponse> {
    let records = state.shipments.list(&filter, &session).await?;
    let body = export_service::shipments_to_csv(&records);
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_service::export_filename(Local::now().date_naive())
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, export_service::CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

/// Stored message of an earlier batch with a fresh share link
pub async fn batch_message(
    State(state): State<AppState>,
    _session: Session,
    Path(batch_id): Path<String>,
    Query(share): Query<ShareQuery>,
) -> Result<impl IntoResponse> {
    let message = state
        .shipments
        .batch_message(&batch_id, share.phone.as_deref())
        .await?;
    Ok((StatusCode::OK, Json(message)))
}
