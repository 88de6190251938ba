use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::import::Table;
use crate::{ImportReport, ItemForm, ItemView, SavedItem, StockError};

/// Multipart field carrying the spreadsheet.
pub const UPLOAD_FIELD: &str = "excel_file";

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

pub async fn list(
    State(service): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<ItemView>>> {
    Ok(Json(service.list_items(params.q.as_deref()).await?))
}

pub async fn create(
    State(service): State<AppState>,
    Json(form): Json<ItemForm>,
) -> ApiResult<(StatusCode, Json<SavedItem>)> {
    let saved = service.create_item(form).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn detail(
    State(service): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<ItemView>> {
    Ok(Json(service.get_item(&code).await?))
}

pub async fn edit(
    State(service): State<AppState>,
    Path(code): Path<String>,
    Json(form): Json<ItemForm>,
) -> ApiResult<Json<SavedItem>> {
    Ok(Json(service.update_item(&code, form).await?))
}

pub async fn delete(
    State(service): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<StatusCode> {
    service.delete_item(&code).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn qr(
    State(service): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let png = service.item_qr(&code).await?;
    let disposition = format!("inline; filename=\"qr_{code}.png\"");
    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        png,
    ))
}

pub async fn import(
    State(service): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<ImportReport>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request(UPLOAD_FIELD, err.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ApiError::bad_request(UPLOAD_FIELD, err.body_text()))?;
        let table = Table::from_upload(filename.as_deref(), bytes.to_vec())
            .map_err(|err| ApiError::import(StockError::from(err)))?;
        let report = service.import(&table).await.map_err(ApiError::import)?;
        return Ok(Json(report));
    }
    Err(ApiError::bad_request(UPLOAD_FIELD, "no file uploaded"))
}
