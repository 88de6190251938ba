use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use super::error::ApiResult;
use super::AppState;
use crate::entities::category;
use crate::{CategoryForm, CategoryRename};

#[derive(Debug, Serialize)]
pub struct DeletedCategory {
    pub deleted_items: Vec<String>,
}

pub async fn list(State(service): State<AppState>) -> ApiResult<Json<Vec<category::Model>>> {
    Ok(Json(service.list_categories().await?))
}

pub async fn create(
    State(service): State<AppState>,
    Json(form): Json<CategoryForm>,
) -> ApiResult<(StatusCode, Json<category::Model>)> {
    let created = service.create_category(form).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn edit(
    State(service): State<AppState>,
    Path(id): Path<i32>,
    Json(form): Json<CategoryRename>,
) -> ApiResult<Json<category::Model>> {
    Ok(Json(service.rename_category(id, form).await?))
}

pub async fn delete(
    State(service): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<DeletedCategory>> {
    let deleted_items = service.delete_category(id).await?;
    Ok(Json(DeletedCategory { deleted_items }))
}
