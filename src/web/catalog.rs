use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::error::ApiResult;
use super::AppState;
use crate::catalog::CatalogPage;
use crate::entities::standard_item;
use crate::{AddToInventory, SavedItem};

#[derive(Debug, Default, Deserialize)]
pub struct CatalogParams {
    pub q: Option<String>,
    #[serde(default)]
    pub page: u64,
}

pub async fn list(
    State(service): State<AppState>,
    Query(params): Query<CatalogParams>,
) -> ApiResult<Json<CatalogPage>> {
    Ok(Json(
        service.list_catalog(params.q.as_deref(), params.page).await?,
    ))
}

pub async fn detail(
    State(service): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<standard_item::Model>> {
    Ok(Json(service.get_standard_item(&code).await?))
}

/// The body is optional; without one a single functional unit is added.
pub async fn add_to_inventory(
    State(service): State<AppState>,
    Path(code): Path<String>,
    request: Option<Json<AddToInventory>>,
) -> ApiResult<(StatusCode, Json<SavedItem>)> {
    let request = request.map(|Json(request)| request).unwrap_or_default();
    let saved = service.add_to_inventory(&code, request).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}
