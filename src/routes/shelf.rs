use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::AppState;
use crate::{
    error::AppResult,
    models::{ShelfItemView, ShelfQueryParams, UserId},
};

/// Lists a user's shelf, optionally filtered by status and genre and sorted
///
/// Query parameters: `status`, `genre`, `sort`, `direction`.
pub async fn list_shelf(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(params): Query<ShelfQueryParams>,
) -> AppResult<Json<Vec<ShelfItemView>>> {
    let items = state.shelf.query(user_id, params).await?;
    Ok(Json(items))
}
