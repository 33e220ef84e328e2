use axum::{
    extract::{Path, State},
    Json,
};

use super::AppState;
use crate::{
    error::AppResult,
    models::{FriendRecommendation, GenreRecommendations, RecommendedBook, UserId},
};

/// Handler for the top-genres feed
pub async fn recommend(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<Vec<GenreRecommendations>>> {
    let feed = state.recommendations.get_recommendations(user_id).await?;
    Ok(Json(feed))
}

/// Handler for the single-genre feed
pub async fn recommend_more(
    State(state): State<AppState>,
    Path((user_id, genre)): Path<(UserId, String)>,
) -> AppResult<Json<Vec<RecommendedBook>>> {
    let books = state
        .recommendations
        .get_more_recommendations(user_id, &genre)
        .await?;
    Ok(Json(books))
}

pub async fn recommend_from_friends(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<Vec<FriendRecommendation>>> {
    let feed = state
        .recommendations
        .get_friends_recommendations(user_id)
        .await?;
    Ok(Json(feed))
}
