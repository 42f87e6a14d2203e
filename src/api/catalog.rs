//! Read-only catalog endpoints. Neither list is paginated.

use crate::{
    api::AppState,
    core::catalog,
    entities::{ingredient, tag},
    errors::Result,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

/// `?name=` prefix filter
#[derive(Debug, Default, Deserialize)]
pub struct IngredientQuery {
    name: Option<String>,
}

/// `GET /ingredients`
pub async fn list_ingredients(
    State(state): State<AppState>,
    Query(query): Query<IngredientQuery>,
) -> Result<Json<Vec<ingredient::Model>>> {
    let ingredients = catalog::search_ingredients(&state.db, query.name.as_deref()).await?;
    Ok(Json(ingredients))
}

/// `GET /ingredients/{id}`
pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(ingredient_id): Path<i64>,
) -> Result<Json<ingredient::Model>> {
    Ok(Json(catalog::get_ingredient(&state.db, ingredient_id).await?))
}

/// `GET /tags`
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<tag::Model>>> {
    Ok(Json(catalog::list_tags(&state.db).await?))
}

/// `GET /tags/{id}`
pub async fn get_tag(
    State(state): State<AppState>,
    Path(tag_id): Path<i64>,
) -> Result<Json<tag::Model>> {
    Ok(Json(catalog::get_tag(&state.db, tag_id).await?))
}
