//! Recipe endpoints, including the favorite / shopping cart toggles and the
//! shopping list download.

use crate::{
    api::AppState,
    core::{
        auth::Actor,
        membership::{FlagKind, toggle_membership},
        pagination::{Page, PageParams},
        recipe::{self, RecipeFilter, RecipeInput, RecipePatch},
        representation::{RecipeDetail, RecipeSummary, recipe_detail, recipe_details},
        shopping_list::{build_shopping_list, render_shopping_list},
    },
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};

/// Name of the downloaded shopping list file
const SHOPPING_LIST_FILENAME: &str = "shopping_cart.txt";

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| Error::validation(format!("Query parameter {key} must be a positive integer")))
}

fn parse_flag(value: &str) -> bool {
    matches!(value, "1" | "true" | "True")
}

/// Splits the raw query string of `GET /recipes` into filter and paging.
///
/// `tags` may repeat; unknown keys are ignored.
fn parse_list_query(pairs: &[(String, String)]) -> Result<(RecipeFilter, PageParams)> {
    let mut filter = RecipeFilter::default();
    let mut params = PageParams::default();

    for (key, value) in pairs {
        match key.as_str() {
            "tags" => filter.tags.push(value.clone()),
            "author" => {
                let author = value
                    .parse()
                    .map_err(|_| Error::validation("Query parameter author must be a user id"))?;
                filter.author = Some(author);
            }
            "is_favorited" => filter.is_favorited = parse_flag(value),
            "is_in_shopping_cart" => filter.is_in_shopping_cart = parse_flag(value),
            "page" => params.page = Some(parse_number(key, value)?),
            "limit" => params.limit = Some(parse_number(key, value)?),
            _ => {}
        }
    }
    Ok((filter, params))
}

/// `GET /recipes`
pub async fn list(
    State(state): State<AppState>,
    actor: Actor,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Page<RecipeDetail>>> {
    let (filter, params) = parse_list_query(&pairs)?;
    let window = state.page_window(params);

    let page = recipe::list_recipes(&state.db, &actor, &filter, window).await?;
    let details = recipe_details(&state.db, &actor, &page.results).await?;
    Ok(Json(page.with_results(details)))
}

/// `POST /recipes`
pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<RecipeInput>,
) -> Result<(StatusCode, Json<RecipeDetail>)> {
    let author = actor.require_user()?;
    let recipe = recipe::create_recipe(&state.db, author, input).await?;
    let detail = recipe_detail(&state.db, &actor, &recipe).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// `GET /recipes/{id}`
pub async fn retrieve(
    State(state): State<AppState>,
    actor: Actor,
    Path(recipe_id): Path<i64>,
) -> Result<Json<RecipeDetail>> {
    let recipe = recipe::require_recipe(&state.db, recipe_id).await?;
    Ok(Json(recipe_detail(&state.db, &actor, &recipe).await?))
}

/// `PATCH /recipes/{id}`
pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(recipe_id): Path<i64>,
    Json(patch): Json<RecipePatch>,
) -> Result<Json<RecipeDetail>> {
    let user = actor.require_user()?;
    let recipe = recipe::update_recipe(&state.db, recipe_id, user, patch).await?;
    Ok(Json(recipe_detail(&state.db, &actor, &recipe).await?))
}

/// `DELETE /recipes/{id}`
pub async fn destroy(
    State(state): State<AppState>,
    actor: Actor,
    Path(recipe_id): Path<i64>,
) -> Result<StatusCode> {
    let user = actor.require_user()?;
    recipe::delete_recipe(&state.db, recipe_id, user).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_flag(
    state: &AppState,
    kind: FlagKind,
    actor: &Actor,
    recipe_id: i64,
) -> Result<(StatusCode, Json<RecipeSummary>)> {
    toggle_membership(&state.db, kind, actor, recipe_id, true)
        .await?
        .map(|summary| (StatusCode::CREATED, Json(summary)))
        .ok_or_else(|| Error::not_found(format!("Recipe {recipe_id} not found")))
}

async fn remove_flag(
    state: &AppState,
    kind: FlagKind,
    actor: &Actor,
    recipe_id: i64,
) -> Result<StatusCode> {
    toggle_membership(&state.db, kind, actor, recipe_id, false).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /recipes/{id}/favorite`
pub async fn add_favorite(
    State(state): State<AppState>,
    actor: Actor,
    Path(recipe_id): Path<i64>,
) -> Result<(StatusCode, Json<RecipeSummary>)> {
    add_flag(&state, FlagKind::Favorite, &actor, recipe_id).await
}

/// `DELETE /recipes/{id}/favorite`
pub async fn remove_favorite(
    State(state): State<AppState>,
    actor: Actor,
    Path(recipe_id): Path<i64>,
) -> Result<StatusCode> {
    remove_flag(&state, FlagKind::Favorite, &actor, recipe_id).await
}

/// `POST /recipes/{id}/shopping_cart`
pub async fn add_to_cart(
    State(state): State<AppState>,
    actor: Actor,
    Path(recipe_id): Path<i64>,
) -> Result<(StatusCode, Json<RecipeSummary>)> {
    add_flag(&state, FlagKind::ShoppingCart, &actor, recipe_id).await
}

/// `DELETE /recipes/{id}/shopping_cart`
pub async fn remove_from_cart(
    State(state): State<AppState>,
    actor: Actor,
    Path(recipe_id): Path<i64>,
) -> Result<StatusCode> {
    remove_flag(&state, FlagKind::ShoppingCart, &actor, recipe_id).await
}

/// `GET /recipes/download_shopping_cart`
pub async fn download_shopping_cart(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<impl IntoResponse> {
    let user = actor.require_user()?;
    let items = build_shopping_list(&state.db, user.id).await?;
    if items.is_empty() {
        return Err(Error::not_found("Shopping cart is empty, nothing to export"));
    }

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=UTF-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={SHOPPING_LIST_FILENAME}"),
            ),
        ],
        render_shopping_list(&items),
    ))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_parse_list_query() {
        let (filter, params) = parse_list_query(&pairs(&[
            ("tags", "breakfast"),
            ("tags", "dinner"),
            ("author", "3"),
            ("is_favorited", "1"),
            ("is_in_shopping_cart", "0"),
            ("page", "2"),
            ("limit", "10"),
            ("unknown", "x"),
        ]))
        .unwrap();

        assert_eq!(filter.tags, vec!["breakfast", "dinner"]);
        assert_eq!(filter.author, Some(3));
        assert!(filter.is_favorited);
        assert!(!filter.is_in_shopping_cart);
        assert_eq!(params.page, Some(2));
        assert_eq!(params.limit, Some(10));
    }

    #[test]
    fn test_parse_list_query_rejects_bad_numbers() {
        assert!(matches!(
            parse_list_query(&pairs(&[("page", "first")])),
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            parse_list_query(&pairs(&[("author", "me")])),
            Err(Error::Validation { .. })
        ));
    }
}
