//! User endpoints: registration, profiles, password change and subscriptions.

use crate::{
    api::AppState,
    core::{
        auth::Actor,
        follow,
        pagination::{Page, PageParams},
        representation::{SubscriptionProfile, UserProfile, user_profile, user_profiles},
        user::{self, NewUser},
    },
    entities,
    errors::Result,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

/// Paging plus the cap on embedded recipes for subscription endpoints
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SubscriptionQuery {
    page: Option<u64>,
    limit: Option<u64>,
    recipes_limit: Option<u64>,
}

impl SubscriptionQuery {
    const fn page_params(self) -> PageParams {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
    }
}

/// Password change payload
#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    current_password: String,
    new_password: String,
}

/// `GET /users`
pub async fn list(
    State(state): State<AppState>,
    actor: Actor,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<UserProfile>>> {
    let page = user::list_users(&state.db, state.page_window(params)).await?;
    let profiles = user_profiles(&state.db, &actor, &page.results).await?;
    Ok(Json(page.with_results(profiles)))
}

/// `POST /users`
pub async fn register(
    State(state): State<AppState>,
    Json(new_user): Json<NewUser>,
) -> Result<(StatusCode, Json<entities::user::Model>)> {
    let user = user::create_user(&state.db, new_user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /users/{id}`
pub async fn retrieve(
    State(state): State<AppState>,
    actor: Actor,
    Path(user_id): Path<i64>,
) -> Result<Json<UserProfile>> {
    let user = user::require_user_by_id(&state.db, user_id).await?;
    Ok(Json(user_profile(&state.db, &actor, &user).await?))
}

/// `GET /users/me`
pub async fn me(State(state): State<AppState>, actor: Actor) -> Result<Json<UserProfile>> {
    let user = actor.require_user()?;
    Ok(Json(user_profile(&state.db, &actor, user).await?))
}

/// `POST /users/set_password`
pub async fn set_password(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<SetPasswordRequest>,
) -> Result<StatusCode> {
    let user = actor.require_user()?;
    user::set_password(
        &state.db,
        user,
        &payload.current_password,
        &payload.new_password,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /users/subscriptions`
pub async fn subscriptions(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<SubscriptionQuery>,
) -> Result<Json<Page<SubscriptionProfile>>> {
    let user = actor.require_user()?;
    let window = state.page_window(query.page_params());
    let page = follow::list_following(&state.db, user, window, query.recipes_limit).await?;
    Ok(Json(page))
}

/// `POST /users/{id}/subscribe`
pub async fn subscribe(
    State(state): State<AppState>,
    actor: Actor,
    Path(target_id): Path<i64>,
    Query(query): Query<SubscriptionQuery>,
) -> Result<(StatusCode, Json<SubscriptionProfile>)> {
    let user = actor.require_user()?;
    let profile = follow::follow(&state.db, user, target_id, query.recipes_limit).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// `DELETE /users/{id}/subscribe`
pub async fn unsubscribe(
    State(state): State<AppState>,
    actor: Actor,
    Path(target_id): Path<i64>,
) -> Result<StatusCode> {
    let user = actor.require_user()?;
    follow::unfollow(&state.db, user, target_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
