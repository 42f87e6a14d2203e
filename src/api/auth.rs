//! Token authentication: the [`Actor`] extractor and login / logout handlers.

use crate::{
    api::AppState,
    core::auth::{self, Actor},
    errors::{Error, Result},
};
use axum::{
    Json, async_trait,
    extract::{FromRequestParts, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
};
use serde::{Deserialize, Serialize};

/// Scheme prefix of the `Authorization` header
const TOKEN_PREFIX: &str = "Token ";

/// Resolves `Authorization: Token <key>` to a user. Requests without the
/// header are anonymous; a malformed header or unknown key is rejected.
#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Self::Anonymous);
        };

        let key = header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix(TOKEN_PREFIX))
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::Unauthenticated {
                message: "Invalid token header".to_string(),
            })?;

        auth::resolve_token(&state.db, key).await.map(Self::User)
    }
}

/// Login payload
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    auth_token: String,
}

/// `POST /auth/token/login`
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let auth_token = auth::issue_token(&state.db, &payload.email, &payload.password).await?;
    Ok(Json(LoginResponse { auth_token }))
}

/// `POST /auth/token/logout`
pub async fn logout(State(state): State<AppState>, actor: Actor) -> Result<StatusCode> {
    let user = actor.require_user()?;
    auth::revoke_token(&state.db, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
