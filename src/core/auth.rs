//! Authentication - API tokens and the requesting actor.
//!
//! Every request is made either by an anonymous visitor or by a user identified
//! through an API token. Tokens are opaque keys; a user holds at most one, and
//! logging in again returns the existing key.

use crate::{
    core::user::{find_user_by_email, verify_password},
    entities::{AuthToken, User, auth_token, user},
    errors::{Error, Result},
};
use sea_orm::{Set, SqlErr, prelude::*};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Who is making a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// No credentials were presented
    Anonymous,
    /// A user authenticated by token
    User(user::Model),
}

impl Actor {
    /// The authenticated user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&user::Model> {
        match self {
            Self::Anonymous => None,
            Self::User(user) => Some(user),
        }
    }

    /// The authenticated user's id, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<i64> {
        self.user().map(|user| user.id)
    }

    /// The authenticated user, or [`Error::Unauthenticated`] for anonymous actors.
    pub fn require_user(&self) -> Result<&user::Model> {
        self.user().ok_or_else(|| Error::Unauthenticated {
            message: "Authentication credentials were not provided".to_string(),
        })
    }
}

/// Exchanges credentials for the user's API token.
///
/// Returns the existing token when the user already has one, otherwise creates it.
/// Wrong email and wrong password fail the same way so callers cannot probe for
/// registered addresses.
#[instrument(skip(db, password))]
pub async fn issue_token(db: &DatabaseConnection, email: &str, password: &str) -> Result<String> {
    let invalid = || Error::Unauthenticated {
        message: "Unable to log in with provided credentials".to_string(),
    };

    let user = find_user_by_email(db, email).await?.ok_or_else(invalid)?;
    if !verify_password(password, &user.password_hash)? {
        return Err(invalid());
    }

    if let Some(token) = find_token_for_user(db, user.id).await? {
        debug!("Reusing existing token for user {}", user.id);
        return Ok(token.key);
    }

    let key = Uuid::new_v4().simple().to_string();
    let token = auth_token::ActiveModel {
        key: Set(key.clone()),
        user_id: Set(user.id),
        created_at: Set(chrono::Utc::now()),
    };

    match AuthToken::insert(token).exec_without_returning(db).await {
        Ok(_) => {
            info!("Issued token for user {}", user.id);
            Ok(key)
        }
        // A concurrent login created the token first.
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            find_token_for_user(db, user.id)
                .await?
                .map(|token| token.key)
                .ok_or(Error::Database(e))
        }
        Err(e) => Err(e.into()),
    }
}

/// Deletes the user's token. Revoking when no token exists is not an error.
#[instrument(skip(db))]
pub async fn revoke_token(db: &DatabaseConnection, user_id: i64) -> Result<()> {
    let result = AuthToken::delete_many()
        .filter(auth_token::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    debug!("Revoked {} token(s) for user {user_id}", result.rows_affected);
    Ok(())
}

/// Resolves a token key to its user.
pub async fn resolve_token<C>(db: &C, key: &str) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let invalid = || Error::Unauthenticated {
        message: "Invalid token".to_string(),
    };

    let token = AuthToken::find_by_id(key.to_string())
        .one(db)
        .await?
        .ok_or_else(invalid)?;

    User::find_by_id(token.user_id)
        .one(db)
        .await?
        .ok_or_else(invalid)
}

async fn find_token_for_user<C>(db: &C, user_id: i64) -> Result<Option<auth_token::Model>>
where
    C: ConnectionTrait,
{
    AuthToken::find()
        .filter(auth_token::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(Into::into)
}
