//! User accounts - registration, lookup and password management.
//!
//! Passwords are stored as Argon2 PHC strings. Email and username are unique;
//! a duplicate is rejected up front and, if two registrations race, the losing
//! insert's constraint violation is reported the same way.

use crate::{
    core::pagination::{Page, PageWindow},
    entities::{User, user},
    errors::{Error, Result},
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{Condition, PaginatorTrait, QueryOrder, Set, prelude::*};
use serde::Deserialize;
use tracing::{info, instrument};

const MAX_EMAIL_LENGTH: usize = 254;
const MAX_NAME_LENGTH: usize = 150;

/// Registration payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    /// Login email
    pub email: String,
    /// Public handle
    pub username: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Plain text password, hashed before storage
    pub password: String,
}

/// Hashes a password with a random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Checks a password against a stored hash.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn validate_field(field: &str, value: &str, max_length: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{field} cannot be empty")));
    }
    if value.chars().count() > max_length {
        return Err(Error::validation(format!(
            "{field} cannot be longer than {max_length} characters"
        )));
    }
    Ok(())
}

fn validate_new_user(new_user: &NewUser) -> Result<()> {
    validate_field("Email", &new_user.email, MAX_EMAIL_LENGTH)?;
    if !new_user.email.contains('@') {
        return Err(Error::validation("Enter a valid email address"));
    }
    validate_field("Username", &new_user.username, MAX_NAME_LENGTH)?;
    validate_field("First name", &new_user.first_name, MAX_NAME_LENGTH)?;
    validate_field("Last name", &new_user.last_name, MAX_NAME_LENGTH)?;
    if new_user.password.is_empty() {
        return Err(Error::validation("Password cannot be empty"));
    }
    Ok(())
}

/// Registers a new user.
///
/// # Errors
/// - [`Error::Validation`] for blank or oversized fields or a malformed email
/// - [`Error::Conflict`] when the email or username is taken
#[instrument(skip(db, new_user), fields(username = %new_user.username))]
pub async fn create_user(db: &DatabaseConnection, new_user: NewUser) -> Result<user::Model> {
    validate_new_user(&new_user)?;

    let email = new_user.email.trim().to_string();
    let username = new_user.username.trim().to_string();

    let taken = User::find()
        .filter(
            Condition::any()
                .add(user::Column::Email.eq(email.as_str()))
                .add(user::Column::Username.eq(username.as_str())),
        )
        .one(db)
        .await?;
    if taken.is_some() {
        return Err(Error::conflict(
            "A user with that email or username already exists",
        ));
    }

    let user = user::ActiveModel {
        email: Set(email),
        username: Set(username),
        first_name: Set(new_user.first_name.trim().to_string()),
        last_name: Set(new_user.last_name.trim().to_string()),
        password_hash: Set(hash_password(&new_user.password)?),
        ..Default::default()
    };

    let user = user.insert(db).await.map_err(|e| {
        Error::conflict_on_unique(e, "A user with that email or username already exists")
    })?;
    info!("Registered user {}", user.id);
    Ok(user)
}

/// Finds a user by id.
pub async fn get_user_by_id<C>(db: &C, user_id: i64) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Finds a user by id, failing with [`Error::NotFound`] when absent.
pub async fn require_user_by_id<C>(db: &C, user_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    get_user_by_id(db, user_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("User {user_id} not found")))
}

/// Finds a user by login email.
pub async fn find_user_by_email<C>(db: &C, email: &str) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::Email.eq(email.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists users ordered by id, one page at a time.
pub async fn list_users(db: &DatabaseConnection, window: PageWindow) -> Result<Page<user::Model>> {
    let paginator = User::find()
        .order_by_asc(user::Column::Id)
        .paginate(db, window.size);
    let count = paginator.num_items().await?;
    let rows = paginator.fetch_page(window.index()).await?;
    Ok(Page::from_rows(rows, count, window))
}

/// Replaces the user's password after checking the current one.
#[instrument(skip(db, user, current_password, new_password), fields(user_id = user.id))]
pub async fn set_password(
    db: &DatabaseConnection,
    user: &user::Model,
    current_password: &str,
    new_password: &str,
) -> Result<()> {
    if !verify_password(current_password, &user.password_hash)? {
        return Err(Error::validation("Current password is incorrect"));
    }
    if new_password.is_empty() {
        return Err(Error::validation("Password cannot be empty"));
    }

    let mut active: user::ActiveModel = user.clone().into();
    active.password_hash = Set(hash_password(new_password)?);
    active.update(db).await?;
    info!("Password changed");
    Ok(())
}
