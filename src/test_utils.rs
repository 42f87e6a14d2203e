//! Shared test utilities for `RecipeBox`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        catalog,
        recipe::{self, IngredientAmountInput, RecipeInput},
        user::{self, NewUser},
    },
    entities,
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Password given to every user created by [`create_test_user`].
pub const TEST_PASSWORD: &str = "correct horse battery staple";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test user.
///
/// # Defaults
/// * `email`: `"<username>@example.com"`
/// * `first_name` / `last_name`: `"Test"` / `"User"`
/// * `password`: [`TEST_PASSWORD`]
pub async fn create_test_user(
    db: &DatabaseConnection,
    username: &str,
) -> Result<entities::user::Model> {
    user::create_user(
        db,
        NewUser {
            email: format!("{username}@example.com"),
            username: username.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            password: TEST_PASSWORD.to_string(),
        },
    )
    .await
}

/// Creates a test ingredient.
pub async fn create_test_ingredient(
    db: &DatabaseConnection,
    name: &str,
    measurement_unit: &str,
) -> Result<entities::ingredient::Model> {
    catalog::create_ingredient(db, name, measurement_unit).await
}

/// Creates a test tag without a color.
pub async fn create_test_tag(
    db: &DatabaseConnection,
    name: &str,
    slug: &str,
) -> Result<entities::tag::Model> {
    catalog::create_tag(db, name, None, slug).await
}

/// Creates a minimal catalog: the "breakfast" tag plus "Salt" and "Pepper",
/// both measured in grams.
/// Returns (tag, salt, pepper).
pub async fn create_test_catalog(
    db: &DatabaseConnection,
) -> Result<(
    entities::tag::Model,
    entities::ingredient::Model,
    entities::ingredient::Model,
)> {
    let tag = catalog::create_tag(db, "Breakfast", Some("#E26C2D"), "breakfast").await?;
    let salt = create_test_ingredient(db, "Salt", "g").await?;
    let pepper = create_test_ingredient(db, "Pepper", "g").await?;
    Ok((tag, salt, pepper))
}

/// Creates a recipe with custom name, tags and `(ingredient_id, amount)` pairs.
///
/// # Defaults
/// * `image`: a tiny data URI
/// * `text`: `"Mix and cook"`
/// * `cooking_time`: 20
pub async fn create_named_recipe(
    db: &DatabaseConnection,
    author: &entities::user::Model,
    name: &str,
    tags: &[i64],
    ingredients: &[(i64, i32)],
) -> Result<entities::recipe::Model> {
    recipe::create_recipe(
        db,
        author,
        RecipeInput {
            name: name.to_string(),
            image: "data:image/png;base64,AAAA".to_string(),
            text: "Mix and cook".to_string(),
            cooking_time: 20,
            tags: tags.to_vec(),
            ingredients: ingredients
                .iter()
                .map(|&(id, amount)| IngredientAmountInput { id, amount })
                .collect(),
        },
    )
    .await
}

/// Sets up a complete test environment with one recipe.
/// The recipe uses the catalog from [`create_test_catalog`] with 10 g of salt.
/// Returns (db, author, recipe) for recipe-related tests.
pub async fn setup_with_recipe() -> Result<(
    DatabaseConnection,
    entities::user::Model,
    entities::recipe::Model,
)> {
    let db = setup_test_db().await?;
    let author = create_test_user(&db, "alice").await?;
    let (tag, salt, _) = create_test_catalog(&db).await?;
    let recipe = create_named_recipe(&db, &author, "Salted porridge", &[tag.id], &[(salt.id, 10)]).await?;
    Ok((db, author, recipe))
}
