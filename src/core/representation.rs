//! Response shapes for users and recipes.
//!
//! Representations are computed relative to the requesting [`Actor`]: the
//! `is_subscribed`, `is_favorited` and `is_in_shopping_cart` fields describe the
//! requester's relation to the target, never the target's own state.

use crate::{
    core::{
        auth::Actor,
        follow::is_subscribed,
        membership::{is_favorited, is_in_shopping_cart},
        recipe::{recipe_ingredients, recipe_tags},
        user::require_user_by_id,
    },
    entities::{Recipe, recipe, tag, user},
    errors::Result,
};
use sea_orm::{PaginatorTrait, QueryOrder, QuerySelect, prelude::*};
use serde::Serialize;

/// Public user profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    /// User id
    pub id: i64,
    /// Email
    pub email: String,
    /// Username
    pub username: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Whether the requester follows this user
    pub is_subscribed: bool,
}

/// A followed user's profile with their recipes attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionProfile {
    /// Base profile fields
    #[serde(flatten)]
    pub profile: UserProfile,
    /// The user's recipes in short form, newest first
    pub recipes: Vec<RecipeSummary>,
    /// Total number of recipes the user has published
    pub recipes_count: u64,
}

/// Short recipe form used by flag toggles and subscription lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeSummary {
    /// Recipe id
    pub id: i64,
    /// Recipe name
    pub name: String,
    /// Image reference
    pub image: String,
    /// Cooking time in minutes
    pub cooking_time: i32,
}

impl From<&recipe::Model> for RecipeSummary {
    fn from(recipe: &recipe::Model) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.clone(),
            image: recipe.image.clone(),
            cooking_time: recipe.cooking_time,
        }
    }
}

/// One ingredient line of a recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientAmount {
    /// Ingredient id
    pub id: i64,
    /// Ingredient name
    pub name: String,
    /// Unit the amount is expressed in
    pub measurement_unit: String,
    /// Quantity used by the recipe
    pub amount: i32,
}

/// Full recipe representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeDetail {
    /// Recipe id
    pub id: i64,
    /// Linked tags
    pub tags: Vec<tag::Model>,
    /// Author profile
    pub author: UserProfile,
    /// Ingredient lines
    pub ingredients: Vec<IngredientAmount>,
    /// Whether the requester marked the recipe favorite
    pub is_favorited: bool,
    /// Whether the recipe is in the requester's shopping cart
    pub is_in_shopping_cart: bool,
    /// Recipe name
    pub name: String,
    /// Image reference
    pub image: String,
    /// Instructions
    pub text: String,
    /// Cooking time in minutes
    pub cooking_time: i32,
    /// Publication time
    pub pub_date: DateTimeUtc,
}

/// Builds the profile of `user` as seen by `actor`.
pub async fn user_profile<C>(db: &C, actor: &Actor, user: &user::Model) -> Result<UserProfile>
where
    C: ConnectionTrait,
{
    Ok(UserProfile {
        id: user.id,
        email: user.email.clone(),
        username: user.username.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        is_subscribed: is_subscribed(db, actor, user.id).await?,
    })
}

/// Builds profiles for several users.
pub async fn user_profiles<C>(
    db: &C,
    actor: &Actor,
    users: &[user::Model],
) -> Result<Vec<UserProfile>>
where
    C: ConnectionTrait,
{
    let mut profiles = Vec::with_capacity(users.len());
    for user in users {
        profiles.push(user_profile(db, actor, user).await?);
    }
    Ok(profiles)
}

/// Decorates a profile with the user's recipes and recipe count.
///
/// `recipes_limit` caps how many recipes are embedded; the count always covers
/// all of them.
pub async fn with_recipes<C>(
    db: &C,
    profile: UserProfile,
    recipes_limit: Option<u64>,
) -> Result<SubscriptionProfile>
where
    C: ConnectionTrait,
{
    let by_author = Recipe::find().filter(recipe::Column::AuthorId.eq(profile.id));
    let recipes_count = by_author.clone().count(db).await?;

    let mut query = by_author
        .order_by_desc(recipe::Column::PubDate)
        .order_by_desc(recipe::Column::Id);
    if let Some(limit) = recipes_limit {
        query = query.limit(limit);
    }
    let recipes = query.all(db).await?;

    Ok(SubscriptionProfile {
        profile,
        recipes: recipes.iter().map(RecipeSummary::from).collect(),
        recipes_count,
    })
}

/// Builds the full representation of `recipe` as seen by `actor`.
pub async fn recipe_detail<C>(db: &C, actor: &Actor, recipe: &recipe::Model) -> Result<RecipeDetail>
where
    C: ConnectionTrait,
{
    let author = require_user_by_id(db, recipe.author_id).await?;
    let tags = recipe_tags(db, recipe.id).await?;
    let ingredients = recipe_ingredients(db, recipe.id)
        .await?
        .into_iter()
        .map(|(composition, ingredient)| IngredientAmount {
            id: ingredient.id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
            amount: composition.amount,
        })
        .collect();

    Ok(RecipeDetail {
        id: recipe.id,
        tags,
        author: user_profile(db, actor, &author).await?,
        ingredients,
        is_favorited: is_favorited(db, actor, recipe.id).await?,
        is_in_shopping_cart: is_in_shopping_cart(db, actor, recipe.id).await?,
        name: recipe.name.clone(),
        image: recipe.image.clone(),
        text: recipe.text.clone(),
        cooking_time: recipe.cooking_time,
        pub_date: recipe.pub_date,
    })
}

/// Builds full representations for several recipes, preserving order.
pub async fn recipe_details<C>(
    db: &C,
    actor: &Actor,
    recipes: &[recipe::Model],
) -> Result<Vec<RecipeDetail>>
where
    C: ConnectionTrait,
{
    let mut details = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        details.push(recipe_detail(db, actor, recipe).await?);
    }
    Ok(details)
}
