//! Recipe business logic - publishing, editing, deleting and listing recipes.
//!
//! A recipe always has at least one tag and one ingredient. Writes run in a
//! single transaction so a recipe never becomes visible without its tags and
//! ingredient amounts.

use crate::{
    core::{
        auth::Actor,
        catalog::{MAX_NAME_LENGTH, tag_ids_for_slugs},
        pagination::{Page, PageWindow},
    },
    entities::{
        Favorite, Ingredient, Recipe, RecipeIngredient, RecipeTag, ShoppingCart, Tag, favorite,
        ingredient, recipe, recipe_ingredient, recipe_tag, shopping_cart, tag, user,
    },
    errors::{Error, Result},
};
use sea_orm::{
    PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*,
    sea_query::{Expr, Query},
};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument};

/// One ingredient line of a recipe submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct IngredientAmountInput {
    /// Ingredient id
    pub id: i64,
    /// Quantity, must be positive
    pub amount: i32,
}

/// Payload for publishing a recipe
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeInput {
    /// Title of the dish
    pub name: String,
    /// Image reference
    pub image: String,
    /// Instructions
    pub text: String,
    /// Minutes, at least 1
    pub cooking_time: i32,
    /// Tag ids, at least one
    pub tags: Vec<i64>,
    /// Ingredient amounts, at least one
    pub ingredients: Vec<IngredientAmountInput>,
}

/// Partial update; absent fields keep their current value
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecipePatch {
    /// New title
    pub name: Option<String>,
    /// New image reference
    pub image: Option<String>,
    /// New instructions
    pub text: Option<String>,
    /// New cooking time in minutes
    pub cooking_time: Option<i32>,
    /// Replaces every tag link when present
    pub tags: Option<Vec<i64>>,
    /// Replaces the ingredient list when present
    pub ingredients: Option<Vec<IngredientAmountInput>>,
}

/// Restrictions for [`list_recipes`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    /// Tag slugs; a recipe matches if it carries any of them
    pub tags: Vec<String>,
    /// Only recipes by this user
    pub author: Option<i64>,
    /// Only the requester's favorites
    pub is_favorited: bool,
    /// Only recipes in the requester's shopping cart
    pub is_in_shopping_cart: bool,
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation("Recipe name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(Error::validation(format!(
            "Recipe name cannot be longer than {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

fn validate_cooking_time(cooking_time: i32) -> Result<()> {
    if cooking_time < 1 {
        return Err(Error::validation("Cooking time must be at least 1 minute"));
    }
    Ok(())
}

/// Rejects an empty tag list and collapses repeated ids, keeping first occurrence order.
pub fn normalize_tags(tags: &[i64]) -> Result<Vec<i64>> {
    if tags.is_empty() {
        return Err(Error::validation("At least one tag is required"));
    }
    let mut seen = HashSet::new();
    Ok(tags.iter().copied().filter(|id| seen.insert(*id)).collect())
}

/// Rejects an empty list, non-positive amounts and repeated ingredient ids.
pub fn validate_ingredients(ingredients: &[IngredientAmountInput]) -> Result<()> {
    if ingredients.is_empty() {
        return Err(Error::validation("At least one ingredient is required"));
    }
    let mut seen = HashSet::new();
    for line in ingredients {
        if line.amount <= 0 {
            return Err(Error::validation(format!(
                "Amount of ingredient {} must be positive",
                line.id
            )));
        }
        if !seen.insert(line.id) {
            return Err(Error::validation(format!(
                "Ingredient {} is listed more than once",
                line.id
            )));
        }
    }
    Ok(())
}

async fn ensure_tags_exist<C>(db: &C, tag_ids: &[i64]) -> Result<()>
where
    C: ConnectionTrait,
{
    let found: HashSet<i64> = Tag::find()
        .filter(tag::Column::Id.is_in(tag_ids.iter().copied()))
        .all(db)
        .await?
        .into_iter()
        .map(|tag| tag.id)
        .collect();
    match tag_ids.iter().find(|id| !found.contains(*id)) {
        Some(missing) => Err(Error::not_found(format!("Tag {missing} not found"))),
        None => Ok(()),
    }
}

async fn ensure_ingredients_exist<C>(db: &C, ingredients: &[IngredientAmountInput]) -> Result<()>
where
    C: ConnectionTrait,
{
    let found: HashSet<i64> = Ingredient::find()
        .filter(ingredient::Column::Id.is_in(ingredients.iter().map(|line| line.id)))
        .all(db)
        .await?
        .into_iter()
        .map(|ingredient| ingredient.id)
        .collect();
    match ingredients.iter().find(|line| !found.contains(&line.id)) {
        Some(missing) => Err(Error::not_found(format!(
            "Ingredient {} not found",
            missing.id
        ))),
        None => Ok(()),
    }
}

async fn insert_tag_links<C>(db: &C, recipe_id: i64, tag_ids: &[i64]) -> Result<()>
where
    C: ConnectionTrait,
{
    let links = tag_ids.iter().map(|&tag_id| recipe_tag::ActiveModel {
        recipe_id: Set(recipe_id),
        tag_id: Set(tag_id),
    });
    RecipeTag::insert_many(links)
        .exec_without_returning(db)
        .await?;
    Ok(())
}

async fn insert_ingredient_amounts<C>(
    db: &C,
    recipe_id: i64,
    ingredients: &[IngredientAmountInput],
) -> Result<()>
where
    C: ConnectionTrait,
{
    let rows = ingredients.iter().map(|line| recipe_ingredient::ActiveModel {
        recipe_id: Set(recipe_id),
        ingredient_id: Set(line.id),
        amount: Set(line.amount),
    });
    RecipeIngredient::insert_many(rows)
        .exec_without_returning(db)
        .await?;
    Ok(())
}

async fn replace_tag_links<C>(db: &C, recipe_id: i64, tag_ids: &[i64]) -> Result<()>
where
    C: ConnectionTrait,
{
    RecipeTag::delete_many()
        .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
        .exec(db)
        .await?;
    insert_tag_links(db, recipe_id, tag_ids).await
}

/// Overwrites amounts of existing pairs, inserts new pairs and drops pairs
/// missing from `ingredients`.
async fn sync_ingredient_amounts<C>(
    db: &C,
    recipe_id: i64,
    ingredients: &[IngredientAmountInput],
) -> Result<()>
where
    C: ConnectionTrait,
{
    let current: HashMap<i64, i32> = RecipeIngredient::find()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .all(db)
        .await?
        .into_iter()
        .map(|row| (row.ingredient_id, row.amount))
        .collect();

    let mut added = Vec::new();
    for line in ingredients {
        match current.get(&line.id) {
            Some(&amount) if amount == line.amount => {}
            Some(_) => {
                RecipeIngredient::update_many()
                    .col_expr(recipe_ingredient::Column::Amount, Expr::value(line.amount))
                    .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
                    .filter(recipe_ingredient::Column::IngredientId.eq(line.id))
                    .exec(db)
                    .await?;
            }
            None => added.push(*line),
        }
    }
    if !added.is_empty() {
        insert_ingredient_amounts(db, recipe_id, &added).await?;
    }

    let removed = RecipeIngredient::delete_many()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .filter(
            recipe_ingredient::Column::IngredientId
                .is_not_in(ingredients.iter().map(|line| line.id)),
        )
        .exec(db)
        .await?;
    debug!(
        "Recipe {recipe_id}: {} ingredient(s) added, {} removed",
        added.len(),
        removed.rows_affected
    );
    Ok(())
}

fn ensure_author(recipe: &recipe::Model, user: &user::Model) -> Result<()> {
    if recipe.author_id != user.id {
        return Err(Error::permission_denied(
            "Only the author can modify this recipe",
        ));
    }
    Ok(())
}

/// Publishes a recipe with its ingredient amounts and tags.
///
/// # Errors
/// - [`Error::Validation`] for missing tags or ingredients, a non-positive
///   amount, a repeated ingredient, a bad name or a cooking time below 1
/// - [`Error::NotFound`] if a tag or ingredient id does not exist
#[instrument(skip(db, author, input), fields(author_id = author.id, name = %input.name))]
pub async fn create_recipe(
    db: &DatabaseConnection,
    author: &user::Model,
    input: RecipeInput,
) -> Result<recipe::Model> {
    validate_name(&input.name)?;
    validate_cooking_time(input.cooking_time)?;
    let tag_ids = normalize_tags(&input.tags)?;
    validate_ingredients(&input.ingredients)?;

    let txn = db.begin().await?;

    ensure_tags_exist(&txn, &tag_ids).await?;
    ensure_ingredients_exist(&txn, &input.ingredients).await?;

    let recipe = recipe::ActiveModel {
        author_id: Set(author.id),
        name: Set(input.name.trim().to_string()),
        image: Set(input.image),
        text: Set(input.text),
        cooking_time: Set(input.cooking_time),
        pub_date: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let recipe = recipe.insert(&txn).await?;

    insert_ingredient_amounts(&txn, recipe.id, &input.ingredients).await?;
    insert_tag_links(&txn, recipe.id, &tag_ids).await?;

    txn.commit().await?;
    info!("Published recipe {}", recipe.id);
    Ok(recipe)
}

/// Applies a partial update to a recipe owned by `user`.
///
/// Supplied fields are validated like on creation. `pub_date` never changes.
///
/// # Errors
/// - [`Error::NotFound`] if the recipe or a referenced tag or ingredient is missing
/// - [`Error::PermissionDenied`] if `user` is not the author
/// - [`Error::Validation`] as for [`create_recipe`]
#[instrument(skip(db, user, patch), fields(user_id = user.id))]
pub async fn update_recipe(
    db: &DatabaseConnection,
    recipe_id: i64,
    user: &user::Model,
    patch: RecipePatch,
) -> Result<recipe::Model> {
    if let Some(name) = &patch.name {
        validate_name(name)?;
    }
    if let Some(cooking_time) = patch.cooking_time {
        validate_cooking_time(cooking_time)?;
    }
    let tag_ids = patch.tags.as_deref().map(normalize_tags).transpose()?;
    if let Some(ingredients) = &patch.ingredients {
        validate_ingredients(ingredients)?;
    }

    let txn = db.begin().await?;

    let recipe = require_recipe(&txn, recipe_id).await?;
    ensure_author(&recipe, user)?;

    if let Some(tag_ids) = &tag_ids {
        ensure_tags_exist(&txn, tag_ids).await?;
    }
    if let Some(ingredients) = &patch.ingredients {
        ensure_ingredients_exist(&txn, ingredients).await?;
    }

    let scalars_changed = patch.name.is_some()
        || patch.image.is_some()
        || patch.text.is_some()
        || patch.cooking_time.is_some();
    let recipe = if scalars_changed {
        let mut active: recipe::ActiveModel = recipe.into();
        if let Some(name) = patch.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(image) = patch.image {
            active.image = Set(image);
        }
        if let Some(text) = patch.text {
            active.text = Set(text);
        }
        if let Some(cooking_time) = patch.cooking_time {
            active.cooking_time = Set(cooking_time);
        }
        active.update(&txn).await?
    } else {
        recipe
    };

    if let Some(tag_ids) = &tag_ids {
        replace_tag_links(&txn, recipe.id, tag_ids).await?;
    }
    if let Some(ingredients) = &patch.ingredients {
        sync_ingredient_amounts(&txn, recipe.id, ingredients).await?;
    }

    txn.commit().await?;
    info!("Updated recipe {recipe_id}");
    Ok(recipe)
}

/// Deletes a recipe owned by `user` together with its tag links, ingredient
/// amounts and every favorite and shopping cart flag on it.
///
/// # Errors
/// - [`Error::NotFound`] if the recipe does not exist
/// - [`Error::PermissionDenied`] if `user` is not the author
#[instrument(skip(db, user), fields(user_id = user.id))]
pub async fn delete_recipe(db: &DatabaseConnection, recipe_id: i64, user: &user::Model) -> Result<()> {
    let txn = db.begin().await?;

    let recipe = require_recipe(&txn, recipe_id).await?;
    ensure_author(&recipe, user)?;

    RecipeIngredient::delete_many()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .exec(&txn)
        .await?;
    RecipeTag::delete_many()
        .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
        .exec(&txn)
        .await?;
    Favorite::delete_many()
        .filter(favorite::Column::RecipeId.eq(recipe_id))
        .exec(&txn)
        .await?;
    ShoppingCart::delete_many()
        .filter(shopping_cart::Column::RecipeId.eq(recipe_id))
        .exec(&txn)
        .await?;
    Recipe::delete_by_id(recipe_id).exec(&txn).await?;

    txn.commit().await?;
    info!("Deleted recipe {recipe_id}");
    Ok(())
}

/// Finds a recipe by id.
pub async fn get_recipe<C>(db: &C, recipe_id: i64) -> Result<Option<recipe::Model>>
where
    C: ConnectionTrait,
{
    Recipe::find_by_id(recipe_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a recipe by id, failing with [`Error::NotFound`] when absent.
pub async fn require_recipe<C>(db: &C, recipe_id: i64) -> Result<recipe::Model>
where
    C: ConnectionTrait,
{
    get_recipe(db, recipe_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Recipe {recipe_id} not found")))
}

/// Tags linked to a recipe, ordered by id.
pub async fn recipe_tags<C>(db: &C, recipe_id: i64) -> Result<Vec<tag::Model>>
where
    C: ConnectionTrait,
{
    Tag::find()
        .filter(
            tag::Column::Id.in_subquery(
                Query::select()
                    .column(recipe_tag::Column::TagId)
                    .from(RecipeTag)
                    .and_where(recipe_tag::Column::RecipeId.eq(recipe_id))
                    .to_owned(),
            ),
        )
        .order_by_asc(tag::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Ingredient amounts of a recipe paired with the ingredient rows, ordered by
/// ingredient id.
pub async fn recipe_ingredients<C>(
    db: &C,
    recipe_id: i64,
) -> Result<Vec<(recipe_ingredient::Model, ingredient::Model)>>
where
    C: ConnectionTrait,
{
    let rows = RecipeIngredient::find()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .order_by_asc(recipe_ingredient::Column::IngredientId)
        .find_also_related(Ingredient)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .filter_map(|(amount, ingredient)| ingredient.map(|ingredient| (amount, ingredient)))
        .collect())
}

/// Lists recipes newest first, one page at a time.
///
/// The favorite and shopping cart filters restrict to the actor's own flags;
/// for an anonymous actor they match nothing. Tag slugs that match no tag
/// likewise yield an empty page.
pub async fn list_recipes(
    db: &DatabaseConnection,
    actor: &Actor,
    filter: &RecipeFilter,
    window: PageWindow,
) -> Result<Page<recipe::Model>> {
    let empty = || Page::from_rows(Vec::new(), 0, window);
    let mut query = Recipe::find();

    if let Some(author_id) = filter.author {
        query = query.filter(recipe::Column::AuthorId.eq(author_id));
    }

    if !filter.tags.is_empty() {
        let tag_ids = tag_ids_for_slugs(db, &filter.tags).await?;
        if tag_ids.is_empty() {
            return Ok(empty());
        }
        query = query.filter(
            recipe::Column::Id.in_subquery(
                Query::select()
                    .column(recipe_tag::Column::RecipeId)
                    .from(RecipeTag)
                    .and_where(recipe_tag::Column::TagId.is_in(tag_ids))
                    .to_owned(),
            ),
        );
    }

    if filter.is_favorited || filter.is_in_shopping_cart {
        let Some(user_id) = actor.user_id() else {
            return Ok(empty());
        };
        if filter.is_favorited {
            query = query.filter(
                recipe::Column::Id.in_subquery(
                    Query::select()
                        .column(favorite::Column::RecipeId)
                        .from(Favorite)
                        .and_where(favorite::Column::UserId.eq(user_id))
                        .to_owned(),
                ),
            );
        }
        if filter.is_in_shopping_cart {
            query = query.filter(
                recipe::Column::Id.in_subquery(
                    Query::select()
                        .column(shopping_cart::Column::RecipeId)
                        .from(ShoppingCart)
                        .and_where(shopping_cart::Column::UserId.eq(user_id))
                        .to_owned(),
                ),
            );
        }
    }

    let paginator = query
        .order_by_desc(recipe::Column::PubDate)
        .order_by_desc(recipe::Column::Id)
        .paginate(db, window.size);
    let count = paginator.num_items().await?;
    let rows = paginator.fetch_page(window.index()).await?;
    Ok(Page::from_rows(rows, count, window))
}
