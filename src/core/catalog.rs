//! Catalog business logic - ingredients and tags.
//!
//! Both are read-only through the API. They are created by seeding from
//! config.toml on startup; seeding skips entries that already exist so it can
//! run on every boot.

use crate::{
    config::AppConfig,
    entities::{Ingredient, Tag, ingredient, tag},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::LikeExpr};
use tracing::{debug, info, instrument};

/// Longest name or unit accepted for catalog entries.
pub const MAX_NAME_LENGTH: usize = 200;

/// Counts of rows inserted by [`seed_catalog`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Tags inserted
    pub tags_added: usize,
    /// Ingredients inserted
    pub ingredients_added: usize,
}

/// `LIKE` pattern matching names that start with `prefix` literally.
fn like_prefix(prefix: &str) -> LikeExpr {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    LikeExpr::new(pattern).escape('\\')
}

/// Ingredients whose name starts with `prefix` (case-insensitive), ordered by name.
/// With no prefix every ingredient is returned.
///
/// SQLite folds case for ASCII only, so a prefix with non-ASCII characters is
/// matched in memory against lowercased names instead.
pub async fn search_ingredients<C>(db: &C, prefix: Option<&str>) -> Result<Vec<ingredient::Model>>
where
    C: ConnectionTrait,
{
    let prefix = prefix.map(str::trim).filter(|p| !p.is_empty());
    let mut query = Ingredient::find()
        .order_by_asc(ingredient::Column::Name)
        .order_by_asc(ingredient::Column::Id);

    match prefix {
        Some(prefix) if prefix.is_ascii() => {
            query = query.filter(ingredient::Column::Name.like(like_prefix(prefix)));
            Ok(query.all(db).await?)
        }
        Some(prefix) => {
            let prefix = prefix.to_lowercase();
            let mut ingredients = query.all(db).await?;
            ingredients.retain(|i| i.name.to_lowercase().starts_with(&prefix));
            Ok(ingredients)
        }
        None => Ok(query.all(db).await?),
    }
}

/// Retrieves an ingredient, failing with [`Error::NotFound`] when absent.
pub async fn get_ingredient<C>(db: &C, ingredient_id: i64) -> Result<ingredient::Model>
where
    C: ConnectionTrait,
{
    Ingredient::find_by_id(ingredient_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(format!("Ingredient {ingredient_id} not found")))
}

/// All tags ordered by id.
pub async fn list_tags<C>(db: &C) -> Result<Vec<tag::Model>>
where
    C: ConnectionTrait,
{
    Tag::find()
        .order_by_asc(tag::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a tag, failing with [`Error::NotFound`] when absent.
pub async fn get_tag<C>(db: &C, tag_id: i64) -> Result<tag::Model>
where
    C: ConnectionTrait,
{
    Tag::find_by_id(tag_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(format!("Tag {tag_id} not found")))
}

/// Ids of the tags with the given slugs. Unknown slugs are ignored.
pub async fn tag_ids_for_slugs<C>(db: &C, slugs: &[String]) -> Result<Vec<i64>>
where
    C: ConnectionTrait,
{
    let tags = Tag::find()
        .filter(tag::Column::Slug.is_in(slugs.iter().map(String::as_str)))
        .all(db)
        .await?;
    Ok(tags.into_iter().map(|tag| tag.id).collect())
}

fn validate_name(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{field} cannot be empty")));
    }
    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(Error::validation(format!(
            "{field} cannot be longer than {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Checks that a slug only uses letters, digits, `-` and `_`.
pub fn validate_slug(slug: &str) -> Result<()> {
    validate_name("Slug", slug)?;
    if !slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::validation(format!("Invalid slug: {slug}")));
    }
    Ok(())
}

/// Checks that a color is written as `#RRGGBB`.
pub fn validate_color(color: &str) -> Result<()> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(Error::validation(format!("Invalid color: {color}")))
    }
}

/// Creates a tag after validating its fields.
pub async fn create_tag<C>(
    db: &C,
    name: &str,
    color: Option<&str>,
    slug: &str,
) -> Result<tag::Model>
where
    C: ConnectionTrait,
{
    validate_name("Tag name", name)?;
    validate_slug(slug)?;
    if let Some(color) = color {
        validate_color(color)?;
    }

    let tag = tag::ActiveModel {
        name: Set(name.trim().to_string()),
        color: Set(color.map(str::to_uppercase)),
        slug: Set(slug.to_string()),
        ..Default::default()
    };
    tag.insert(db)
        .await
        .map_err(|e| Error::conflict_on_unique(e, format!("Tag {slug} already exists")))
}

/// Creates an ingredient after validating its fields.
pub async fn create_ingredient<C>(
    db: &C,
    name: &str,
    measurement_unit: &str,
) -> Result<ingredient::Model>
where
    C: ConnectionTrait,
{
    validate_name("Ingredient name", name)?;
    validate_name("Measurement unit", measurement_unit)?;

    let ingredient = ingredient::ActiveModel {
        name: Set(name.trim().to_string()),
        measurement_unit: Set(measurement_unit.trim().to_string()),
        ..Default::default()
    };
    ingredient.insert(db).await.map_err(Into::into)
}

/// Inserts configured tags and ingredients that are not present yet.
///
/// Tags are matched by slug, ingredients by name and unit.
#[instrument(skip_all)]
pub async fn seed_catalog(db: &DatabaseConnection, config: &AppConfig) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for tag_config in &config.tags {
        let exists = Tag::find()
            .filter(tag::Column::Slug.eq(tag_config.slug.as_str()))
            .one(db)
            .await?
            .is_some();
        if exists {
            debug!("Tag {} already present", tag_config.slug);
            continue;
        }
        create_tag(
            db,
            &tag_config.name,
            tag_config.color.as_deref(),
            &tag_config.slug,
        )
        .await?;
        report.tags_added += 1;
    }

    for ingredient_config in &config.ingredients {
        let exists = Ingredient::find()
            .filter(ingredient::Column::Name.eq(ingredient_config.name.trim()))
            .filter(ingredient::Column::MeasurementUnit.eq(ingredient_config.measurement_unit.trim()))
            .one(db)
            .await?
            .is_some();
        if exists {
            continue;
        }
        create_ingredient(
            db,
            &ingredient_config.name,
            &ingredient_config.measurement_unit,
        )
        .await?;
        report.ingredients_added += 1;
    }

    info!(
        "Catalog seeded: {} tag(s), {} ingredient(s) added",
        report.tags_added, report.ingredients_added
    );
    Ok(report)
}
