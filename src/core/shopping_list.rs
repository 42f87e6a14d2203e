//! Shopping list export - ingredient totals across every recipe in a cart.

use crate::{
    entities::{RecipeIngredient, ShoppingCart, ingredient, recipe_ingredient, shopping_cart},
    errors::Result,
};
use sea_orm::{
    FromQueryResult, JoinType, QueryOrder, QuerySelect, RelationTrait, prelude::*,
    sea_query::Query,
};
use serde::Serialize;

/// One aggregated line of the shopping list
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct ShoppingListItem {
    /// Ingredient name
    pub name: String,
    /// Unit of `total_amount`
    pub measurement_unit: String,
    /// Sum of the ingredient's amounts over all cart recipes
    pub total_amount: i64,
}

/// Sums ingredient amounts over every recipe in the user's cart, one row per
/// (name, unit) pair, ordered by name then unit. An empty cart yields an empty list.
pub async fn build_shopping_list<C>(db: &C, user_id: i64) -> Result<Vec<ShoppingListItem>>
where
    C: ConnectionTrait,
{
    RecipeIngredient::find()
        .select_only()
        .column_as(ingredient::Column::Name, "name")
        .column_as(ingredient::Column::MeasurementUnit, "measurement_unit")
        .column_as(recipe_ingredient::Column::Amount.sum(), "total_amount")
        .join(
            JoinType::InnerJoin,
            recipe_ingredient::Relation::Ingredient.def(),
        )
        .filter(
            recipe_ingredient::Column::RecipeId.in_subquery(
                Query::select()
                    .column(shopping_cart::Column::RecipeId)
                    .from(ShoppingCart)
                    .and_where(shopping_cart::Column::UserId.eq(user_id))
                    .to_owned(),
            ),
        )
        .group_by(ingredient::Column::Name)
        .group_by(ingredient::Column::MeasurementUnit)
        .order_by_asc(ingredient::Column::Name)
        .order_by_asc(ingredient::Column::MeasurementUnit)
        .into_model::<ShoppingListItem>()
        .all(db)
        .await
        .map_err(Into::into)
}

/// Formats one line as `name (unit) — amount`.
#[must_use]
pub fn format_shopping_list_line(item: &ShoppingListItem) -> String {
    format!(
        "{} ({}) — {}",
        item.name, item.measurement_unit, item.total_amount
    )
}

/// Renders the list as plain text, one newline-terminated line per item.
#[must_use]
pub fn render_shopping_list(items: &[ShoppingListItem]) -> String {
    items.iter().fold(String::new(), |mut text, item| {
        text.push_str(&format_shopping_list_line(item));
        text.push('\n');
        text
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::membership::{FlagKind, add_flag, remove_flag};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_amounts_are_summed_across_cart() -> Result<()> {
        let db = setup_test_db().await?;
        let chef = create_test_user(&db, "chef").await?;
        let shopper = create_test_user(&db, "shopper").await?;
        let (tag, salt, pepper) = create_test_catalog(&db).await?;

        let soup = create_named_recipe(
            &db,
            &chef,
            "Soup",
            &[tag.id],
            &[(salt.id, 10), (pepper.id, 2)],
        )
        .await?;
        let stew = create_named_recipe(&db, &chef, "Stew", &[tag.id], &[(salt.id, 5)]).await?;
        // Not in the cart, must not count
        create_named_recipe(&db, &chef, "Bread", &[tag.id], &[(salt.id, 100)]).await?;

        add_flag(&db, FlagKind::ShoppingCart, &shopper, soup.id).await?;
        add_flag(&db, FlagKind::ShoppingCart, &shopper, stew.id).await?;

        let items = build_shopping_list(&db, shopper.id).await?;
        assert_eq!(
            items,
            vec![
                ShoppingListItem {
                    name: "Pepper".to_string(),
                    measurement_unit: "g".to_string(),
                    total_amount: 2,
                },
                ShoppingListItem {
                    name: "Salt".to_string(),
                    measurement_unit: "g".to_string(),
                    total_amount: 15,
                },
            ]
        );
        assert_eq!(
            render_shopping_list(&items),
            "Pepper (g) — 2\nSalt (g) — 15\n"
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_same_name_and_unit_share_a_line() -> Result<()> {
        let db = setup_test_db().await?;
        let chef = create_test_user(&db, "chef").await?;
        let tag = create_test_tag(&db, "Dinner", "dinner").await?;
        let salt = create_test_ingredient(&db, "Salt", "g").await?;
        let other_salt = create_test_ingredient(&db, "Salt", "g").await?;
        let salt_pinch = create_test_ingredient(&db, "Salt", "pinch").await?;

        let soup = create_named_recipe(
            &db,
            &chef,
            "Soup",
            &[tag.id],
            &[(salt.id, 10), (salt_pinch.id, 1)],
        )
        .await?;
        let stew =
            create_named_recipe(&db, &chef, "Stew", &[tag.id], &[(other_salt.id, 5)]).await?;
        add_flag(&db, FlagKind::ShoppingCart, &chef, soup.id).await?;
        add_flag(&db, FlagKind::ShoppingCart, &chef, stew.id).await?;

        let items = build_shopping_list(&db, chef.id).await?;
        assert_eq!(
            render_shopping_list(&items),
            "Salt (g) — 15\nSalt (pinch) — 1\n"
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_empty_cart_gives_empty_list() -> Result<()> {
        let (db, user, recipe) = setup_with_recipe().await?;
        assert!(build_shopping_list(&db, user.id).await?.is_empty());

        add_flag(&db, FlagKind::ShoppingCart, &user, recipe.id).await?;
        assert_eq!(build_shopping_list(&db, user.id).await?.len(), 1);

        remove_flag(&db, FlagKind::ShoppingCart, &user, recipe.id).await?;
        assert!(build_shopping_list(&db, user.id).await?.is_empty());

        Ok(())
    }

    #[test]
    fn test_format_line() {
        let item = ShoppingListItem {
            name: "Salt".to_string(),
            measurement_unit: "g".to_string(),
            total_amount: 15,
        };
        assert_eq!(format_shopping_list_line(&item), "Salt (g) — 15");
        assert_eq!(render_shopping_list(&[]), "");
    }
}
