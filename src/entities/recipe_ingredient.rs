//! Recipe ingredient entity - How much of an ingredient a recipe requires.
//!
//! The composite primary key enforces one row per (recipe, ingredient) pair.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Composition row
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipe_ingredients")]
pub struct Model {
    /// Recipe using the ingredient
    #[sea_orm(primary_key, auto_increment = false)]
    pub recipe_id: i64,
    /// Ingredient being used
    #[sea_orm(primary_key, auto_increment = false)]
    pub ingredient_id: i64,
    /// Quantity in the ingredient's measurement unit, always positive
    pub amount: i32,
}

/// Defines relationships between a composition row and its endpoints
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each row belongs to one recipe
    #[sea_orm(
        belongs_to = "super::recipe::Entity",
        from = "Column::RecipeId",
        to = "super::recipe::Column::Id",
        on_delete = "Cascade"
    )]
    Recipe,
    /// Each row references one ingredient
    #[sea_orm(
        belongs_to = "super::ingredient::Entity",
        from = "Column::IngredientId",
        to = "super::ingredient::Column::Id",
        on_delete = "Cascade"
    )]
    Ingredient,
}

impl Related<super::recipe::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipe.def()
    }
}

impl Related<super::ingredient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ingredient.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
