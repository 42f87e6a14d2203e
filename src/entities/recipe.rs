//! Recipe entity - A dish published by a user.
//!
//! Tags are linked through [`super::recipe_tag`] and ingredient amounts through
//! [`super::recipe_ingredient`]. Deleting a recipe removes both kinds of rows as
//! well as every favorite and shopping cart flag pointing at it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Recipe database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipes")]
pub struct Model {
    /// Unique identifier for the recipe
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner of the recipe; only the author may modify it
    pub author_id: i64,
    /// Title of the dish
    pub name: String,
    /// Image reference as supplied by the client
    pub image: String,
    /// Cooking instructions
    #[sea_orm(column_type = "Text")]
    pub text: String,
    /// Cooking time in minutes, at least 1
    pub cooking_time: i32,
    /// Publication time, set once at creation
    pub pub_date: DateTimeUtc,
}

/// Defines relationships between Recipe and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each recipe belongs to one author
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Author,
    /// Composition rows (ingredient amounts)
    #[sea_orm(has_many = "super::recipe_ingredient::Entity")]
    RecipeIngredients,
    /// Tag links
    #[sea_orm(has_many = "super::recipe_tag::Entity")]
    RecipeTags,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::recipe_ingredient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecipeIngredients.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::recipe_tag::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::recipe_tag::Relation::Recipe.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
