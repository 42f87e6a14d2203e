//! Membership flags - favorites and the shopping cart.
//!
//! Both flags are (user, recipe) rows in their own table; the row existing is
//! the membership. Adding a flag that is already set and removing one that is
//! not set are both errors rather than no-ops.

use crate::{
    core::{auth::Actor, recipe::require_recipe, representation::RecipeSummary},
    entities::{Favorite, ShoppingCart, favorite, shopping_cart, user},
    errors::{Error, Result},
};
use sea_orm::{Set, TransactionTrait, prelude::*};
use std::fmt;
use tracing::{info, instrument};

/// Which membership table to touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    /// The user's favorite recipes
    Favorite,
    /// The user's shopping cart
    ShoppingCart,
}

impl fmt::Display for FlagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Favorite => f.write_str("favorites"),
            Self::ShoppingCart => f.write_str("shopping cart"),
        }
    }
}

async fn flag_exists<C>(db: &C, kind: FlagKind, user_id: i64, recipe_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let exists = match kind {
        FlagKind::Favorite => Favorite::find_by_id((user_id, recipe_id))
            .one(db)
            .await?
            .is_some(),
        FlagKind::ShoppingCart => ShoppingCart::find_by_id((user_id, recipe_id))
            .one(db)
            .await?
            .is_some(),
    };
    Ok(exists)
}

async fn insert_flag<C>(db: &C, kind: FlagKind, user_id: i64, recipe_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = match kind {
        FlagKind::Favorite => {
            Favorite::insert(favorite::ActiveModel {
                user_id: Set(user_id),
                recipe_id: Set(recipe_id),
            })
            .exec_without_returning(db)
            .await
        }
        FlagKind::ShoppingCart => {
            ShoppingCart::insert(shopping_cart::ActiveModel {
                user_id: Set(user_id),
                recipe_id: Set(recipe_id),
            })
            .exec_without_returning(db)
            .await
        }
    };
    result
        .map(|_| ())
        .map_err(|e| Error::conflict_on_unique(e, format!("Recipe is already in {kind}")))
}

async fn delete_flag<C>(db: &C, kind: FlagKind, user_id: i64, recipe_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = match kind {
        FlagKind::Favorite => Favorite::delete_by_id((user_id, recipe_id)).exec(db).await?,
        FlagKind::ShoppingCart => {
            ShoppingCart::delete_by_id((user_id, recipe_id))
                .exec(db)
                .await?
        }
    };
    Ok(result.rows_affected)
}

/// Sets a flag and returns the recipe in short form.
///
/// # Errors
/// - [`Error::NotFound`] if the recipe does not exist
/// - [`Error::Conflict`] if the flag is already set, including when a concurrent
///   request set it between the check and the insert
#[instrument(skip(db, user), fields(user_id = user.id))]
pub async fn add_flag(
    db: &DatabaseConnection,
    kind: FlagKind,
    user: &user::Model,
    recipe_id: i64,
) -> Result<RecipeSummary> {
    let txn = db.begin().await?;

    let recipe = require_recipe(&txn, recipe_id).await?;
    if flag_exists(&txn, kind, user.id, recipe_id).await? {
        return Err(Error::conflict(format!("Recipe is already in {kind}")));
    }
    insert_flag(&txn, kind, user.id, recipe_id).await?;

    txn.commit().await?;
    info!("Recipe {recipe_id} added to {kind}");
    Ok(RecipeSummary::from(&recipe))
}

/// Clears a flag.
///
/// # Errors
/// [`Error::NotFound`] if the recipe does not exist or the flag is not set.
#[instrument(skip(db, user), fields(user_id = user.id))]
pub async fn remove_flag(
    db: &DatabaseConnection,
    kind: FlagKind,
    user: &user::Model,
    recipe_id: i64,
) -> Result<()> {
    let txn = db.begin().await?;

    require_recipe(&txn, recipe_id).await?;
    if delete_flag(&txn, kind, user.id, recipe_id).await? == 0 {
        return Err(Error::not_found(format!("Recipe is not in {kind}")));
    }

    txn.commit().await?;
    info!("Recipe {recipe_id} removed from {kind}");
    Ok(())
}

/// Adds (`add == true`) or removes a flag on behalf of the requesting actor.
///
/// Returns the short recipe on add and `None` on remove.
///
/// # Errors
/// [`Error::Unauthenticated`] for anonymous actors, otherwise as
/// [`add_flag`] / [`remove_flag`].
pub async fn toggle_membership(
    db: &DatabaseConnection,
    kind: FlagKind,
    actor: &Actor,
    recipe_id: i64,
    add: bool,
) -> Result<Option<RecipeSummary>> {
    let user = actor.require_user()?;
    if add {
        add_flag(db, kind, user, recipe_id).await.map(Some)
    } else {
        remove_flag(db, kind, user, recipe_id).await.map(|()| None)
    }
}

/// Whether the actor has set the flag on the recipe. Always `false` for
/// anonymous actors, without querying storage.
pub async fn is_flagged<C>(db: &C, kind: FlagKind, actor: &Actor, recipe_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let Some(user_id) = actor.user_id() else {
        return Ok(false);
    };
    flag_exists(db, kind, user_id, recipe_id).await
}

/// Whether the recipe is among the actor's favorites.
pub async fn is_favorited<C>(db: &C, actor: &Actor, recipe_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    is_flagged(db, FlagKind::Favorite, actor, recipe_id).await
}

/// Whether the recipe is in the actor's shopping cart.
pub async fn is_in_shopping_cart<C>(db: &C, actor: &Actor, recipe_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    is_flagged(db, FlagKind::ShoppingCart, actor, recipe_id).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_anonymous_checks_never_query() -> Result<()> {
        // Any query against a disconnected handle fails
        let db = DatabaseConnection::Disconnected;

        assert!(!is_favorited(&db, &Actor::Anonymous, 1).await?);
        assert!(!is_in_shopping_cart(&db, &Actor::Anonymous, 1).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_anonymous_toggle_is_unauthenticated() -> Result<()> {
        let db = setup_test_db().await?;
        let result = toggle_membership(&db, FlagKind::Favorite, &Actor::Anonymous, 1, true).await;
        assert!(matches!(result, Err(Error::Unauthenticated { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_twice_is_conflict() -> Result<()> {
        let (db, user, recipe) = setup_with_recipe().await?;

        for kind in [FlagKind::Favorite, FlagKind::ShoppingCart] {
            let summary = add_flag(&db, kind, &user, recipe.id).await?;
            assert_eq!(summary.id, recipe.id);
            assert_eq!(summary.name, recipe.name);
            assert_eq!(summary.cooking_time, recipe.cooking_time);

            let second = add_flag(&db, kind, &user, recipe.id).await;
            assert!(matches!(second, Err(Error::Conflict { .. })));
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_insert_over_existing_pair_is_conflict() -> Result<()> {
        let (db, user, recipe) = setup_with_recipe().await?;

        // A request that passed the existence check but lost the race to insert
        for kind in [FlagKind::Favorite, FlagKind::ShoppingCart] {
            insert_flag(&db, kind, user.id, recipe.id).await?;
            let lost = insert_flag(&db, kind, user.id, recipe.id).await;
            assert!(matches!(lost, Err(Error::Conflict { .. })));
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_remove_twice_is_not_found() -> Result<()> {
        let (db, user, recipe) = setup_with_recipe().await?;

        for kind in [FlagKind::Favorite, FlagKind::ShoppingCart] {
            add_flag(&db, kind, &user, recipe.id).await?;
            remove_flag(&db, kind, &user, recipe.id).await?;

            let second = remove_flag(&db, kind, &user, recipe.id).await;
            assert!(matches!(second, Err(Error::NotFound { .. })));
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_flags_are_independent() -> Result<()> {
        let (db, user, recipe) = setup_with_recipe().await?;
        let actor = Actor::User(user.clone());

        add_flag(&db, FlagKind::Favorite, &user, recipe.id).await?;
        assert!(is_favorited(&db, &actor, recipe.id).await?);
        assert!(!is_in_shopping_cart(&db, &actor, recipe.id).await?);

        add_flag(&db, FlagKind::ShoppingCart, &user, recipe.id).await?;
        remove_flag(&db, FlagKind::Favorite, &user, recipe.id).await?;
        assert!(!is_favorited(&db, &actor, recipe.id).await?);
        assert!(is_in_shopping_cart(&db, &actor, recipe.id).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_flags_are_per_user() -> Result<()> {
        let (db, user, recipe) = setup_with_recipe().await?;
        let other = create_test_user(&db, "bob").await?;

        add_flag(&db, FlagKind::Favorite, &user, recipe.id).await?;
        assert!(!is_favorited(&db, &Actor::User(other.clone()), recipe.id).await?);

        // The other user can flag the same recipe independently
        add_flag(&db, FlagKind::Favorite, &other, recipe.id).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_recipe_is_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "alice").await?;

        let add = add_flag(&db, FlagKind::ShoppingCart, &user, 404).await;
        assert!(matches!(add, Err(Error::NotFound { .. })));

        let remove = remove_flag(&db, FlagKind::ShoppingCart, &user, 404).await;
        assert!(matches!(remove, Err(Error::NotFound { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_toggle_membership_round_trip() -> Result<()> {
        let (db, user, recipe) = setup_with_recipe().await?;
        let actor = Actor::User(user);

        let added =
            toggle_membership(&db, FlagKind::ShoppingCart, &actor, recipe.id, true).await?;
        assert_eq!(added.map(|s| s.id), Some(recipe.id));

        let removed =
            toggle_membership(&db, FlagKind::ShoppingCart, &actor, recipe.id, false).await?;
        assert!(removed.is_none());
        assert!(!is_in_shopping_cart(&db, &actor, recipe.id).await?);

        Ok(())
    }
}
