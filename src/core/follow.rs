//! Subscriptions between users.
//!
//! A follow is a directed (follower, followed) edge. Users cannot follow
//! themselves and an edge exists at most once.

use crate::{
    core::{
        auth::Actor,
        pagination::{Page, PageWindow},
        representation::{SubscriptionProfile, user_profile, with_recipes},
        user::require_user_by_id,
    },
    entities::{Follow, User, follow, user},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Query};
use tracing::{info, instrument};

async fn edge_exists<C>(db: &C, follower_id: i64, followed_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(Follow::find_by_id((follower_id, followed_id))
        .one(db)
        .await?
        .is_some())
}

async fn insert_edge<C>(db: &C, follower_id: i64, followed: &user::Model) -> Result<()>
where
    C: ConnectionTrait,
{
    Follow::insert(follow::ActiveModel {
        follower_id: Set(follower_id),
        followed_id: Set(followed.id),
    })
    .exec_without_returning(db)
    .await
    .map(|_| ())
    .map_err(|e| Error::conflict_on_unique(e, format!("Already subscribed to {}", followed.username)))
}

/// Whether the actor follows `target_id`. Always `false` for anonymous actors,
/// without querying storage.
pub async fn is_subscribed<C>(db: &C, actor: &Actor, target_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let Some(follower_id) = actor.user_id() else {
        return Ok(false);
    };
    edge_exists(db, follower_id, target_id).await
}

/// Makes `user` follow `target_id` and returns the target's profile with
/// their recipes attached.
///
/// # Errors
/// - [`Error::Conflict`] when following oneself or an already followed user
/// - [`Error::NotFound`] if the target does not exist
#[instrument(skip(db, user), fields(user_id = user.id))]
pub async fn follow(
    db: &DatabaseConnection,
    user: &user::Model,
    target_id: i64,
    recipes_limit: Option<u64>,
) -> Result<SubscriptionProfile> {
    if user.id == target_id {
        return Err(Error::conflict("You cannot subscribe to yourself"));
    }

    let txn = db.begin().await?;

    let target = require_user_by_id(&txn, target_id).await?;
    if edge_exists(&txn, user.id, target_id).await? {
        return Err(Error::conflict(format!(
            "Already subscribed to {}",
            target.username
        )));
    }
    insert_edge(&txn, user.id, &target).await?;

    txn.commit().await?;
    info!("User {} now follows {target_id}", user.id);

    let actor = Actor::User(user.clone());
    let profile = user_profile(db, &actor, &target).await?;
    with_recipes(db, profile, recipes_limit).await
}

/// Removes the edge from `user` to `target_id`.
///
/// # Errors
/// [`Error::NotFound`] if `user` does not follow the target.
#[instrument(skip(db, user), fields(user_id = user.id))]
pub async fn unfollow(db: &DatabaseConnection, user: &user::Model, target_id: i64) -> Result<()> {
    let result = Follow::delete_by_id((user.id, target_id)).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("You are not subscribed to this user"));
    }
    info!("User {} unfollowed {target_id}", user.id);
    Ok(())
}

/// Users followed by `user`, ordered by id, each with their recipes attached.
pub async fn list_following(
    db: &DatabaseConnection,
    user: &user::Model,
    window: PageWindow,
    recipes_limit: Option<u64>,
) -> Result<Page<SubscriptionProfile>> {
    let paginator = User::find()
        .filter(
            user::Column::Id.in_subquery(
                Query::select()
                    .column(follow::Column::FollowedId)
                    .from(Follow)
                    .and_where(follow::Column::FollowerId.eq(user.id))
                    .to_owned(),
            ),
        )
        .order_by_asc(user::Column::Id)
        .paginate(db, window.size);
    let count = paginator.num_items().await?;
    let rows = paginator.fetch_page(window.index()).await?;

    let actor = Actor::User(user.clone());
    let mut profiles = Vec::with_capacity(rows.len());
    for followed in &rows {
        let profile = user_profile(db, &actor, followed).await?;
        profiles.push(with_recipes(db, profile, recipes_limit).await?);
    }
    Ok(Page::from_rows(rows, count, window).with_results(profiles))
}
