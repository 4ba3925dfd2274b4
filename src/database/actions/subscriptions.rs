use std::collections::{HashMap, HashSet};

use sqlx::{Pool, Postgres};

use crate::{
    error::{Error, HtmlError, QueryError},
    pagination::{PageContext, PageQuery},
    schema::{Id, Recipe, SubscriptionRow, User},
    views::{RecipeShort, SubscriptionView, UserView},
};

use super::users::{get_user_by_id, user_not_found};

/// Subscribing to oneself is refused whatever else holds.
pub fn check_subscription_target(user_id: Id, author_id: Id) -> Result<(), Error> {
    if user_id == author_id {
        return Err(HtmlError::InvalidRequest.new("You cannot subscribe to yourself."));
    }
    Ok(())
}

/// Recipes shown per author; no limit or a negative one shows all.
pub fn recipes_bound(limit: Option<i64>) -> Option<i64> {
    limit.filter(|limit| !limit.is_negative())
}

pub async fn subscribe(
    user_id: Id,
    author_id: Id,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<SubscriptionView, Error> {
    check_subscription_target(user_id, author_id)?;
    let author = get_user_by_id(pool, author_id)
        .await?
        .ok_or_else(user_not_found)?;

    let result = sqlx::query(
        "INSERT INTO subscriptions (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::Conflict.new("You are already subscribed to this user."));
    }

    log::debug!("User {user_id} subscribed to {author_id}");
    subscription_view(author, recipes_limit, pool).await
}

pub async fn unsubscribe(user_id: Id, author_id: Id, pool: &Pool<Postgres>) -> Result<(), Error> {
    if get_user_by_id(pool, author_id).await?.is_none() {
        return Err(user_not_found());
    }

    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::NotFound.new("You are not subscribed to this user."));
    }

    log::debug!("User {user_id} unsubscribed from {author_id}");
    Ok(())
}

/// Authors among `author_ids` the user follows.
pub async fn subscribed_authors(
    user_id: Id,
    author_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, Error> {
    let rows: Vec<(Id,)> = sqlx::query_as(
        "SELECT author_id FROM subscriptions WHERE user_id = $1 AND author_id = ANY($2)",
    )
    .bind(user_id)
    .bind(author_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

/// Newest recipes of each author, at most `recipes_limit` per author.
async fn author_recipes(
    author_ids: &[Id],
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<HashMap<Id, Vec<RecipeShort>>, Error> {
    let rows: Vec<Recipe> = sqlx::query_as(
        "
        SELECT * FROM (
            SELECT r.*, ROW_NUMBER() OVER (
                PARTITION BY r.author_id ORDER BY r.created DESC, r.id DESC
            ) AS position
            FROM recipes r
            WHERE r.author_id = ANY($1)
        ) ranked
        WHERE $2::BIGINT IS NULL OR ranked.position <= $2
        ORDER BY ranked.author_id, ranked.position
    ",
    )
    .bind(author_ids)
    .bind(recipes_bound(recipes_limit))
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut recipes: HashMap<Id, Vec<RecipeShort>> = HashMap::new();
    for recipe in rows {
        recipes.entry(recipe.author_id).or_default().push(recipe.into());
    }
    Ok(recipes)
}

async fn subscription_view(
    author: User,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<SubscriptionView, Error> {
    let recipes_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author.id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;
    let recipes = author_recipes(&[author.id], recipes_limit, pool)
        .await?
        .remove(&author.id)
        .unwrap_or_default();

    Ok(SubscriptionView {
        recipes_count: recipes_count.0,
        recipes,
        author: UserView::new(author, true),
    })
}

/// Authors the user follows, ordered by username.
pub async fn fetch_subscriptions(
    user_id: Id,
    page: &PageQuery,
    recipes_limit: Option<i64>,
    base_url: &str,
    pool: &Pool<Postgres>,
) -> Result<PageContext<SubscriptionView>, Error> {
    let rows: Vec<SubscriptionRow> = sqlx::query_as(
        "
        SELECT u.*,
               (SELECT COUNT(*) FROM recipes r WHERE r.author_id = u.id) AS recipes_count,
               COUNT(*) OVER() AS count
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY u.username
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let author_ids: Vec<Id> = rows.iter().map(|row| row.author.id).collect();
    let mut recipes = author_recipes(&author_ids, recipes_limit, pool).await?;

    let views = rows
        .into_iter()
        .map(|row| SubscriptionView {
            recipes: recipes.remove(&row.author.id).unwrap_or_default(),
            recipes_count: row.recipes_count,
            author: UserView::new(row.author, true),
        })
        .collect();

    Ok(PageContext::from_rows(views, total_count, page, base_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_subscription_is_refused() {
        let error = check_subscription_target(4, 4).unwrap_err();
        assert_eq!(error.kind, HtmlError::InvalidRequest);
        assert!(check_subscription_target(4, 5).is_ok());
    }

    #[test]
    fn negative_recipe_limits_show_everything() {
        assert_eq!(recipes_bound(Some(2)), Some(2));
        assert_eq!(recipes_bound(Some(0)), Some(0));
        assert_eq!(recipes_bound(None), None);
        assert_eq!(recipes_bound(Some(-1)), None);
    }
}
