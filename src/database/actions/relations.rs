use std::collections::HashSet;

use sqlx::{Pool, Postgres};

use crate::{
    error::{Error, HtmlError, QueryError},
    schema::{Id, RelationKind},
    views::RecipeShort,
};

use super::recipes::{get_recipe, recipe_not_found};

/// Marks a recipe as a favorite or puts it in the cart. A second add of the
/// same pair is a conflict.
pub async fn add_relation(
    kind: RelationKind,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<RecipeShort, Error> {
    let recipe = get_recipe(recipe_id, pool).await?.ok_or_else(|| {
        Error::field(
            "recipe",
            &format!("Invalid pk \"{recipe_id}\" - object does not exist."),
        )
    })?;

    let result = sqlx::query(
        "
        INSERT INTO user_recipe_relations (user_id, recipe_id, kind)
        VALUES ($1, $2, $3)
        ON CONFLICT DO NOTHING
    ",
    )
    .bind(user_id)
    .bind(recipe_id)
    .bind(kind)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::Conflict.new(&format!("Recipe is already in {}.", kind.label())));
    }

    log::debug!("User {user_id} added recipe {recipe_id} to {}", kind.label());
    Ok(recipe.into())
}

pub async fn remove_relation(
    kind: RelationKind,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    if get_recipe(recipe_id, pool).await?.is_none() {
        return Err(recipe_not_found());
    }

    let result = sqlx::query(
        "DELETE FROM user_recipe_relations WHERE user_id = $1 AND recipe_id = $2 AND kind = $3",
    )
    .bind(user_id)
    .bind(recipe_id)
    .bind(kind)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::NotFound.new(&format!("Recipe is not in {}.", kind.label())));
    }

    log::debug!("User {user_id} removed recipe {recipe_id} from {}", kind.label());
    Ok(())
}

/// The subset of `recipe_ids` the user holds a `kind` relation to.
pub async fn related_recipes(
    kind: RelationKind,
    user_id: Id,
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, Error> {
    let rows: Vec<(Id,)> = sqlx::query_as(
        "
        SELECT recipe_id FROM user_recipe_relations
        WHERE user_id = $1 AND kind = $2 AND recipe_id = ANY($3)
    ",
    )
    .bind(user_id)
    .bind(kind)
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}
