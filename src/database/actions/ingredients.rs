use std::collections::BTreeSet;

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{Error, QueryError},
    schema::{Id, Ingredient},
    search::rank_ingredients,
};

/// Ingredients whose name contains `term`, prefix matches first. A missing or
/// blank term lists every ingredient alphabetically.
pub async fn search_ingredients(
    term: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, Error> {
    let term = term.map(str::trim).filter(|term| !term.is_empty());

    let Some(term) = term else {
        let rows: Vec<Ingredient> = sqlx::query_as("SELECT * FROM ingredients ORDER BY name, id")
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?;
        return Ok(rows);
    };

    let rows: Vec<Ingredient> =
        sqlx::query_as("SELECT * FROM ingredients WHERE strpos(LOWER(name), LOWER($1)) > 0")
            .bind(term)
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(rank_ingredients(term, rows))
}

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Ids from `ids` with no ingredient behind them.
pub async fn find_missing_ingredients(
    ids: &BTreeSet<Id>,
    conn: &mut PgConnection,
) -> Result<Vec<Id>, Error> {
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let wanted: Vec<Id> = ids.iter().copied().collect();
    let found: Vec<(Id,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(&wanted)
        .fetch_all(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    let found: BTreeSet<Id> = found.into_iter().map(|row| row.0).collect();
    Ok(ids.difference(&found).copied().collect())
}
