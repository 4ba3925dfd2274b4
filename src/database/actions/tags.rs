use std::collections::BTreeSet;

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    diff::diff_sets,
    error::{Error, QueryError},
    schema::{Id, LinkedRecipeTag, Tag},
};

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY name, id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> Result<Option<Tag>, Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

/// Tags of every recipe in `recipe_ids`, in tag name order.
pub async fn list_recipe_tags(
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<LinkedRecipeTag>, Error> {
    let list: Vec<LinkedRecipeTag> = sqlx::query_as(
        "
        SELECT rt.recipe_id AS recipe_id, t.id AS id, t.name AS name, t.slug AS slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.name, t.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn find_missing_tags(
    ids: &BTreeSet<Id>,
    conn: &mut PgConnection,
) -> Result<Vec<Id>, Error> {
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let wanted: Vec<Id> = ids.iter().copied().collect();
    let found: Vec<(Id,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(&wanted)
        .fetch_all(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    let found: BTreeSet<Id> = found.into_iter().map(|row| row.0).collect();
    Ok(ids.difference(&found).copied().collect())
}

async fn recipe_tag_ids(recipe_id: Id, conn: &mut PgConnection) -> Result<BTreeSet<Id>, Error> {
    let rows: Vec<(Id,)> = sqlx::query_as("SELECT tag_id FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

/// Makes the tag set of a recipe equal to `incoming`, touching only the
/// links that change. Unknown tag ids fail the whole write.
pub async fn replace_recipe_tags(
    recipe_id: Id,
    incoming: &BTreeSet<Id>,
    conn: &mut PgConnection,
) -> Result<(), Error> {
    let missing = find_missing_tags(incoming, &mut *conn).await?;
    if !missing.is_empty() {
        return Err(Error::field(
            "tags",
            &format!("Tags do not exist: {}.", join_ids(&missing)),
        ));
    }

    let existing = recipe_tag_ids(recipe_id, &mut *conn).await?;
    let diff = diff_sets(&existing, incoming);
    if diff.is_empty() {
        return Ok(());
    }

    if !diff.delete.is_empty() {
        let delete: Vec<Id> = diff.delete.into_iter().collect();
        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1 AND tag_id = ANY($2)")
            .bind(recipe_id)
            .bind(&delete)
            .execute(&mut *conn)
            .await
            .map_err(QueryError::from)?;
    }

    if !diff.insert.is_empty() {
        let insert: Vec<Id> = diff.insert.into_iter().collect();
        sqlx::query(
            "INSERT INTO recipe_tags (recipe_id, tag_id) SELECT $1, t FROM UNNEST($2::INT[]) AS t",
        )
        .bind(recipe_id)
        .bind(&insert)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;
    }

    Ok(())
}

pub(crate) fn join_ids(ids: &[Id]) -> String {
    ids.iter()
        .map(Id::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
