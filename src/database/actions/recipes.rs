use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    authentication::permissions::ActionType,
    diff::diff_amounts,
    error::{Error, HtmlError, QueryError},
    filter::RecipeFilter,
    jwt::SessionData,
    pagination::PageContext,
    schema::{Id, Recipe, RecipePart, RecipeRow, RelationKind, Tag},
    validation::{IngredientAmount, RecipeDraft},
    views::{RecipeDetail, RecipeIngredientView, UserView},
};

use super::{
    ingredients::find_missing_ingredients,
    relations::related_recipes,
    subscriptions::subscribed_authors,
    tags::{join_ids, list_recipe_tags, replace_recipe_tags},
    users::get_users_by_ids,
};

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    viewer: Option<Id>,
    base_url: &str,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeDetail>, Error> {
    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");

    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ").push_bind(author);
    }
    if !filter.tags.is_empty() {
        query
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }
    if let Some(user_id) = filter.favorited_by(viewer) {
        push_relation_filter(&mut query, RelationKind::Favorite, user_id);
    }
    if let Some(user_id) = filter.in_cart_of(viewer) {
        push_relation_filter(&mut query, RelationKind::ShoppingCart, user_id);
    }

    query
        .push(" ORDER BY r.created DESC, r.id DESC LIMIT ")
        .push_bind(filter.page.limit())
        .push(" OFFSET ")
        .push_bind(filter.page.offset());

    let rows: Vec<RecipeRow> = query
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let recipes = rows.into_iter().map(|row| row.recipe).collect();
    let details = hydrate_recipes(recipes, viewer, pool).await?;

    Ok(PageContext::from_rows(
        details,
        total_count,
        &filter.page,
        base_url,
    ))
}

fn push_relation_filter(query: &mut QueryBuilder<Postgres>, kind: RelationKind, user_id: Id) {
    query
        .push(" AND EXISTS (SELECT 1 FROM user_recipe_relations rel WHERE rel.recipe_id = r.id AND rel.user_id = ")
        .push_bind(user_id)
        .push(" AND rel.kind = ")
        .push_bind(kind)
        .push(")");
}

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_recipe_detail(
    id: Id,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, Error> {
    let recipe = get_recipe(id, pool).await?.ok_or_else(recipe_not_found)?;

    hydrate_recipes(vec![recipe], viewer, pool)
        .await?
        .pop()
        .ok_or_else(recipe_not_found)
}

/// Loads a recipe the session may modify: missing recipes are 404, foreign
/// recipes are 403 unless the session manages every recipe.
pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, Error> {
    session.authenticate(ActionType::ManageOwnRecipes)?;
    let recipe = get_recipe(id, pool).await?.ok_or_else(recipe_not_found)?;

    match session.authenticate(ActionType::ManageAllRecipes) {
        Ok(_) => Ok(recipe),
        Err(_) if recipe.author_id == session.user_id => Ok(recipe),
        Err(e) => Err(e),
    }
}

pub fn recipe_not_found() -> Error {
    HtmlError::NotFound.new("No recipe exists with specified id.")
}

pub async fn list_recipe_parts(
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipePart>, Error> {
    let rows: Vec<RecipePart> = sqlx::query_as(
        "
        SELECT ri.recipe_id AS recipe_id, i.id AS ingredient_id, i.name AS name,
               i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY ri.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

/// Attaches tags, ingredients, author and the viewer's flags to each recipe
/// with one query per concern.
pub async fn hydrate_recipes(
    recipes: Vec<Recipe>,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeDetail>, Error> {
    if recipes.is_empty() {
        return Ok(vec![]);
    }

    let ids: Vec<Id> = recipes.iter().map(|recipe| recipe.id).collect();
    let author_ids: Vec<Id> = recipes
        .iter()
        .map(|recipe| recipe.author_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut tags: HashMap<Id, Vec<Tag>> = HashMap::new();
    for tag in list_recipe_tags(&ids, pool).await? {
        tags.entry(tag.recipe_id).or_default().push(tag.into());
    }

    let mut parts: HashMap<Id, Vec<RecipeIngredientView>> = HashMap::new();
    for part in list_recipe_parts(&ids, pool).await? {
        parts.entry(part.recipe_id).or_default().push(part.into());
    }

    let authors: HashMap<Id, _> = get_users_by_ids(&author_ids, pool)
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect();

    let (favorites, cart, subscribed) = match viewer {
        Some(user_id) => (
            related_recipes(RelationKind::Favorite, user_id, &ids, pool).await?,
            related_recipes(RelationKind::ShoppingCart, user_id, &ids, pool).await?,
            subscribed_authors(user_id, &author_ids, pool).await?,
        ),
        None => (HashSet::new(), HashSet::new(), HashSet::new()),
    };

    recipes
        .into_iter()
        .map(|recipe| -> Result<RecipeDetail, Error> {
            let author = authors.get(&recipe.author_id).cloned().ok_or_else(|| {
                log::error!("Recipe {} has no author row", recipe.id);
                HtmlError::InternalServerError.default()
            })?;

            Ok(RecipeDetail {
                id: recipe.id,
                tags: tags.remove(&recipe.id).unwrap_or_default(),
                author: UserView::new(author, subscribed.contains(&recipe.author_id)),
                ingredients: parts.remove(&recipe.id).unwrap_or_default(),
                is_favorited: favorites.contains(&recipe.id),
                is_in_shopping_cart: cart.contains(&recipe.id),
                name: recipe.name,
                image: recipe.image,
                text: recipe.text,
                cooking_time: recipe.cooking_time,
            })
        })
        .collect()
}

/// Inserts the recipe with its ingredients and tags in one transaction.
/// `draft` must have been validated for creation.
pub async fn create_recipe(
    author_id: Id,
    draft: &RecipeDraft,
    pool: &Pool<Postgres>,
) -> Result<Id, Error> {
    let (Some(name), Some(text), Some(image), Some(cooking_time), Some(ingredients), Some(tags)) = (
        draft.name.as_deref(),
        draft.text.as_deref(),
        draft.image.as_deref(),
        draft.cooking_time,
        draft.ingredients.as_deref(),
        draft.tag_set(),
    ) else {
        return Err(HtmlError::InvalidRequest.new("Recipe is incomplete."));
    };

    let mut tr = pool.begin().await.map_err(QueryError::from)?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(name)
    .bind(image)
    .bind(text)
    .bind(cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    write_ingredients(id.0, &BTreeMap::new(), ingredients, &mut *tr).await?;
    replace_recipe_tags(id.0, &tags, &mut *tr).await?;

    tr.commit().await.map_err(QueryError::from)?;

    log::info!("User {author_id} created recipe {}", id.0);
    Ok(id.0)
}

/// Applies a partial update. Absent fields stay as they are; present
/// ingredient and tag lists replace the stored ones through a diff so
/// unchanged rows are never rewritten.
pub async fn update_recipe(id: Id, draft: &RecipeDraft, pool: &Pool<Postgres>) -> Result<(), Error> {
    let mut tr = pool.begin().await.map_err(QueryError::from)?;

    let locked: Option<(Id,)> = sqlx::query_as("SELECT id FROM recipes WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tr)
        .await
        .map_err(QueryError::from)?;
    if locked.is_none() {
        return Err(recipe_not_found());
    }

    sqlx::query(
        "
        UPDATE recipes SET
            name = COALESCE($2, name),
            image = COALESCE($3, image),
            text = COALESCE($4, text),
            cooking_time = COALESCE($5, cooking_time)
        WHERE id = $1
    ",
    )
    .bind(id)
    .bind(draft.name.as_deref())
    .bind(draft.image.as_deref())
    .bind(draft.text.as_deref())
    .bind(draft.cooking_time)
    .execute(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    if let Some(incoming) = draft.ingredients.as_deref() {
        let existing = recipe_amounts(id, &mut *tr).await?;
        write_ingredients(id, &existing, incoming, &mut *tr).await?;
    }
    if let Some(tags) = draft.tag_set() {
        replace_recipe_tags(id, &tags, &mut *tr).await?;
    }

    tr.commit().await.map_err(QueryError::from)?;

    log::info!("Updated recipe {id}");
    Ok(())
}

pub async fn delete_recipe(id: Id, pool: &Pool<Postgres>) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(recipe_not_found());
    }

    log::info!("Deleted recipe {id}");
    Ok(())
}

async fn recipe_amounts(
    recipe_id: Id,
    conn: &mut PgConnection,
) -> Result<BTreeMap<Id, i32>, Error> {
    let rows: Vec<(Id, i32)> = sqlx::query_as(
        "SELECT ingredient_id, amount FROM recipe_ingredients WHERE recipe_id = $1",
    )
    .bind(recipe_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(QueryError::from)?;

    Ok(rows.into_iter().collect())
}

/// Moves the stored ingredient amounts of a recipe from `existing` to
/// `incoming` with the minimal delete, update and insert set. New rows are
/// inserted in payload order; kept rows keep their place.
async fn write_ingredients(
    recipe_id: Id,
    existing: &BTreeMap<Id, i32>,
    incoming: &[IngredientAmount],
    conn: &mut PgConnection,
) -> Result<(), Error> {
    let amounts: BTreeMap<Id, i32> = incoming.iter().map(|i| (i.id, i.amount)).collect();
    let ids: BTreeSet<Id> = amounts.keys().copied().collect();
    let missing = find_missing_ingredients(&ids, &mut *conn).await?;
    if !missing.is_empty() {
        return Err(Error::field(
            "ingredients",
            &format!("Ingredients do not exist: {}.", join_ids(&missing)),
        ));
    }

    let diff = diff_amounts(existing, &amounts);

    if !diff.delete.is_empty() {
        let delete: Vec<Id> = diff.delete.into_iter().collect();
        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1 AND ingredient_id = ANY($2)")
            .bind(recipe_id)
            .bind(&delete)
            .execute(&mut *conn)
            .await
            .map_err(QueryError::from)?;
    }

    if !diff.update.is_empty() {
        let (ingredient_ids, amounts): (Vec<Id>, Vec<i32>) = diff.update.into_iter().unzip();
        sqlx::query(
            "
            UPDATE recipe_ingredients ri SET amount = u.amount
            FROM UNNEST($2::INT[], $3::INT[]) AS u(ingredient_id, amount)
            WHERE ri.recipe_id = $1 AND ri.ingredient_id = u.ingredient_id
        ",
        )
        .bind(recipe_id)
        .bind(&ingredient_ids)
        .bind(&amounts)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;
    }

    if !diff.insert.is_empty() {
        let (ingredient_ids, amounts): (Vec<Id>, Vec<i32>) = incoming
            .iter()
            .filter(|ingredient| diff.insert.contains_key(&ingredient.id))
            .map(|ingredient| (ingredient.id, ingredient.amount))
            .unzip();
        sqlx::query(
            "
            INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount)
            SELECT $1, u.ingredient_id, u.amount
            FROM UNNEST($2::INT[], $3::INT[]) WITH ORDINALITY AS u(ingredient_id, amount, position)
            ORDER BY u.position
        ",
        )
        .bind(recipe_id)
        .bind(&ingredient_ids)
        .bind(&amounts)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;
    }

    Ok(())
}
