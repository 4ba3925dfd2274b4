use chrono::Local;
use sqlx::{Pool, Postgres};

use crate::{
    error::{Error, HtmlError, QueryError},
    schema::{Id, RelationKind},
    shopping_list::{CartLine, ShoppingList},
};

use super::users::get_user_by_id;

/// Every ingredient line of every recipe in the user's cart, unsummed.
pub async fn list_cart_lines(user_id: Id, pool: &Pool<Postgres>) -> Result<Vec<CartLine>, Error> {
    let rows: Vec<(String, String, i32)> = sqlx::query_as(
        "
        SELECT i.name, i.measurement_unit, ri.amount
        FROM user_recipe_relations rel
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = rel.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE rel.user_id = $1 AND rel.kind = $2
    ",
    )
    .bind(user_id)
    .bind(RelationKind::ShoppingCart)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows
        .into_iter()
        .map(|(name, measurement_unit, amount)| CartLine {
            name,
            measurement_unit,
            amount,
        })
        .collect())
}

/// Today's shopping list for the user, dated in server local time.
pub async fn build_shopping_list(
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<ShoppingList, Error> {
    let user = get_user_by_id(pool, user_id)
        .await?
        .ok_or_else(|| HtmlError::Unauthorized.new("User not found."))?;
    let lines = list_cart_lines(user_id, pool).await?;

    Ok(ShoppingList::new(
        &user.username,
        Local::now().date_naive(),
        lines,
    ))
}
