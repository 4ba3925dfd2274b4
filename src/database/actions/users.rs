use sqlx::{Pool, Postgres};

use crate::{
    authentication::cryptography::{hash_password, verify_password},
    error::{Error, HtmlError, QueryError},
    form::FieldErrors,
    pagination::{PageContext, PageQuery},
    schema::{Id, User, UserRow},
    validation::{NewUser, PasswordChange},
    views::UserView,
};

use super::subscriptions::subscribed_authors;

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Id) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_users_by_ids(ids: &[Id], pool: &Pool<Postgres>) -> Result<Vec<User>, Error> {
    let rows: Vec<User> = sqlx::query_as("SELECT * FROM users WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows)
}

pub fn user_not_found() -> Error {
    HtmlError::NotFound.new("No user exists with specified id.")
}

/// Creates a user, storing only the argon2 hash of the password. Taken
/// emails and usernames come back as field errors.
pub async fn register_user(new_user: NewUser, pool: &Pool<Postgres>) -> Result<User, Error> {
    let taken: Vec<(String, String)> = sqlx::query_as(
        "SELECT email, username FROM users WHERE LOWER(email) = LOWER($1) OR username = $2",
    )
    .bind(&new_user.email)
    .bind(&new_user.username)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut errors = FieldErrors::new();
    if taken
        .iter()
        .any(|(email, _)| email.eq_ignore_ascii_case(&new_user.email))
    {
        errors.add("email", "A user with that email already exists.");
    }
    if taken.iter().any(|(_, username)| *username == new_user.username) {
        errors.add("username", "A user with that username already exists.");
    }
    errors.into_result(())?;

    let password = hash_password(&new_user.password)?;

    let user: Option<User> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING RETURNING *
    ",
    )
    .bind(&new_user.email)
    .bind(&new_user.username)
    .bind(&new_user.first_name)
    .bind(&new_user.last_name)
    .bind(password)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    let user = user.ok_or_else(|| HtmlError::Conflict.new("User already exists."))?;
    log::info!("Registered user {} ({})", user.username, user.id);
    Ok(user)
}

/// Users ordered by username. `search` keeps those whose username contains
/// it, ignoring case.
pub async fn fetch_users(
    viewer: Id,
    search: Option<&str>,
    page: &PageQuery,
    base_url: &str,
    pool: &Pool<Postgres>,
) -> Result<PageContext<UserView>, Error> {
    let search = search.map(str::trim).filter(|term| !term.is_empty());

    let rows: Vec<UserRow> = sqlx::query_as(
        "
        SELECT u.*, COUNT(*) OVER() AS count FROM users u
        WHERE $3::TEXT IS NULL OR strpos(LOWER(u.username), LOWER($3)) > 0
        ORDER BY u.username LIMIT $1 OFFSET $2
    ",
    )
    .bind(page.limit())
    .bind(page.offset())
    .bind(search)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let ids: Vec<Id> = rows.iter().map(|row| row.user.id).collect();
    let subscribed = subscribed_authors(viewer, &ids, pool).await?;

    let users = rows
        .into_iter()
        .map(|row| {
            let is_subscribed = subscribed.contains(&row.user.id);
            UserView::new(row.user, is_subscribed)
        })
        .collect();

    Ok(PageContext::from_rows(users, total_count, page, base_url))
}

/// A profile as seen by `viewer`.
pub async fn get_user_view(
    user_id: Id,
    viewer: Id,
    pool: &Pool<Postgres>,
) -> Result<UserView, Error> {
    let user = get_user_by_id(pool, user_id)
        .await?
        .ok_or_else(user_not_found)?;
    let is_subscribed = subscribed_authors(viewer, &[user_id], pool)
        .await?
        .contains(&user_id);

    Ok(UserView::new(user, is_subscribed))
}

pub async fn set_avatar(user_id: Id, avatar: &str, pool: &Pool<Postgres>) -> Result<(), Error> {
    sqlx::query("UPDATE users SET avatar = $1 WHERE id = $2")
        .bind(avatar)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

pub async fn clear_avatar(user_id: Id, pool: &Pool<Postgres>) -> Result<(), Error> {
    let result = sqlx::query("UPDATE users SET avatar = NULL WHERE id = $1 AND avatar IS NOT NULL")
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new("User has no avatar."));
    }
    Ok(())
}

pub async fn set_password(
    user_id: Id,
    change: &PasswordChange,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let user = get_user_by_id(pool, user_id)
        .await?
        .ok_or_else(|| HtmlError::Unauthorized.new("User not found."))?;

    if !verify_password(&change.current_password, &user.password)? {
        return Err(Error::field("current_password", "Invalid password."));
    }

    let password = hash_password(&change.new_password)?;
    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(password)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    log::info!("User {user_id} changed their password");
    Ok(())
}
