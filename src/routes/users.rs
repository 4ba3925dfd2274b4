use serde::Deserialize;
use warp::{
    filters::BoxedFilter,
    http::StatusCode,
    reject::Rejection,
    reply::Response,
    Filter,
};

use crate::{
    actions::{
        clear_avatar, fetch_subscriptions, fetch_users, get_user_view, register_user, set_avatar,
        set_password, subscribe, unsubscribe,
    },
    form::Form,
    jwt::SessionData,
    middleware::with_session,
    pagination::PageQuery,
    permissions::ActionType,
    schema::Id,
    validation::{avatar_from_form, NewUser, PasswordChange},
    views::{AvatarView, CreatedUserView},
};

use super::filters::{json_form, json_reply, no_content, with_context, Context};

#[derive(Deserialize, Debug, Default)]
struct SubscriptionQuery {
    page: Option<i64>,
    limit: Option<i64>,
    recipes_limit: Option<i64>,
}

impl SubscriptionQuery {
    fn page(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
struct UserQuery {
    page: Option<i64>,
    limit: Option<i64>,
    search: Option<String>,
}

impl UserQuery {
    fn page(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
struct RecipesLimit {
    recipes_limit: Option<i64>,
}

pub fn routes(ctx: Context) -> BoxedFilter<(Response,)> {
    let key = ctx.key.clone();

    let register = warp::path!("users")
        .and(warp::post())
        .and(json_form())
        .and(with_context(ctx.clone()))
        .and_then(register);
    let list = warp::path!("users")
        .and(warp::get())
        .and(with_session(key.clone()))
        .and(warp::query::<UserQuery>())
        .and(with_context(ctx.clone()))
        .and_then(list);
    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(with_session(key.clone()))
        .and(with_context(ctx.clone()))
        .and_then(me);
    let profile = warp::path!("users" / Id)
        .and(warp::get())
        .and(with_session(key.clone()))
        .and(with_context(ctx.clone()))
        .and_then(profile);
    let change_password = warp::path!("users" / "set_password")
        .and(warp::post())
        .and(with_session(key.clone()))
        .and(json_form())
        .and(with_context(ctx.clone()))
        .and_then(change_password);
    let put_avatar = warp::path!("users" / "me" / "avatar")
        .and(warp::put())
        .and(with_session(key.clone()))
        .and(json_form())
        .and(with_context(ctx.clone()))
        .and_then(put_avatar);
    let delete_avatar = warp::path!("users" / "me" / "avatar")
        .and(warp::delete())
        .and(with_session(key.clone()))
        .and(with_context(ctx.clone()))
        .and_then(delete_avatar);
    let subscriptions = warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(with_session(key.clone()))
        .and(warp::query::<SubscriptionQuery>())
        .and(with_context(ctx.clone()))
        .and_then(subscriptions);
    let follow = warp::path!("users" / Id / "subscribe")
        .and(warp::post())
        .and(with_session(key.clone()))
        .and(warp::query::<RecipesLimit>())
        .and(with_context(ctx.clone()))
        .and_then(follow);
    let unfollow = warp::path!("users" / Id / "subscribe")
        .and(warp::delete())
        .and(with_session(key))
        .and(with_context(ctx))
        .and_then(unfollow);

    register
        .or(list)
        .unify()
        .or(me)
        .unify()
        .or(profile)
        .unify()
        .or(change_password)
        .unify()
        .or(put_avatar)
        .unify()
        .or(delete_avatar)
        .unify()
        .or(subscriptions)
        .unify()
        .or(follow)
        .unify()
        .or(unfollow)
        .unify()
        .boxed()
}

async fn register(form: Form, ctx: Context) -> Result<Response, Rejection> {
    let new_user = NewUser::from_form(&form)?;
    let user = register_user(new_user, &ctx.pool).await?;

    Ok(json_reply(&CreatedUserView::from(user), StatusCode::CREATED))
}

async fn list(session: SessionData, query: UserQuery, ctx: Context) -> Result<Response, Rejection> {
    let users = fetch_users(
        session.user_id,
        query.search.as_deref(),
        &query.page(),
        &ctx.url("/users/"),
        &ctx.pool,
    )
    .await?;
    Ok(json_reply(&users, StatusCode::OK))
}

async fn me(session: SessionData, ctx: Context) -> Result<Response, Rejection> {
    let user = get_user_view(session.user_id, session.user_id, &ctx.pool).await?;
    Ok(json_reply(&user, StatusCode::OK))
}

async fn profile(id: Id, session: SessionData, ctx: Context) -> Result<Response, Rejection> {
    let user = get_user_view(id, session.user_id, &ctx.pool).await?;
    Ok(json_reply(&user, StatusCode::OK))
}

async fn change_password(
    session: SessionData,
    form: Form,
    ctx: Context,
) -> Result<Response, Rejection> {
    let change = PasswordChange::from_form(&form)?;
    set_password(session.user_id, &change, &ctx.pool).await?;

    Ok(no_content())
}

async fn put_avatar(session: SessionData, form: Form, ctx: Context) -> Result<Response, Rejection> {
    let avatar = avatar_from_form(&form)?;
    set_avatar(session.user_id, &avatar, &ctx.pool).await?;

    Ok(json_reply(
        &AvatarView {
            avatar: Some(avatar),
        },
        StatusCode::OK,
    ))
}

async fn delete_avatar(session: SessionData, ctx: Context) -> Result<Response, Rejection> {
    clear_avatar(session.user_id, &ctx.pool).await?;
    Ok(no_content())
}

async fn subscriptions(
    session: SessionData,
    query: SubscriptionQuery,
    ctx: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageSubscriptions)?;
    let page = fetch_subscriptions(
        session.user_id,
        &query.page(),
        query.recipes_limit,
        &ctx.url("/users/subscriptions/"),
        &ctx.pool,
    )
    .await?;

    Ok(json_reply(&page, StatusCode::OK))
}

async fn follow(
    id: Id,
    session: SessionData,
    query: RecipesLimit,
    ctx: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageSubscriptions)?;
    let subscription = subscribe(session.user_id, id, query.recipes_limit, &ctx.pool).await?;

    Ok(json_reply(&subscription, StatusCode::CREATED))
}

async fn unfollow(id: Id, session: SessionData, ctx: Context) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageSubscriptions)?;
    unsubscribe(session.user_id, id, &ctx.pool).await?;

    Ok(no_content())
}
