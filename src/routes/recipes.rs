use warp::{
    filters::BoxedFilter,
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderValue, StatusCode,
    },
    reject::Rejection,
    reply::{Reply, Response},
    Filter,
};

use crate::{
    actions::{
        add_relation, build_shopping_list, create_recipe, delete_recipe, fetch_recipes,
        get_recipe, get_recipe_detail, get_recipe_mut, recipe_not_found, remove_relation,
        update_recipe,
    },
    error::HtmlError,
    filter::RecipeFilter,
    form::Form,
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    permissions::ActionType,
    schema::{Id, RelationKind},
    shortlink::short_link,
    validation::{RecipeDraft, WriteMode},
    views::ShortLinkView,
};

use super::filters::{json_form, json_reply, no_content, query_pairs, with_context, Context};

pub fn routes(ctx: Context) -> BoxedFilter<(Response,)> {
    let key = ctx.key.clone();

    let list = warp::path!("recipes")
        .and(warp::get())
        .and(query_pairs())
        .and(with_possible_session(key.clone()))
        .and(with_context(ctx.clone()))
        .and_then(list);
    let create = warp::path!("recipes")
        .and(warp::post())
        .and(with_session(key.clone()))
        .and(json_form())
        .and(with_context(ctx.clone()))
        .and_then(create);
    let download = warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(key.clone()))
        .and(with_context(ctx.clone()))
        .and_then(download_shopping_cart);
    let retrieve = warp::path!("recipes" / Id)
        .and(warp::get())
        .and(with_possible_session(key.clone()))
        .and(with_context(ctx.clone()))
        .and_then(retrieve);
    let update = warp::path!("recipes" / Id)
        .and(warp::patch())
        .and(with_session(key.clone()))
        .and(json_form())
        .and(with_context(ctx.clone()))
        .and_then(update);
    let destroy = warp::path!("recipes" / Id)
        .and(warp::delete())
        .and(with_session(key.clone()))
        .and(with_context(ctx.clone()))
        .and_then(destroy);
    let get_link = warp::path!("recipes" / Id / "get-link")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(get_link);

    let favorite = relation_routes("favorite", RelationKind::Favorite, ctx.clone());
    let shopping_cart = relation_routes("shopping_cart", RelationKind::ShoppingCart, ctx);

    list.or(create)
        .unify()
        .or(download)
        .unify()
        .or(retrieve)
        .unify()
        .or(update)
        .unify()
        .or(destroy)
        .unify()
        .or(get_link)
        .unify()
        .or(favorite)
        .unify()
        .or(shopping_cart)
        .unify()
        .boxed()
}

/// `POST` and `DELETE` on `/recipes/{id}/{segment}/`.
fn relation_routes(
    segment: &'static str,
    kind: RelationKind,
    ctx: Context,
) -> BoxedFilter<(Response,)> {
    let path = warp::path("recipes")
        .and(warp::path::param::<Id>())
        .and(warp::path(segment))
        .and(warp::path::end());

    let add = path
        .and(warp::post())
        .and(with_session(ctx.key.clone()))
        .and(with_context(ctx.clone()))
        .and_then(move |id: Id, session: SessionData, ctx: Context| add_to(kind, id, session, ctx));
    let remove = path
        .and(warp::delete())
        .and(with_session(ctx.key.clone()))
        .and(with_context(ctx))
        .and_then(move |id: Id, session: SessionData, ctx: Context| remove_from(kind, id, session, ctx));

    add.or(remove).unify().boxed()
}

async fn list(
    pairs: Vec<(String, String)>,
    session: Option<SessionData>,
    ctx: Context,
) -> Result<Response, Rejection> {
    let filter = RecipeFilter::from_pairs(pairs)?;
    let viewer = session.map(|session| session.user_id);
    let page = fetch_recipes(&filter, viewer, &ctx.url("/recipes/"), &ctx.pool).await?;

    Ok(json_reply(&page, StatusCode::OK))
}

async fn create(session: SessionData, form: Form, ctx: Context) -> Result<Response, Rejection> {
    session.authenticate(ActionType::CreateRecipes)?;
    let draft = RecipeDraft::from_form(&form, WriteMode::Create)?;

    let id = create_recipe(session.user_id, &draft, &ctx.pool).await?;
    let recipe = get_recipe_detail(id, Some(session.user_id), &ctx.pool).await?;

    Ok(json_reply(&recipe, StatusCode::CREATED))
}

async fn retrieve(
    id: Id,
    session: Option<SessionData>,
    ctx: Context,
) -> Result<Response, Rejection> {
    let viewer = session.map(|session| session.user_id);
    let recipe = get_recipe_detail(id, viewer, &ctx.pool).await?;

    Ok(json_reply(&recipe, StatusCode::OK))
}

async fn update(
    id: Id,
    session: SessionData,
    form: Form,
    ctx: Context,
) -> Result<Response, Rejection> {
    let recipe = get_recipe_mut(id, &session, &ctx.pool).await?;
    let draft = RecipeDraft::from_form(&form, WriteMode::Update)?;

    update_recipe(recipe.id, &draft, &ctx.pool).await?;
    let recipe = get_recipe_detail(recipe.id, Some(session.user_id), &ctx.pool).await?;

    Ok(json_reply(&recipe, StatusCode::OK))
}

async fn destroy(id: Id, session: SessionData, ctx: Context) -> Result<Response, Rejection> {
    let recipe = get_recipe_mut(id, &session, &ctx.pool).await?;
    delete_recipe(recipe.id, &ctx.pool).await?;

    Ok(no_content())
}

async fn get_link(id: Id, ctx: Context) -> Result<Response, Rejection> {
    let recipe = get_recipe(id, &ctx.pool).await?.ok_or_else(recipe_not_found)?;
    let view = ShortLinkView {
        short_link: short_link(&ctx.public_url, recipe.id),
    };

    Ok(json_reply(&view, StatusCode::OK))
}

async fn add_to(
    kind: RelationKind,
    id: Id,
    session: SessionData,
    ctx: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnRelations)?;
    let recipe = add_relation(kind, session.user_id, id, &ctx.pool).await?;

    Ok(json_reply(&recipe, StatusCode::CREATED))
}

async fn remove_from(
    kind: RelationKind,
    id: Id,
    session: SessionData,
    ctx: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnRelations)?;
    remove_relation(kind, session.user_id, id, &ctx.pool).await?;

    Ok(no_content())
}

async fn download_shopping_cart(session: SessionData, ctx: Context) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnRelations)?;
    let list = build_shopping_list(session.user_id, &ctx.pool).await?;

    // Usernames may hold non-ASCII letters, which only the byte constructor accepts.
    let disposition = format!("attachment; filename=\"{}\"", list.file_name());
    let disposition = HeaderValue::from_bytes(disposition.as_bytes())
        .map_err(|_| HtmlError::InternalServerError.new("Invalid file name."))?;

    let mut response = list.render().into_response();
    let headers = response.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(CONTENT_DISPOSITION, disposition);

    log::debug!("User {} downloaded their shopping list", session.user_id);
    Ok(response)
}
