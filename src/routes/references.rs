use serde::Deserialize;
use warp::{
    filters::BoxedFilter,
    http::{StatusCode, Uri},
    reject::Rejection,
    reply::{Reply, Response},
    Filter,
};

use crate::{
    actions::{get_ingredient, get_recipe, get_tag, list_tags, recipe_not_found, search_ingredients},
    error::HtmlError,
    schema::Id,
    shortlink::decode_short_code,
};

use super::filters::{json_reply, with_context, Context};

#[derive(Deserialize, Debug, Default)]
struct IngredientQuery {
    name: Option<String>,
}

/// Ingredients, tags and short-link redirects. All public.
pub fn routes(ctx: Context) -> BoxedFilter<(Response,)> {
    let ingredients = warp::path!("ingredients")
        .and(warp::get())
        .and(warp::query::<IngredientQuery>())
        .and(with_context(ctx.clone()))
        .and_then(ingredients);
    let ingredient = warp::path!("ingredients" / Id)
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(ingredient);
    let tags = warp::path!("tags")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(tags);
    let tag = warp::path!("tags" / Id)
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(tag);
    let short_link = warp::path!("s" / String)
        .and(warp::get())
        .and(with_context(ctx))
        .and_then(follow_short_link);

    ingredients
        .or(ingredient)
        .unify()
        .or(tags)
        .unify()
        .or(tag)
        .unify()
        .or(short_link)
        .unify()
        .boxed()
}

async fn ingredients(query: IngredientQuery, ctx: Context) -> Result<Response, Rejection> {
    let ingredients = search_ingredients(query.name.as_deref(), &ctx.pool).await?;
    Ok(json_reply(&ingredients, StatusCode::OK))
}

async fn ingredient(id: Id, ctx: Context) -> Result<Response, Rejection> {
    let ingredient = get_ingredient(id, &ctx.pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;
    Ok(json_reply(&ingredient, StatusCode::OK))
}

async fn tags(ctx: Context) -> Result<Response, Rejection> {
    let tags = list_tags(&ctx.pool).await?;
    Ok(json_reply(&tags, StatusCode::OK))
}

async fn tag(id: Id, ctx: Context) -> Result<Response, Rejection> {
    let tag = get_tag(id, &ctx.pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;
    Ok(json_reply(&tag, StatusCode::OK))
}

async fn follow_short_link(code: String, ctx: Context) -> Result<Response, Rejection> {
    let id = decode_short_code(&code).ok_or_else(recipe_not_found)?;
    let recipe = get_recipe(id, &ctx.pool).await?.ok_or_else(recipe_not_found)?;

    let location: Uri = format!("/recipes/{}/", recipe.id)
        .parse()
        .map_err(|_| HtmlError::InternalServerError.default())?;

    Ok(warp::redirect::found(location).into_response())
}
