use std::convert::Infallible;

use serde::Serialize;
use serde_json::Value;
use sqlx::{Pool, Postgres};
use warp::{
    filters::BoxedFilter,
    http::StatusCode,
    reject::Rejection,
    reply::{Reply, Response},
    Filter,
};

use crate::{constants::MAX_BODY_BYTES, form::Form, jwt::SessionKey};

use super::{recipes, references, rejection::handle_rejection, users};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct Context {
    pub pool: Pool<Postgres>,
    pub key: SessionKey,
    pub public_url: String,
}

impl Context {
    pub fn new(pool: Pool<Postgres>, key: SessionKey, public_url: &str) -> Self {
        Self {
            pool,
            key,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    /// Absolute URL of an API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.public_url, path)
    }
}

pub fn with_context(ctx: Context) -> impl Filter<Extract = (Context,), Error = Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

/// A size-limited JSON object body.
pub fn json_form() -> impl Filter<Extract = (Form,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES)
        .and(warp::body::json())
        .and_then(|value: Value| async move { Form::from_value(value).map_err(Rejection::from) })
}

/// Raw query pairs in request order; repeated keys are kept.
pub fn query_pairs() -> impl Filter<Extract = (Vec<(String, String)>,), Error = Rejection> + Clone
{
    warp::query::<Vec<(String, String)>>()
}

pub fn json_reply<T: Serialize>(value: &T, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(value), status).into_response()
}

pub fn no_content() -> Response {
    warp::reply::with_status(warp::reply(), StatusCode::NO_CONTENT).into_response()
}

/// The whole HTTP API with errors rendered as JSON.
pub fn api(ctx: Context) -> BoxedFilter<(Response,)> {
    recipes::routes(ctx.clone())
        .or(references::routes(ctx.clone()))
        .unify()
        .or(users::routes(ctx))
        .unify()
        .recover(handle_rejection)
        .unify()
        .boxed()
}
