use warp::{reject::Rejection, Filter};

use crate::error::HtmlError;

use super::jwt::{verify_jwt_session, SessionData, SessionKey};

/// Extracts the token from `Token <jwt>` or `Bearer <jwt>`.
pub fn parse_authorization(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    if token.is_empty() {
        return None;
    }
    if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") {
        Some(token)
    } else {
        None
    }
}

fn session_from_header(header: Option<&str>, key: &SessionKey) -> Result<SessionData, Rejection> {
    let token = header
        .and_then(parse_authorization)
        .ok_or_else(|| HtmlError::Unauthorized.default())?;

    Ok(verify_jwt_session(token, key)?.into())
}

pub fn with_session(
    key: SessionKey,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let session = session_from_header(header.as_deref(), &key);
        async move { session }
    })
}

/// Anonymous and invalid credentials both yield `None`.
pub fn with_possible_session(
    key: SessionKey,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").map(move |header: Option<String>| {
        session_from_header(header.as_deref(), &key).ok()
    })
}
