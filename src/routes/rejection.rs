use std::convert::Infallible;

use serde_json::json;
use warp::{
    body::BodyDeserializeError,
    http::StatusCode,
    reject::{
        InvalidQuery, LengthRequired, MethodNotAllowed, PayloadTooLarge, Rejection,
        UnsupportedMediaType,
    },
    reply::Response,
};

use crate::error::{Error, HtmlError};

use super::filters::json_reply;

/// Renders every rejection as a JSON body. Our own errors win over warp's
/// routing rejections, and 405 wins over 404.
pub async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    let (status, body) = if let Some(error) = rejection.find::<Error>() {
        if error.kind == HtmlError::InternalServerError {
            log::error!("Request failed: {error}");
        }
        (error.status(), error.body())
    } else if let Some(e) = rejection.find::<BodyDeserializeError>() {
        (
            StatusCode::BAD_REQUEST,
            json!({ "non_field_errors": [format!("JSON parse error: {e}")] }),
        )
    } else if let Some(e) = rejection.find::<InvalidQuery>() {
        (StatusCode::BAD_REQUEST, json!({ "detail": e.to_string() }))
    } else if rejection.find::<PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            json!({ "detail": "Request body is too large." }),
        )
    } else if rejection.find::<LengthRequired>().is_some() {
        (
            StatusCode::LENGTH_REQUIRED,
            json!({ "detail": "Content-Length header is required." }),
        )
    } else if rejection.find::<UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            json!({ "detail": "Unsupported media type." }),
        )
    } else if rejection.find::<MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            json!({ "detail": "Method not allowed." }),
        )
    } else if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, HtmlError::NotFound.default().body())
    } else {
        log::error!("Unhandled rejection: {rejection:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            HtmlError::InternalServerError.default().body(),
        )
    };

    Ok(json_reply(&body, status))
}
