use std::fmt::{self, Display};

use serde_json::{json, Value};
use warp::http::StatusCode;

use super::form::FieldErrors;

/// Error categories surfaced by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlError {
    InvalidRequest,
    Validation,
    Conflict,
    NotFound,
    Unauthorized,
    Forbidden,
    InternalServerError,
}

impl HtmlError {
    pub fn new(self, info: &str) -> Error {
        Error {
            kind: self,
            info: Some(info.to_string()),
            fields: None,
        }
    }

    pub fn default(self) -> Error {
        Error {
            kind: self,
            info: None,
            fields: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            HtmlError::InvalidRequest | HtmlError::Validation | HtmlError::Conflict => {
                StatusCode::BAD_REQUEST
            }
            HtmlError::NotFound => StatusCode::NOT_FOUND,
            HtmlError::Unauthorized => StatusCode::UNAUTHORIZED,
            HtmlError::Forbidden => StatusCode::FORBIDDEN,
            HtmlError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn default_info(&self) -> &'static str {
        match self {
            HtmlError::InvalidRequest => "Invalid request.",
            HtmlError::Validation => "Invalid input.",
            HtmlError::Conflict => "Object already exists.",
            HtmlError::NotFound => "Not found.",
            HtmlError::Unauthorized => "Authentication credentials were not provided.",
            HtmlError::Forbidden => "You do not have permission to perform this action.",
            HtmlError::InternalServerError => "Internal server error.",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Error {
    pub kind: HtmlError,
    pub info: Option<String>,
    pub fields: Option<FieldErrors>,
}

impl Error {
    pub fn validation(fields: FieldErrors) -> Self {
        Self {
            kind: HtmlError::Validation,
            info: None,
            fields: Some(fields),
        }
    }

    /// Single-field validation failure.
    pub fn field(field: &str, message: &str) -> Self {
        let mut fields = FieldErrors::new();
        fields.add(field, message);
        Self::validation(fields)
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    pub fn info(&self) -> &str {
        self.info
            .as_deref()
            .unwrap_or_else(|| self.kind.default_info())
    }

    pub fn body(&self) -> Value {
        match (&self.kind, &self.fields) {
            (HtmlError::Validation, Some(fields)) => json!(fields),
            (HtmlError::Validation | HtmlError::Conflict, None) => {
                json!({ "non_field_errors": [self.info()] })
            }
            _ => json!({ "detail": self.info() }),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self.kind, self.info())
    }
}

impl std::error::Error for Error {}

impl warp::reject::Reject for Error {}

pub struct QueryError {
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Configuration(e) => Self::new(format!("{e}")),
            sqlx::Error::Database(e) => Self::new(format!("{e}")),
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(format!("{e}")),
            sqlx::Error::RowNotFound => Self::new(format!("RowNotFound")),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::new(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnNotFound(e) => Self::new(format!("{e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::new(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::new(format!("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(format!("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(format!("Worker crashed")),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            _ => Self::new(format!("Unknown error")),
        }
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        log::error!("Query failed: {}", value.info);
        HtmlError::InternalServerError.default()
    }
}

impl From<sqlx::Error> for Error {
    fn from(value: sqlx::Error) -> Self {
        QueryError::from(value).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_expected_statuses() {
        assert_eq!(HtmlError::Conflict.status(), StatusCode::BAD_REQUEST);
        assert_eq!(HtmlError::Validation.status(), StatusCode::BAD_REQUEST);
        assert_eq!(HtmlError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(HtmlError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(HtmlError::Forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn validation_body_is_keyed_by_field() {
        let error = Error::field("ingredients", "Ingredients must be unique.");
        assert_eq!(
            error.body(),
            json!({ "ingredients": ["Ingredients must be unique."] })
        );
    }

    #[test]
    fn conflict_body_uses_non_field_errors() {
        let error = HtmlError::Conflict.new("Recipe is already in favorites.");
        assert_eq!(
            error.body(),
            json!({ "non_field_errors": ["Recipe is already in favorites."] })
        );
    }

    #[test]
    fn default_detail_is_used_without_info() {
        let error = HtmlError::NotFound.default();
        assert_eq!(error.body(), json!({ "detail": "Not found." }));
    }

    #[test]
    fn database_failures_hide_internals() {
        let error: Error = sqlx::Error::PoolTimedOut.into();
        assert_eq!(error.kind, HtmlError::InternalServerError);
        assert_eq!(error.body(), json!({ "detail": "Internal server error." }));
    }

    #[test]
    fn errors_propagate_into_rejections() {
        fn lookup() -> Result<(), warp::Rejection> {
            Err(HtmlError::NotFound.new("No recipe exists with specified id."))?;
            Ok(())
        }

        let rejection = lookup().unwrap_err();
        let error = rejection.find::<Error>().unwrap();
        assert_eq!(error.kind, HtmlError::NotFound);
        assert_eq!(error.info(), "No recipe exists with specified id.");
    }
}
