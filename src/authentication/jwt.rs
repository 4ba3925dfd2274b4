use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::schema::User;
use crate::error::{Error, HtmlError};
use crate::schema::{Id, UserRole};

use super::permissions::ActionType;

/// HMAC key shared by token signing and verification.
#[derive(Clone)]
pub struct SessionKey {
    key: Hmac<Sha256>,
    lifetime: Duration,
}

impl SessionKey {
    pub fn new(secret: &[u8], lifetime_hours: i64) -> Self {
        Self {
            key: Hmac::new_from_slice(secret).expect("HMAC accepts keys of any length"),
            lifetime: Duration::hours(lifetime_hours),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, username: String, role: UserRole, lifetime: Duration) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + lifetime).timestamp();

        Self {
            user_id: id,
            username,
            role,
            iat,
            exp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), Error> {
        if !action.authenticate(self) {
            return Err(
                HtmlError::Forbidden.new("You do not have permission to perform this action.")
            );
        }
        Ok(())
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            username: value.username,
            user_id: value.user_id,
            is_admin: value.role == UserRole::Admin,
            role: value.role,
        }
    }
}

/// Signs a session token for `user`. Issuing tokens to clients is the job of
/// the authentication service; this crate only needs to agree on the format.
pub fn sign_session(user: &User, key: &SessionKey) -> Result<String, Error> {
    let claims = JwtSessionData::new(user.id, user.username.to_owned(), user.role, key.lifetime);

    claims.sign_with_key(&key.key).map_err(|e| {
        log::error!("Failed to sign session: {e}");
        HtmlError::InternalServerError.default()
    })
}

pub fn verify_jwt_session(token: &str, key: &SessionKey) -> Result<JwtSessionData, Error> {
    let session: JwtSessionData = token
        .verify_with_key(&key.key)
        .map_err(|_| HtmlError::Unauthorized.new("Invalid token."))?;

    let now = Local::now().timestamp();
    if (session.exp - now).is_negative() {
        return Err(HtmlError::Unauthorized.new("Token expired."));
    }

    Ok(session)
}
