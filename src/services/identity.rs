//! The boundary to the identity provider.
//!
//! Everything that verifies who a visitor is goes through [`IdentityProvider`];
//! the rest of the application only ever sees a resolved [`Session`].

use async_trait::async_trait;
use http::{HeaderMap, header};
use serde::Deserialize;
use tower_cookies::Cookies;

use crate::{
    error::IdentityError,
    models::{
        session::{ProviderUser, Session},
        user::Role,
    },
};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "sweat_session";

/// Whatever the transport supplied that might identify the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub session_token: Option<String>,
    pub bearer_token: Option<String>,
}

impl Credentials {
    /// Collects the session cookie and any bearer token from a request.
    pub fn from_request(cookies: &Cookies, headers: &HeaderMap) -> Self {
        Self::from_parts(
            cookies.get(SESSION_COOKIE).map(|c| c.value().to_string()),
            headers,
        )
    }

    fn from_parts(cookie_value: Option<String>, headers: &HeaderMap) -> Self {
        let session_token = cookie_value.filter(|v| !v.is_empty());

        let bearer_token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Self {
            session_token,
            bearer_token,
        }
    }

    pub fn with_session_token(token: impl Into<String>) -> Self {
        Self {
            session_token: Some(token.into()),
            bearer_token: None,
        }
    }

    /// The preferred token. The cookie wins over the header.
    pub fn token(&self) -> Option<&str> {
        self.session_token
            .as_deref()
            .or(self.bearer_token.as_deref())
    }

    /// Every distinct token supplied, cookie first, so a stale cookie does not
    /// hide a valid bearer token.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        let cookie = self.session_token.as_deref();
        let bearer = self.bearer_token.as_deref().filter(|b| Some(*b) != cookie);
        cookie.into_iter().chain(bearer)
    }

    pub fn is_empty(&self) -> bool {
        self.token().is_none()
    }
}

/// The profile submitted at signup.
#[derive(Debug, Clone, Deserialize)]
pub struct SignUpProfile {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// The outcome of a successful sign-in or sign-up.
#[derive(Debug, Clone)]
pub struct SignedIn {
    /// Token the client presents on later requests.
    pub token: String,
    pub session: Session,
}

/// An identity/session provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The user the credentials belong to.
    async fn current_user(&self, credentials: &Credentials) -> Result<ProviderUser, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, IdentityError>;

    async fn sign_up(&self, profile: &SignUpProfile) -> Result<SignedIn, IdentityError>;

    /// Ends the session the credentials refer to. Ending an unknown session succeeds.
    async fn sign_out(&self, credentials: &Credentials) -> Result<(), IdentityError>;
}
