//! Route classification and the allow/redirect decision.
//!
//! Classification is a single ordered match: Protected prefixes first, then
//! AuthOnly exact paths, then Public. A path listed in both sets is therefore
//! always Protected.

use crate::models::session::Session;

/// How a path is gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Requires a session.
    Protected,
    /// Only for visitors without a session (login, signup).
    AuthOnly,
    /// Open to everyone.
    Public,
}

/// What the transport layer should do with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingDecision {
    Allow,
    RedirectTo(String),
}

/// The static path sets the gate classifies against.
#[derive(Debug, Clone)]
pub struct RouteTable {
    protected: Vec<String>,
    auth_only: Vec<String>,
    login_path: String,
    landing_path: String,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(["/admin"], ["/login", "/signup"], "/login", "/admin")
    }
}

/// Drops a trailing slash so `/login/` and `/login` classify alike.
fn normalize(path: &str) -> &str {
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}

/// `path` equals `prefix` or lies below it (`/admin`, `/admin/settings`,
/// but not `/administrator`).
fn under(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

impl RouteTable {
    pub fn new<P, A>(
        protected: P,
        auth_only: A,
        login_path: impl Into<String>,
        landing_path: impl Into<String>,
    ) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        A: IntoIterator,
        A::Item: Into<String>,
    {
        Self {
            protected: protected.into_iter().map(Into::into).collect(),
            auth_only: auth_only.into_iter().map(Into::into).collect(),
            login_path: login_path.into(),
            landing_path: landing_path.into(),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn landing_path(&self) -> &str {
        &self.landing_path
    }

    /// Classifies a request path. Total: anything unmatched or malformed is Public.
    pub fn classify(&self, path: &str) -> RouteClass {
        if !path.starts_with('/') {
            return RouteClass::Public;
        }
        let path = normalize(path);

        if self.protected.iter().any(|p| under(path, normalize(p))) {
            RouteClass::Protected
        } else if self.auth_only.iter().any(|p| path == normalize(p)) {
            RouteClass::AuthOnly
        } else {
            RouteClass::Public
        }
    }

    /// Decides whether a request for `path` may proceed.
    pub fn decide(&self, session: Option<&Session>, path: &str) -> RoutingDecision {
        match (session.is_some(), self.classify(path)) {
            (true, RouteClass::AuthOnly) => RoutingDecision::RedirectTo(self.landing_path.clone()),
            (false, RouteClass::Protected) => RoutingDecision::RedirectTo(self.login_path.clone()),
            _ => RoutingDecision::Allow,
        }
    }
}
