use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_cookies::Cookies;

use crate::services::{
    identity::{Credentials, IdentityProvider},
    route_gate::{RouteTable, RoutingDecision},
    session,
};

/// What the gate middleware needs: a provider to resolve sessions against
/// and the route classification data.
#[derive(Clone)]
pub struct GateState {
    pub identity: Arc<dyn IdentityProvider>,
    pub routes: Arc<RouteTable>,
}

impl GateState {
    pub fn new(identity: Arc<dyn IdentityProvider>, routes: RouteTable) -> Self {
        Self {
            identity,
            routes: Arc::new(routes),
        }
    }
}

/// Resolves the session, then allows the request or redirects it.
///
/// Runs before any handler. An allowed request carries the resolved
/// `Session` in its extensions when one exists.
pub async fn route_gate(
    State(state): State<GateState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let credentials = Credentials::from_request(&cookies, request.headers());
    let session = session::resolve(state.identity.as_ref(), &credentials).await;

    let path = request.uri().path().to_owned();
    match state.routes.decide(session.as_ref(), &path) {
        RoutingDecision::RedirectTo(target) => {
            tracing::debug!("🔀 Redirecting {} -> {}", path, target);
            Redirect::temporary(&target).into_response()
        }
        RoutingDecision::Allow => {
            if let Some(session) = session {
                tracing::debug!("✅ User authenticated: {}", session.subject_id);
                request.extensions_mut().insert(session);
            }
            next.run(request).await
        }
    }
}
