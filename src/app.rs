use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower_cookies::CookieManagerLayer;
use tower_http::{
    compression::CompressionLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{
    handlers,
    middleware_layer::gate::route_gate,
    state::AppState,
};

/// Builds the full application router.
///
/// Every request, static assets included, passes the route gate before
/// reaching a handler.
pub fn build_router(state: AppState) -> Router {
    let pages = Router::new()
        .route("/", get(handlers::pages::home))
        .route(
            "/login",
            get(handlers::auth::login_page).post(handlers::auth::login),
        )
        .route(
            "/signup",
            get(handlers::auth::signup_page).post(handlers::auth::signup),
        )
        .route("/logout", post(handlers::auth::logout))
        .route("/admin", get(handlers::pages::admin))
        .route("/auth/auth-code-error", get(handlers::pages::auth_code_error));

    let admin_api = Router::new()
        .route("/admin/api/users", get(handlers::admin::list_users))
        .route("/admin/api/admins", get(handlers::admin::list_admins))
        .route(
            "/admin/api/users/{id}",
            get(handlers::admin::get_user)
                .patch(handlers::admin::update_user)
                .delete(handlers::admin::delete_user),
        )
        .route(
            "/admin/api/posts",
            get(handlers::admin::list_posts).post(handlers::admin::create_post),
        )
        .route(
            "/admin/api/posts/{id}",
            get(handlers::admin::get_post)
                .patch(handlers::admin::update_post)
                .delete(handlers::admin::delete_post),
        );

    Router::new()
        .merge(pages)
        .merge(admin_api)
        .fallback_service(ServeDir::new(&state.config.public_dir))
        .layer(from_fn_with_state(state.gate(), route_gate))
        .layer(CookieManagerLayer::new())
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .with_state(state)
}
