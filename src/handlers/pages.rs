use axum::{
    Extension,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use askama::Template;
use serde::Deserialize;

use crate::{
    error::Result,
    models::session::Session,
    repositories::user as user_repo,
    state::AppState,
    views::{AdminPage, AuthCodeErrorPage, Header, HomePage},
};

#[derive(Debug, Deserialize)]
pub struct AdminQuery {
    pub message: Option<String>,
}

/// The landing page.
pub async fn home(session: Option<Extension<Session>>) -> Result<Html<String>> {
    let page = HomePage {
        header: Header::for_session(session.as_deref()),
    };
    Ok(Html(page.render()?))
}

/// The admin page.
///
/// The gate already keeps anonymous visitors out; the handler checks again
/// so it never renders without a session.
pub async fn admin(
    State(state): State<AppState>,
    session: Option<Extension<Session>>,
    Query(query): Query<AdminQuery>,
) -> Result<Response> {
    let Some(Extension(session)) = session else {
        tracing::warn!("No session on admin page, redirecting to login");
        let target = format!("{}?redirectTo=/admin", state.routes.login_path());
        return Ok(Redirect::to(&target).into_response());
    };

    // Displayed only; access to /admin does not depend on the role.
    let role = match session.subject_id.parse::<i32>() {
        Ok(id) => {
            if user_repo::is_admin(&state.db, id).await? {
                "admin"
            } else {
                "general"
            }
        }
        Err(_) => session.role_hint.as_deref().unwrap_or("unknown"),
    };

    let page = AdminPage {
        header: Header::for_session(Some(&session)),
        email: session.email.clone(),
        subject_id: session.subject_id.clone(),
        role: role.to_string(),
        last_sign_in: session
            .last_authenticated_at
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string(),
        message: query.message.unwrap_or_default(),
    };
    Ok(Html(page.render()?).into_response())
}

/// Shown when a provider callback could not be completed.
pub async fn auth_code_error(session: Option<Extension<Session>>) -> Result<Html<String>> {
    let page = AuthCodeErrorPage {
        header: Header::for_session(session.as_deref()),
    };
    Ok(Html(page.render()?))
}
