use axum::{
    Extension, Form,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use askama::Template;
use tower_cookies::{Cookie, Cookies};
use tower_cookies::cookie::{SameSite, time::Duration};

use crate::{
    config::Config,
    error::{AppError, Result},
    models::session::Session,
    services::identity::{Credentials, SESSION_COOKIE},
    state::AppState,
    validation::auth::{LoginForm, SignupForm, validate_login, validate_signup},
    views::{Header, LoginPage, SignupPage},
};

/// Query string appended to the landing path after a signup.
const SIGNUP_LANDING_MESSAGE: &str = "message=Signup+complete.+Welcome+to+Sweat+Station%21";

/// Creates the session cookie carrying `token`.
fn session_cookie(token: String, config: &Config) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token);

    cookie.set_http_only(true);
    if config.secure_cookies {
        cookie.set_secure(true);
    }
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(Duration::days(config.session_duration_days));
    cookie.set_path("/");

    cookie
}

fn clear_session_cookie(cookies: &Cookies) {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookies.remove(cookie);
}

/// Renders a form page again with the status of the error that sent the user back.
fn form_failure(status: StatusCode, page: impl Template) -> Result<Response> {
    Ok((status, Html(page.render()?)).into_response())
}

/// Shows the login form.
pub async fn login_page(session: Option<Extension<Session>>) -> Result<Html<String>> {
    let page = LoginPage {
        header: Header::for_session(session.as_deref()),
        email: String::new(),
        error: String::new(),
    };
    Ok(Html(page.render()?))
}

/// Handles the login form.
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let email = form.email.clone();
    tracing::info!("🔐 Login attempt for: {}", email);

    let outcome = async {
        let (email, password) = validate_login(form)?;
        Ok::<_, AppError>(state.identity.sign_in(&email, &password).await?)
    }
    .await;

    match outcome {
        Ok(signed_in) => {
            cookies.add(session_cookie(signed_in.token, &state.config));
            tracing::info!("✅ User logged in: {}", signed_in.session.subject_id);
            Ok(Redirect::to(state.routes.landing_path()).into_response())
        }
        Err(err) => {
            let (status, message) = err.status_and_message();
            let page = LoginPage {
                header: Header::for_session(None),
                email,
                error: message,
            };
            form_failure(status, page)
        }
    }
}

/// Shows the signup form.
pub async fn signup_page(session: Option<Extension<Session>>) -> Result<Html<String>> {
    let page = SignupPage {
        header: Header::for_session(session.as_deref()),
        name: String::new(),
        email: String::new(),
        error: String::new(),
    };
    Ok(Html(page.render()?))
}

/// Handles the signup form.
pub async fn signup(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<SignupForm>,
) -> Result<Response> {
    let (name, email) = (form.name.clone(), form.email.clone());
    tracing::info!("📝 Signup attempt for: {}", email);

    let outcome = async {
        let profile = validate_signup(form)?;
        Ok::<_, AppError>(state.identity.sign_up(&profile).await?)
    }
    .await;

    match outcome {
        Ok(signed_in) => {
            cookies.add(session_cookie(signed_in.token, &state.config));
            tracing::info!("✅ User registered: {}", signed_in.session.subject_id);
            let target = format!("{}?{}", state.routes.landing_path(), SIGNUP_LANDING_MESSAGE);
            Ok(Redirect::to(&target).into_response())
        }
        Err(err) => {
            let (status, message) = err.status_and_message();
            let page = SignupPage {
                header: Header::for_session(None),
                name,
                email,
                error: message,
            };
            form_failure(status, page)
        }
    }
}

/// Ends the current session and returns to the login page.
pub async fn logout(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
) -> Result<Response> {
    let credentials = Credentials::from_request(&cookies, &headers);
    state.identity.sign_out(&credentials).await?;

    clear_session_cookie(&cookies);
    tracing::info!("👋 User logged out");

    Ok(Redirect::to(state.routes.login_path()).into_response())
}
