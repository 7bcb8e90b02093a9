//! Page templates. Rendering is plain askama; every value is HTML-escaped.

use askama::Template;

use crate::models::session::Session;

/// What the shared page header shows.
pub struct Header {
    pub signed_in: bool,
    pub label: String,
}

impl Header {
    pub fn for_session(session: Option<&Session>) -> Self {
        match session {
            Some(s) => Self {
                signed_in: true,
                label: s.label().to_string(),
            },
            None => Self {
                signed_in: false,
                label: String::new(),
            },
        }
    }
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomePage {
    pub header: Header,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    pub header: Header,
    pub email: String,
    pub error: String,
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupPage {
    pub header: Header,
    pub name: String,
    pub email: String,
    pub error: String,
}

#[derive(Template)]
#[template(path = "admin.html")]
pub struct AdminPage {
    pub header: Header,
    pub email: String,
    pub subject_id: String,
    pub role: String,
    pub last_sign_in: String,
    pub message: String,
}

#[derive(Template)]
#[template(path = "auth_code_error.html")]
pub struct AuthCodeErrorPage {
    pub header: Header,
}
