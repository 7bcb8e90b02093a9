use garde::Validate;
use serde::Deserialize;

use crate::{
    error::{AppError, Result},
    models::user::Role,
    services::identity::SignUpProfile,
};

/// The signup form as posted by the browser.
#[derive(Debug, Deserialize, Validate)]
pub struct SignupForm {
    #[garde(length(chars, min = 2, max = 50))]
    pub name: String,
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 8), custom(mixed_case_and_digit))]
    pub password: String,
    #[serde(rename = "confirm-password", alias = "confirm_password")]
    #[garde(skip)]
    pub confirm_password: String,
    #[serde(default)]
    #[garde(skip)]
    pub role: Role,
}

/// The login form as posted by the browser.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginForm {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 1))]
    pub password: String,
}

fn mixed_case_and_digit(value: &str, _ctx: &()) -> garde::Result {
    let lower = value.chars().any(|c| c.is_ascii_lowercase());
    let upper = value.chars().any(|c| c.is_ascii_uppercase());
    let digit = value.chars().any(|c| c.is_ascii_digit());
    if lower && upper && digit {
        Ok(())
    } else {
        Err(garde::Error::new(
            "password must contain lowercase, uppercase and a digit",
        ))
    }
}

/// Runs the derive rules, reporting the first failing field.
fn first_error<T: Validate<Context = ()>>(input: &T) -> Result<()> {
    input.validate().map_err(|report| {
        let message = report
            .iter()
            .next()
            .map(|(path, error)| format!("{}: {}", path, error.message()))
            .unwrap_or_else(|| "invalid input".to_string());
        AppError::Validation(message)
    })
}

/// Validates a signup form into the profile handed to the identity provider.
///
/// # Arguments
///
/// * `form` - The submitted form.
///
/// # Returns
///
/// A `Result` containing the normalized `SignUpProfile`, or a
/// `Validation` error naming the first failing field.
pub fn validate_signup(form: SignupForm) -> Result<SignUpProfile> {
    first_error(&form)?;

    if form.password != form.confirm_password {
        return Err(AppError::Validation(
            "confirm-password: passwords do not match".to_string(),
        ));
    }

    Ok(SignUpProfile {
        name: form.name.trim().to_string(),
        email: form.email.trim().to_lowercase(),
        password: form.password,
        role: form.role,
    })
}

/// Validates a login form, returning the normalized email and the password.
pub fn validate_login(form: LoginForm) -> Result<(String, String)> {
    first_error(&form)?;
    Ok((form.email.trim().to_lowercase(), form.password))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup() -> SignupForm {
        SignupForm {
            name: "Runner".into(),
            email: "Runner@Sweat.Station".into(),
            password: "Sweat1234".into(),
            confirm_password: "Sweat1234".into(),
            role: Role::General,
        }
    }

    fn message(result: Result<impl std::fmt::Debug>) -> String {
        match result {
            Err(AppError::Validation(msg)) => msg,
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn valid_signup_is_normalized() {
        let profile = validate_signup(signup()).unwrap();
        assert_eq!(profile.email, "runner@sweat.station");
        assert_eq!(profile.role, Role::General);
    }

    #[test]
    fn short_name_is_rejected() {
        let mut form = signup();
        form.name = "R".into();
        assert!(message(validate_signup(form)).starts_with("name"));
    }

    #[test]
    fn weak_password_is_rejected() {
        let mut form = signup();
        form.password = "sweat1234".into();
        form.confirm_password = "sweat1234".into();
        assert!(message(validate_signup(form)).contains("uppercase"));
    }

    #[test]
    fn mismatched_confirmation_is_rejected() {
        let mut form = signup();
        form.confirm_password = "Sweat12345".into();
        assert!(message(validate_signup(form)).starts_with("confirm-password"));
    }

    #[test]
    fn login_requires_email_and_password() {
        let bad_email = LoginForm {
            email: "not-an-email".into(),
            password: "x".into(),
        };
        assert!(message(validate_login(bad_email)).starts_with("email"));

        let no_password = LoginForm {
            email: "runner@sweat.station".into(),
            password: String::new(),
        };
        assert!(message(validate_login(no_password)).starts_with("password"));
    }
}
