use crate::{
    models::session::Session,
    services::identity::{Credentials, IdentityProvider},
};

/// Resolves the session for a request's credentials.
///
/// Never fails: a provider error, an expired or unknown token, or an
/// incomplete identity payload all yield `None`, and the request continues
/// as anonymous.
///
/// # Arguments
///
/// * `provider` - The identity provider to ask.
/// * `credentials` - The tokens the request carried.
///
/// # Returns
///
/// The resolved `Session`, or `None` for an anonymous request.
pub async fn resolve(provider: &dyn IdentityProvider, credentials: &Credentials) -> Option<Session> {
    if credentials.is_empty() {
        tracing::debug!("No credentials, request is anonymous");
        return None;
    }

    match provider.current_user(credentials).await {
        Ok(user) => {
            let session = Session::from_provider(user);
            if session.is_none() {
                tracing::warn!("❌ Identity payload incomplete, treating request as anonymous");
            }
            session
        }
        Err(e) => {
            tracing::warn!("❌ Session resolution failed: {}", e);
            None
        }
    }
}
