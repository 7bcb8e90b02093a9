use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated identity of the current request.
///
/// Built fresh from the identity provider on every request and never stored
/// or mutated. A value of this type is always fully resolved; a payload
/// missing any required field produces no `Session` at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Opaque identifier of the authenticated subject.
    pub subject_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub last_authenticated_at: DateTime<Utc>,
    /// Provider-supplied role metadata. Not used for routing decisions.
    pub role_hint: Option<String>,
}

/// Free-form metadata the provider keeps next to a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// A user record as reported by the identity provider.
///
/// Every field is optional on the wire; `Session::from_provider` decides
/// whether the record is complete enough to authenticate a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderUser {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub metadata: UserMetadata,
    #[serde(default)]
    pub last_sign_in_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Session {
    /// Maps a provider record to a session, or `None` if it is incomplete.
    pub fn from_provider(user: ProviderUser) -> Option<Self> {
        Some(Self {
            subject_id: non_blank(user.id)?,
            email: non_blank(user.email)?,
            last_authenticated_at: user.last_sign_in_at?,
            display_name: non_blank(user.metadata.name),
            role_hint: non_blank(user.metadata.role),
        })
    }

    /// The name shown in the page header.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}
