use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use deadpool_postgres::Pool;
use rand::{RngCore, rngs::OsRng};
use redis::{AsyncCommands, aio::ConnectionManager};
use zeroize::Zeroize;

use crate::{
    crypto::token::generate_session_token,
    db::column,
    error::{IdentityError, StoreError},
    models::{
        session::{ProviderUser, Session, UserMetadata},
        user::User,
    },
    repositories::user::row_to_user,
    services::identity::{Credentials, IdentityProvider, SignUpProfile, SignedIn},
};

/// The memory cost for Argon2 in MB.
const ARGON2_MEMORY_MB: u32 = 19;
/// The number of iterations for Argon2.
const ARGON2_ITERATIONS: u32 = 2;
/// The parallelism factor for Argon2.
const ARGON2_PARALLELISM: u32 = 1;

/// Hashes a password using Argon2id.
///
/// # Arguments
///
/// * `password` - The password to hash.
///
/// # Returns
///
/// A `Result` containing the PHC-encoded hash.
pub(crate) fn hash_password(password: &str) -> Result<String, IdentityError> {
    let mut password_bytes = password.as_bytes().to_vec();

    let mut salt_bytes = [0u8; 16];
    OsRng.fill_bytes(&mut salt_bytes);

    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| IdentityError::Hashing(format!("Salt encoding error: {}", e)))?;

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        ParamsBuilder::new()
            .m_cost(ARGON2_MEMORY_MB * 1024)
            .t_cost(ARGON2_ITERATIONS)
            .p_cost(ARGON2_PARALLELISM)
            .build()
            .map_err(|e| IdentityError::Hashing(format!("Argon2 params: {}", e)))?,
    );

    let result = argon2
        .hash_password(&password_bytes, &salt)
        .map(|h| h.to_string())
        .map_err(|e| IdentityError::Hashing(format!("Argon2 hash error: {}", e)));

    password_bytes.zeroize();
    result
}

/// Verifies a password against a stored PHC hash.
///
/// # Arguments
///
/// * `password` - The password to verify.
/// * `hash` - The hash to verify against.
///
/// # Returns
///
/// A `Result` containing `true` if the password matches, `false` otherwise.
pub(crate) fn verify_password(password: &str, hash: &str) -> Result<bool, IdentityError> {
    let mut password_bytes = password.as_bytes().to_vec();
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| IdentityError::Hashing(format!("Hash parse error: {}", e)))?;
    let valid = Argon2::default()
        .verify_password(&password_bytes, &parsed_hash)
        .is_ok();

    password_bytes.zeroize();
    Ok(valid)
}

fn session_key(token: &str) -> String {
    format!("session:{}", token)
}

/// Identity provider backed by the application's own database and Redis.
///
/// Accounts live in `users` + `user_credentials`; sessions are opaque tokens
/// whose provider record is kept in Redis until it expires.
#[derive(Clone)]
pub struct LocalIdentityProvider {
    db: Pool,
    redis: ConnectionManager,
    session_ttl_secs: u64,
}

impl LocalIdentityProvider {
    pub fn new(db: Pool, redis: ConnectionManager, session_ttl_secs: u64) -> Self {
        Self {
            db,
            redis,
            session_ttl_secs,
        }
    }

    async fn issue_session(
        &self,
        user: &User,
        signed_in_at: DateTime<Utc>,
    ) -> Result<SignedIn, IdentityError> {
        let record = ProviderUser {
            id: Some(user.id.to_string()),
            email: Some(user.email.clone()),
            metadata: UserMetadata {
                name: Some(user.name.clone()),
                role: Some(user.role.as_str().to_string()),
            },
            last_sign_in_at: Some(signed_in_at),
            expires_at: Some(Utc::now() + Duration::seconds(self.session_ttl_secs as i64)),
        };

        let record_json = sonic_rs::to_string(&record)
            .map_err(|e| IdentityError::Malformed(format!("Session serialization failed: {}", e)))?;

        let token = generate_session_token();
        let _: () = self
            .redis
            .clone()
            .set_ex(session_key(&token), &record_json, self.session_ttl_secs)
            .await
            .map_err(|e| {
                tracing::error!("❌ Redis set_ex failed: {}", e);
                IdentityError::Cache(e)
            })?;

        let session = Session::from_provider(record)
            .ok_or_else(|| IdentityError::Malformed("issued session is incomplete".to_string()))?;

        tracing::info!("✅ Session issued for user: {}", session.subject_id);
        Ok(SignedIn { token, session })
    }

    /// Loads the record stored for `token`, dropping it once expired.
    async fn load_session(&self, token: &str) -> Result<ProviderUser, IdentityError> {
        let mut redis = self.redis.clone();

        let record_json: String = redis
            .get::<_, Option<String>>(session_key(token))
            .await?
            .ok_or(IdentityError::SessionNotFound)?;

        let record: ProviderUser = sonic_rs::from_str(&record_json)
            .map_err(|e| IdentityError::Malformed(format!("Invalid session JSON: {}", e)))?;

        if record.expires_at.is_some_and(|expires_at| Utc::now() > expires_at) {
            let _: () = redis.del(session_key(token)).await.unwrap_or(());
            return Err(IdentityError::SessionNotFound);
        }

        Ok(record)
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn current_user(&self, credentials: &Credentials) -> Result<ProviderUser, IdentityError> {
        let mut outcome = Err(IdentityError::MissingCredentials);
        for token in credentials.tokens() {
            outcome = self.load_session(token).await;
            if !matches!(outcome, Err(IdentityError::SessionNotFound)) {
                break;
            }
        }
        outcome
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, IdentityError> {
        tracing::debug!("🔐 Authenticating: {}", email);
        let client = self.db.get().await?;

        let lookup = client
            .prepare_cached(
                r#"
                SELECT u.id, u.email, u.name, u.role, u.created_at, u.updated_at, c.password_hash
                FROM users u
                JOIN user_credentials c ON c.user_id = u.id
                WHERE u.email = $1
                "#,
            )
            .await?;
        let row = client
            .query_opt(&lookup, &[&email])
            .await?
            .ok_or(IdentityError::InvalidCredentials)?;

        let password_hash: String = column(&row, "password_hash")?;
        if !verify_password(password, &password_hash)? {
            return Err(IdentityError::InvalidCredentials);
        }
        let user = row_to_user(&row)?;

        let stamp = client
            .prepare_cached(
                r#"
                UPDATE user_credentials
                SET last_sign_in_at = NOW()
                WHERE user_id = $1
                RETURNING last_sign_in_at
                "#,
            )
            .await?;
        let signed_in_at: DateTime<Utc> =
            column(&client.query_one(&stamp, &[&user.id]).await?, "last_sign_in_at")?;

        tracing::info!("✅ User authenticated: {}", user.id);
        self.issue_session(&user, signed_in_at).await
    }

    async fn sign_up(&self, profile: &SignUpProfile) -> Result<SignedIn, IdentityError> {
        tracing::debug!("🔐 Creating account: {}", profile.email);
        let password_hash = hash_password(&profile.password)?;

        let mut client = self.db.get().await?;
        let tx = client.transaction().await?;

        let insert_user = tx
            .prepare_cached(
                r#"
                INSERT INTO users (email, name, role)
                VALUES ($1, $2, $3)
                RETURNING id, email, name, role, created_at, updated_at
                "#,
            )
            .await?;
        let row = tx
            .query_one(&insert_user, &[&profile.email, &profile.name, &profile.role])
            .await
            .map_err(|e| match StoreError::from(e) {
                StoreError::UniqueConstraintViolation => IdentityError::EmailTaken,
                other => IdentityError::Store(other),
            })?;
        let user = row_to_user(&row)?;

        let insert_credentials = tx
            .prepare_cached(
                r#"
                INSERT INTO user_credentials (user_id, password_hash, last_sign_in_at)
                VALUES ($1, $2, NOW())
                RETURNING last_sign_in_at
                "#,
            )
            .await?;
        let signed_in_at: DateTime<Utc> = column(
            &tx.query_one(&insert_credentials, &[&user.id, &password_hash]).await?,
            "last_sign_in_at",
        )?;

        tx.commit().await?;
        tracing::info!("✅ Account created with ID: {}", user.id);

        self.issue_session(&user, signed_in_at).await
    }

    async fn sign_out(&self, credentials: &Credentials) -> Result<(), IdentityError> {
        let mut redis = self.redis.clone();
        for token in credentials.tokens() {
            let _: () = redis.del(session_key(token)).await?;
            tracing::info!("✅ Session deleted from Redis");
        }
        Ok(())
    }
}
