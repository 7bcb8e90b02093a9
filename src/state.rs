use deadpool_postgres::Pool;
use redis::aio::ConnectionManager;
use std::sync::Arc;

use crate::{
    config::Config,
    error::{IdentityError, Result},
    middleware_layer::gate::GateState,
    services::{auth::LocalIdentityProvider, identity::IdentityProvider, route_gate::RouteTable},
};

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool.
    pub db: Pool,
    /// The identity provider behind login, signup and session resolution.
    pub identity: Arc<dyn IdentityProvider>,
    /// Route classification shared with the gate.
    pub routes: Arc<RouteTable>,
    /// The application's configuration.
    pub config: Config,
}

impl AppState {
    /// Creates a new `AppState`, connecting to PostgreSQL and Redis.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the new `AppState`.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = crate::db::create_pool(&config.database_url, config.database_max_connections)?;
        tracing::info!("✅ PostgreSQL pool initialized with deadpool-postgres");

        let redis_client = redis::Client::open(config.redis_url.as_str())
            .map_err(IdentityError::from)?;
        let redis = ConnectionManager::new(redis_client)
            .await
            .map_err(IdentityError::from)?;
        tracing::info!("✅ Redis Connection Manager initialized (session store)");

        let identity = LocalIdentityProvider::new(db.clone(), redis, config.session_ttl_secs());

        Ok(Self::with_identity(db, Arc::new(identity), config.clone()))
    }

    /// Assembles state around an already-built identity provider.
    pub fn with_identity(db: Pool, identity: Arc<dyn IdentityProvider>, config: Config) -> Self {
        AppState {
            db,
            identity,
            routes: Arc::new(RouteTable::default()),
            config,
        }
    }

    /// The state the route gate middleware runs with.
    pub fn gate(&self) -> GateState {
        GateState {
            identity: self.identity.clone(),
            routes: self.routes.clone(),
        }
    }
}
