use std::sync::Arc;

use sprinkler_runtime::ZoneRuntime;
use sprinkler_store::ScheduleStore;

use crate::config::ServerConfig;
use crate::engine::dispatcher::ScheduleDispatcher;
use crate::middleware::auth::TokenVerifier;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub auth: Arc<TokenVerifier>,
    /// Zone jobs, pin driver and rain lock.
    pub runtime: Arc<ZoneRuntime>,
    pub store: Arc<ScheduleStore>,
    /// Consulted for in-flight schedule runs.
    pub dispatcher: Arc<ScheduleDispatcher>,
}

impl AppState {
    pub fn new(
        config: Arc<ServerConfig>,
        runtime: Arc<ZoneRuntime>,
        store: Arc<ScheduleStore>,
        dispatcher: Arc<ScheduleDispatcher>,
    ) -> Self {
        let auth = Arc::new(TokenVerifier::new(&config.api_token));
        Self {
            config,
            auth,
            runtime,
            store,
            dispatcher,
        }
    }
}
