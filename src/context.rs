//! Application context providing the dependency injection root.

use std::sync::Arc;

use crate::api::{AppApi, HttpGraphApi};
use crate::config::Config;
use crate::context_fields;
use crate::di::FromRef;
use crate::error::AppError;
use crate::services::EventBus;

/// Root application context.
///
/// Holds every shared dependency; services resolve their fields from it
/// through `FromRef<Context>`.
#[derive(Clone)]
pub struct Context {
    /// Backend REST API.
    pub api: AppApi,
    /// Application configuration.
    pub config: Arc<Config>,
    /// State-change notifications.
    pub events: EventBus,
}

impl Context {
    /// Creates a context over an existing API implementation.
    pub fn new(api: AppApi, config: Config) -> Self {
        Self {
            api,
            config: Arc::new(config),
            events: EventBus::default(),
        }
    }

    /// Creates a context talking HTTP to the configured backend.
    pub fn from_config(config: Config) -> Result<Self, AppError> {
        let api = HttpGraphApi::from_config(&config.api)?;
        tracing::debug!(base_url = %api.base_url(), "Created HTTP graph API client");
        Ok(Self::new(Arc::new(api), config))
    }

    /// Resolve a dependency from the context.
    pub fn resolve<T: FromRef<Context>>(&self) -> T {
        T::from_ref(self)
    }
}

context_fields!(Context {
    api: AppApi,
    config: Arc<Config>,
    events: EventBus,
});
