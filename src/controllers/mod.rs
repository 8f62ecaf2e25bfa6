//! Kubernetes controllers for Joke CRDs
//!
//! This module contains the controller implementation that watches for CRD
//! changes and triggers reconciliation.

mod joke_request_controller;

pub use joke_request_controller::run as run_joke_request_controller;

use std::sync::Arc;

use kube::Client;

use crate::adapters::{JokeApiClient, JokeService, JokeStore, KubeStore};
use crate::config::OperatorConfig;
use crate::error::Result;

/// Shared context for the controller
pub struct Context {
    /// Operator configuration
    pub config: OperatorConfig,
    /// Joke API
    pub joke_api: Arc<dyn JokeService>,
    /// Resource store used by the reconciler
    pub store: Arc<dyn JokeStore>,
}

impl Context {
    /// Create a context talking to the configured joke API
    pub fn new(client: Client, config: OperatorConfig) -> Result<Self> {
        let joke_api = JokeApiClient::new(config.joke_api_url.clone(), config.joke_api_timeout)?;
        Ok(Self::with_parts(
            config,
            Arc::new(joke_api),
            Arc::new(KubeStore::new(client)),
        ))
    }

    /// Create a context from explicit collaborators
    pub fn with_parts(
        config: OperatorConfig,
        joke_api: Arc<dyn JokeService>,
        store: Arc<dyn JokeStore>,
    ) -> Self {
        Self {
            config,
            joke_api,
            store,
        }
    }
}
