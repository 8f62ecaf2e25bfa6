//! Operator configuration
//!
//! All settings come from environment variables so the operator can be
//! configured from its Deployment manifest.

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

/// Default joke API endpoint
pub const DEFAULT_JOKE_API_URL: &str = "https://v2.jokeapi.dev";

/// Default interval between reconciles of the same JokeRequest
pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(10);

/// Default timeout for a single joke API request
pub const DEFAULT_JOKE_API_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bounded wait for a single Joke deletion
pub const DEFAULT_DELETE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default metrics port
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Which namespaces the controller watches
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WatchScope {
    /// The namespace the client is configured for (in-cluster: the pod's namespace)
    CurrentNamespace,
    /// A single named namespace
    Namespace(String),
    /// Every namespace in the cluster
    AllNamespaces,
}

/// Runtime configuration for the operator
#[derive(Clone, Debug)]
pub struct OperatorConfig {
    /// Base URL of the joke API
    pub joke_api_url: Url,
    /// Timeout for one joke API request
    pub joke_api_timeout: Duration,
    /// Fixed requeue delay after every reconcile
    pub reconcile_interval: Duration,
    /// Bounded wait for each Joke deletion during garbage collection
    pub delete_timeout: Duration,
    /// Port for the metrics and health server
    pub metrics_port: u16,
    /// Watch scope for JokeRequest resources
    pub watch_scope: WatchScope,
}

impl OperatorConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration using an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self {
            joke_api_url: Url::parse(DEFAULT_JOKE_API_URL)?,
            joke_api_timeout: DEFAULT_JOKE_API_TIMEOUT,
            reconcile_interval: DEFAULT_RECONCILE_INTERVAL,
            delete_timeout: DEFAULT_DELETE_TIMEOUT,
            metrics_port: DEFAULT_METRICS_PORT,
            watch_scope: WatchScope::CurrentNamespace,
        };

        if let Some(raw) = lookup("JOKE_API_URL") {
            config.joke_api_url = Url::parse(raw.trim())
                .map_err(|e| Error::config(format!("Invalid JOKE_API_URL '{}': {}", raw, e)))?;
        }
        if let Some(raw) = lookup("JOKE_API_TIMEOUT_SECS") {
            config.joke_api_timeout = parse_secs("JOKE_API_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("RECONCILE_INTERVAL_SECS") {
            config.reconcile_interval = parse_secs("RECONCILE_INTERVAL_SECS", &raw)?;
        }
        if let Some(raw) = lookup("DELETE_TIMEOUT_SECS") {
            config.delete_timeout = parse_secs("DELETE_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("METRICS_PORT") {
            config.metrics_port = raw
                .trim()
                .parse()
                .map_err(|e| Error::config(format!("Invalid METRICS_PORT '{}': {}", raw, e)))?;
        }
        if let Some(raw) = lookup("WATCH_NAMESPACE") {
            config.watch_scope = match raw.trim() {
                "" => WatchScope::CurrentNamespace,
                "*" => WatchScope::AllNamespaces,
                ns => WatchScope::Namespace(ns.to_string()),
            };
        }

        Ok(config)
    }
}

/// Parse a positive number of seconds
fn parse_secs(key: &str, raw: &str) -> Result<Duration> {
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|e| Error::config(format!("Invalid {} '{}': {}", key, raw, e)))?;
    if secs == 0 {
        return Err(Error::config(format!("{} must be greater than zero", key)));
    }
    Ok(Duration::from_secs(secs))
}
