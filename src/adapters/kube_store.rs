//! Resource store access for JokeRequest and Joke resources
//!
//! The reconciler only sees the `JokeStore` trait; `KubeStore` backs it with
//! the Kubernetes API.

use std::time::Duration;

use async_trait::async_trait;
use kube::{
    api::{DeleteParams, ListParams, Patch, PatchParams, PostParams},
    Api, Client, ResourceExt,
};
use kube_runtime::wait::{await_condition, conditions};
use serde_json::json;
use tracing::debug;

use crate::crd::{Joke, JokeRequest, JokeRequestStatus};
use crate::error::{Error, Result};

/// Field manager used for status patches
pub const FIELD_MANAGER: &str = "joke-operator";

/// Operations the reconciler needs from the resource store
#[async_trait]
pub trait JokeStore: Send + Sync {
    /// Get a JokeRequest by name, `None` if it does not exist
    async fn get_request(&self, namespace: &str, name: &str) -> Result<Option<JokeRequest>>;

    /// Get a Joke by name, `None` if it does not exist
    async fn get_joke(&self, namespace: &str, name: &str) -> Result<Option<Joke>>;

    /// List all Jokes in a namespace
    async fn list_jokes(&self, namespace: &str) -> Result<Vec<Joke>>;

    /// Create a Joke; fails if one with the same name exists
    async fn create_joke(&self, namespace: &str, joke: &Joke) -> Result<Joke>;

    /// Delete a Joke and wait up to `timeout` for it to disappear
    async fn delete_joke(&self, namespace: &str, name: &str, timeout: Duration) -> Result<()>;

    /// Replace the status subresource of a JokeRequest
    async fn patch_request_status(
        &self,
        namespace: &str,
        name: &str,
        status: &JokeRequestStatus,
    ) -> Result<()>;
}

/// `JokeStore` backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn jokes(&self, namespace: &str) -> Api<Joke> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl JokeStore for KubeStore {
    async fn get_request(&self, namespace: &str, name: &str) -> Result<Option<JokeRequest>> {
        let api: Api<JokeRequest> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn get_joke(&self, namespace: &str, name: &str) -> Result<Option<Joke>> {
        Ok(self.jokes(namespace).get_opt(name).await?)
    }

    async fn list_jokes(&self, namespace: &str) -> Result<Vec<Joke>> {
        let list = self.jokes(namespace).list(&ListParams::default()).await?;
        Ok(list.items)
    }

    async fn create_joke(&self, namespace: &str, joke: &Joke) -> Result<Joke> {
        Ok(self
            .jokes(namespace)
            .create(&PostParams::default(), joke)
            .await?)
    }

    async fn delete_joke(&self, namespace: &str, name: &str, timeout: Duration) -> Result<()> {
        let api = self.jokes(namespace);

        let deleted = match api.delete(name, &DeleteParams::default()).await {
            Ok(either) => either,
            Err(kube::Error::Api(e)) if e.code == 404 => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        // Already gone, nothing to wait for
        let Some(joke) = deleted.left() else {
            return Ok(());
        };
        let uid = joke.uid().unwrap_or_default();

        debug!(namespace = %namespace, name = %name, "Waiting for Joke deletion");
        tokio::time::timeout(timeout, await_condition(api, name, conditions::is_deleted(&uid)))
            .await
            .map_err(|_| {
                Error::Timeout(format!(
                    "Joke {}/{} not deleted within {}s",
                    namespace,
                    name,
                    timeout.as_secs()
                ))
            })??;

        Ok(())
    }

    async fn patch_request_status(
        &self,
        namespace: &str,
        name: &str,
        status: &JokeRequestStatus,
    ) -> Result<()> {
        let api: Api<JokeRequest> = Api::namespaced(self.client.clone(), namespace);
        let patch = json!({ "status": status });
        api.patch_status(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(patch))
            .await?;
        Ok(())
    }
}
