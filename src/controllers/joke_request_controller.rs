//! JokeRequest controller
//!
//! Watches JokeRequest resources, and the Jokes they own, and triggers
//! reconciliation. Every reconcile is requeued after the fixed interval.

use std::sync::Arc;

use futures::StreamExt;
use kube::{
    api::ListParams,
    core::NamespaceResourceScope,
    runtime::{
        controller::{Action, Controller},
        watcher::Config as WatcherConfig,
    },
    Api, Client, Resource, ResourceExt,
};
use tracing::{debug, error, info, instrument};

use crate::config::WatchScope;
use crate::controllers::Context;
use crate::crd::{Joke, JokeRequest};
use crate::error::{Error, Result};
use crate::metrics;
use crate::reconcilers::joke_request::{self as joke_request_reconciler, ReconcileOutcome};

/// Run the JokeRequest controller
pub async fn run(client: Client, context: Arc<Context>) {
    let requests: Api<JokeRequest> = scoped_api(&client, &context.config.watch_scope);
    let jokes: Api<Joke> = scoped_api(&client, &context.config.watch_scope);

    // Verify CRD is installed
    if let Err(e) = requests.list(&ListParams::default().limit(1)).await {
        error!("JokeRequest CRD not installed: {}", e);
        return;
    }

    info!(scope = ?context.config.watch_scope, "Starting JokeRequest controller");

    Controller::new(requests, WatcherConfig::default())
        .owns(jokes, WatcherConfig::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, context)
        .for_each(|result| async move {
            match result {
                Ok((obj, _action)) => {
                    debug!(
                        name = %obj.name,
                        namespace = obj.namespace.as_deref().unwrap_or("default"),
                        "Reconciled JokeRequest"
                    );
                }
                Err(e) => {
                    error!(error = %e, "Reconciliation error");
                    metrics::RECONCILIATION_ERRORS.with_label_values(&["JokeRequest"]).inc();
                }
            }
        })
        .await;
}

/// Api handle for the configured watch scope
fn scoped_api<K>(client: &Client, scope: &WatchScope) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope>,
    <K as Resource>::DynamicType: Default,
{
    match scope {
        WatchScope::CurrentNamespace => Api::default_namespaced(client.clone()),
        WatchScope::Namespace(ns) => Api::namespaced(client.clone(), ns),
        WatchScope::AllNamespaces => Api::all(client.clone()),
    }
}

/// Main reconciliation function
#[instrument(skip(ctx), fields(name = %obj.name_any(), namespace = obj.namespace()))]
async fn reconcile(obj: Arc<JokeRequest>, ctx: Arc<Context>) -> Result<Action> {
    let _timer = metrics::RECONCILE_DURATION
        .with_label_values(&["JokeRequest"])
        .start_timer();
    metrics::RECONCILIATIONS.with_label_values(&["JokeRequest"]).inc();

    let outcome = joke_request_reconciler::reconcile_latest(
        &obj,
        ctx.joke_api.as_ref(),
        ctx.store.as_ref(),
        ctx.config.delete_timeout,
    )
    .await?;

    if let ReconcileOutcome::UpdateStatus(status) = &outcome {
        info!(
            state = %status.state,
            error = status.error,
            joke = status.joke_id.as_deref().unwrap_or(""),
            "Updated JokeRequest status"
        );
    }

    Ok(Action::requeue(ctx.config.reconcile_interval))
}

/// Error policy for the controller
///
/// Only reading the request or writing its status can fail a reconcile;
/// retry on the regular cadence.
fn error_policy(obj: Arc<JokeRequest>, error: &Error, ctx: Arc<Context>) -> Action {
    error!(
        name = %obj.name_any(),
        error = %error,
        "Reconciliation failed, scheduling retry"
    );

    Action::requeue(ctx.config.reconcile_interval)
}
