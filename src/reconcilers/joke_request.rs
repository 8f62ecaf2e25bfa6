//! JokeRequest reconciler
//!
//! Decides whether a JokeRequest needs work and, if so, fetches a joke,
//! replaces the Joke owned by the request and computes the new status.
//! Failures never escape: they end up in the returned status.

use std::time::Duration;

use kube::ResourceExt;
use tracing::{debug, error, info, warn};

use crate::adapters::{JokeQuery, JokeService, JokeStore};
use crate::crd::{Joke, JokeRequest, JokeRequestStatus};
use crate::error::Result;
use crate::metrics;
use crate::reconcilers::ownership;

/// What the caller should do after a reconcile
#[derive(Clone, Debug, PartialEq)]
pub enum ReconcileOutcome {
    /// Current state matches desired state, write nothing
    NoOp,
    /// Persist this status on the status subresource
    UpdateStatus(JokeRequestStatus),
}

/// Reconcile one JokeRequest.
///
/// Side-effect free when the request is already satisfied. Otherwise calls the
/// joke API, deletes the Jokes this request owns, creates the new one and
/// returns the status to write.
pub async fn reconcile(
    request: &JokeRequest,
    service: &dyn JokeService,
    store: &dyn JokeStore,
    delete_timeout: Duration,
) -> ReconcileOutcome {
    let name = request.name_any();
    let namespace = request.namespace().unwrap_or_else(|| "default".to_string());

    info!(
        name = %name,
        namespace = %namespace,
        status = ?request.status,
        "Starting reconcile"
    );

    if is_satisfied(request, store, &namespace).await {
        info!(name = %name, namespace = %namespace, "Joke up to date, no update");
        metrics::NOOP_RECONCILES.inc();
        return ReconcileOutcome::NoOp;
    }

    let status = match converge(request, service, store, &namespace, delete_timeout).await {
        Ok(status) => status,
        Err(e) => {
            error!(name = %name, namespace = %namespace, error = %e, "Reconcile failed");
            JokeRequestStatus::failed(format!("Reconcile failed: {}", e), None)
        }
    };

    ReconcileOutcome::UpdateStatus(status)
}

/// Reconcile and write the resulting status, if any
pub async fn reconcile_and_persist(
    request: &JokeRequest,
    service: &dyn JokeService,
    store: &dyn JokeStore,
    delete_timeout: Duration,
) -> Result<ReconcileOutcome> {
    let outcome = reconcile(request, service, store, delete_timeout).await;

    if let ReconcileOutcome::UpdateStatus(status) = &outcome {
        let namespace = request.namespace().unwrap_or_else(|| "default".to_string());
        store
            .patch_request_status(&namespace, &request.name_any(), status)
            .await?;
    }

    Ok(outcome)
}

/// Reconcile the API server's current copy of `request` and write the status.
///
/// The watch cache can lag behind our own status writes. An owned Joke event
/// queued during a converge would otherwise see the old status and converge a
/// second time. A request that no longer exists needs nothing.
pub async fn reconcile_latest(
    request: &JokeRequest,
    service: &dyn JokeService,
    store: &dyn JokeStore,
    delete_timeout: Duration,
) -> Result<ReconcileOutcome> {
    let namespace = request.namespace().unwrap_or_else(|| "default".to_string());
    let name = request.name_any();

    match store.get_request(&namespace, &name).await? {
        Some(latest) => reconcile_and_persist(&latest, service, store, delete_timeout).await,
        None => {
            debug!(name = %name, namespace = %namespace, "JokeRequest gone, nothing to do");
            Ok(ReconcileOutcome::NoOp)
        }
    }
}

/// Idempotency check: CREATED for the current spec and the Joke still exists
async fn is_satisfied(request: &JokeRequest, store: &dyn JokeStore, namespace: &str) -> bool {
    let Some(status) = &request.status else {
        return false;
    };
    if !status.is_created_for(&request.spec) {
        return false;
    }
    let Some(joke_id) = status.joke_id.as_deref() else {
        return false;
    };

    match store.get_joke(namespace, joke_id).await {
        Ok(Some(_)) => true,
        Ok(None) => {
            info!(namespace = %namespace, joke = %joke_id, "Joke disappeared, recreating");
            false
        }
        Err(e) => {
            warn!(namespace = %namespace, joke = %joke_id, error = %e, "Joke lookup failed, reconverging");
            false
        }
    }
}

/// Fetch a joke and materialize it for `request`
async fn converge(
    request: &JokeRequest,
    service: &dyn JokeService,
    store: &dyn JokeStore,
    namespace: &str,
    delete_timeout: Duration,
) -> Result<JokeRequestStatus> {
    let spec = &request.spec;
    let owner = ownership::owner_reference(request)?;

    let previous = request
        .status
        .as_ref()
        .map(|s| s.state)
        .unwrap_or_default();
    let status = JokeRequestStatus::accepted(previous, spec)?;

    let model = match service.get_random(&JokeQuery::from_spec(spec)).await {
        Ok(model) => model,
        Err(e) => {
            metrics::JOKE_API_REQUESTS
                .with_label_values(&["transport_error"])
                .inc();
            return Err(e);
        }
    };

    if model.error {
        metrics::JOKE_API_REQUESTS
            .with_label_values(&["domain_error"])
            .inc();
        let message = model.error_message();
        warn!(name = %owner.name, namespace = %namespace, message = %message, "Joke API reported an error");
        return Ok(JokeRequestStatus::failed(message, Some(spec.clone())));
    }
    metrics::JOKE_API_REQUESTS.with_label_values(&["success"]).inc();

    let mut joke = Joke::from_model(&model)?;
    ownership::adopt(&mut joke, owner.clone(), namespace);

    let report = ownership::delete_owned_jokes(store, &owner, namespace, delete_timeout).await?;
    if !report.failed.is_empty() {
        warn!(
            name = %owner.name,
            namespace = %namespace,
            stale = report.failed.len(),
            "Some owned Jokes could not be deleted, request may own more than one Joke"
        );
    }

    let created = store.create_joke(namespace, &joke).await?;
    let joke_id = created.name_any();
    metrics::JOKES_CREATED.inc();
    info!(name = %owner.name, namespace = %namespace, joke = %joke_id, "Joke created");

    status.materialized(&joke_id)
}
