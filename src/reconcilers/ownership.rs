//! Joke ownership and garbage collection
//!
//! Every Joke carries exactly one controller owner reference pointing at the
//! JokeRequest it was made for. Before a request gets a new Joke, all Jokes it
//! owns are deleted. Deletion is best effort: a Joke that fails to go away is
//! logged and counted, and the new Joke is created anyway, so a request can
//! briefly own more than one Joke until a later reconcile collects it.

use std::time::Duration;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};
use tracing::{info, warn};

use crate::adapters::JokeStore;
use crate::crd::{Joke, JokeRequest};
use crate::error::{Error, Result};
use crate::metrics;

/// Controller owner reference for `request`, blocking its foreground deletion
pub fn owner_reference(request: &JokeRequest) -> Result<OwnerReference> {
    let owner = request.controller_owner_ref(&()).ok_or_else(|| {
        Error::validation(format!(
            "JokeRequest {} has no name or UID, cannot own a Joke",
            request.name_any()
        ))
    })?;
    Ok(OwnerReference {
        block_owner_deletion: Some(true),
        ..owner
    })
}

/// Owner references are equal when they point at the same object
pub fn same_owner(a: &OwnerReference, b: &OwnerReference) -> bool {
    a.api_version == b.api_version && a.kind == b.kind && a.name == b.name && a.uid == b.uid
}

/// Whether any owner reference of `joke` matches `owner`
pub fn is_owned_by(joke: &Joke, owner: &OwnerReference) -> bool {
    joke.owner_references().iter().any(|r| same_owner(r, owner))
}

/// Place `joke` in `namespace` under `owner`
pub fn adopt(joke: &mut Joke, owner: OwnerReference, namespace: &str) {
    joke.metadata.namespace = Some(namespace.to_string());
    joke.metadata.owner_references = Some(vec![owner]);
}

/// Outcome of one garbage collection pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectionReport {
    /// Names of Jokes that were deleted
    pub deleted: Vec<String>,
    /// Names of Jokes that could not be deleted, with the reason
    pub failed: Vec<(String, String)>,
}

/// Delete every Joke in `namespace` owned by `owner`.
///
/// Only the listing can fail the pass. Individual deletions are best effort.
pub async fn delete_owned_jokes(
    store: &dyn JokeStore,
    owner: &OwnerReference,
    namespace: &str,
    timeout: Duration,
) -> Result<CollectionReport> {
    let owned: Vec<String> = store
        .list_jokes(namespace)
        .await?
        .iter()
        .filter(|joke| is_owned_by(joke, owner))
        .map(|joke| joke.name_any())
        .collect();

    let mut report = CollectionReport::default();
    for name in owned {
        match store.delete_joke(namespace, &name, timeout).await {
            Ok(()) => {
                info!(namespace = %namespace, joke = %name, owner = %owner.name, "Deleted owned Joke");
                metrics::JOKE_DELETIONS.with_label_values(&["deleted"]).inc();
                report.deleted.push(name);
            }
            Err(e) => {
                warn!(
                    namespace = %namespace,
                    joke = %name,
                    owner = %owner.name,
                    error = %e,
                    "Failed to delete owned Joke, continuing"
                );
                metrics::JOKE_DELETIONS.with_label_values(&["failed"]).inc();
                report.failed.push((name, e.to_string()));
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    use super::*;
    use crate::crd::{JokeRequestSpec, JokeSpec};

    fn request(name: &str, uid: Option<&str>) -> JokeRequest {
        JokeRequest {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                uid: uid.map(str::to_string),
                ..Default::default()
            },
            spec: JokeRequestSpec::default(),
            status: None,
        }
    }

    fn joke(name: &str) -> Joke {
        Joke::new(
            name,
            JokeSpec {
                joke: "Hello".to_string(),
                category: "Misc".to_string(),
                safe: true,
                lang: "en".to_string(),
                flags: Default::default(),
            },
        )
    }

    #[test]
    fn test_owner_reference_is_controller() {
        let owner = owner_reference(&request("myjoke1", Some("uid-1"))).unwrap();

        assert_eq!(owner.api_version, "joke.platform.kb.dk/v1alpha1");
        assert_eq!(owner.kind, "JokeRequest");
        assert_eq!(owner.name, "myjoke1");
        assert_eq!(owner.uid, "uid-1");
        assert_eq!(owner.controller, Some(true));
        assert_eq!(owner.block_owner_deletion, Some(true));
    }

    #[test]
    fn test_owner_reference_requires_uid() {
        let err = owner_reference(&request("myjoke1", None)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_same_owner_ignores_flags_but_not_identity() {
        let owner = owner_reference(&request("a", Some("uid-a"))).unwrap();

        let mut relaxed = owner.clone();
        relaxed.controller = None;
        relaxed.block_owner_deletion = Some(false);
        assert!(same_owner(&owner, &relaxed));

        let recreated = owner_reference(&request("a", Some("uid-a2"))).unwrap();
        assert!(!same_owner(&owner, &recreated));

        let mut other_kind = owner.clone();
        other_kind.kind = "ConfigMap".to_string();
        assert!(!same_owner(&owner, &other_kind));
    }

    #[test]
    fn test_adopt_and_is_owned_by() {
        let owner = owner_reference(&request("a", Some("uid-a"))).unwrap();
        let stranger = owner_reference(&request("b", Some("uid-b"))).unwrap();

        let mut j = joke("17");
        assert!(!is_owned_by(&j, &owner));

        adopt(&mut j, owner.clone(), "jokes");
        assert_eq!(j.namespace().as_deref(), Some("jokes"));
        assert!(is_owned_by(&j, &owner));
        assert!(!is_owned_by(&j, &stranger));
    }
}
