//! Adapters for the external systems the operator talks to: the joke API
//! and the Kubernetes resource store

mod joke_api;
mod kube_store;

pub use joke_api::*;
pub use kube_store::*;
