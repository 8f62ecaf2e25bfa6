//! Joke Kubernetes Operator
//!
//! This operator watches JokeRequest resources, fetches a matching joke from
//! a JokeAPI compatible service and materializes it as an owned Joke
//! resource, keeping the two in sync as the request changes.

pub mod adapters;
pub mod config;
pub mod controllers;
pub mod crd;
pub mod error;
pub mod metrics;
pub mod reconcilers;

pub use error::{Error, Result};
