//! Reconcilers for Joke CRDs
//!
//! This module contains the business logic for reconciling JokeRequests:
//! - Deciding whether a request is already satisfied
//! - Fetching jokes and materializing them as Joke resources
//! - Cleaning up Jokes a request no longer needs

pub mod joke_request;
pub mod ownership;
