//! JokeRequest Custom Resource Definition
//!
//! A JokeRequest declares which kind of joke the user wants. The operator owns
//! its status and tracks convergence there through a small state machine.

use std::fmt;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// JokeRequest resource specification
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "joke.platform.kb.dk",
    version = "v1alpha1",
    kind = "JokeRequest",
    plural = "jokerequests",
    singular = "jokerequest",
    shortname = "jr",
    namespaced,
    status = "JokeRequestStatus",
    printcolumn = r#"{"name": "State", "type": "string", "jsonPath": ".status.state"}"#,
    printcolumn = r#"{"name": "Joke", "type": "string", "jsonPath": ".status.jokeId"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct JokeRequestSpec {
    /// Joke category, `Any` matches every category
    #[serde(default)]
    pub category: Category,

    /// Topics the joke must not touch
    #[serde(default)]
    pub excluded: Vec<ExcludedTopic>,

    /// Only accept jokes the API considers safe
    #[serde(default)]
    pub safe: bool,
}

impl JokeRequestSpec {
    /// Excluded topics as the comma-separated list the joke API expects.
    ///
    /// Duplicates are dropped, first occurrence wins.
    pub fn excluded_query(&self) -> String {
        let mut seen: Vec<ExcludedTopic> = Vec::with_capacity(self.excluded.len());
        for topic in &self.excluded {
            if !seen.contains(topic) {
                seen.push(*topic);
            }
        }
        seen.iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Joke category
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
pub enum Category {
    #[default]
    Any,
    Misc,
    Programming,
    Dark,
    Pun,
    Spooky,
    Christmas,
}

impl Category {
    /// Path segment used by the joke API
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Any => "Any",
            Category::Misc => "Misc",
            Category::Programming => "Programming",
            Category::Dark => "Dark",
            Category::Pun => "Pun",
            Category::Spooky => "Spooky",
            Category::Christmas => "Christmas",
        }
    }
}

/// Topic that can be excluded (a joke API blacklist flag)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExcludedTopic {
    Nsfw,
    Religious,
    Political,
    Racist,
    Sexist,
    Explicit,
}

impl ExcludedTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExcludedTopic::Nsfw => "nsfw",
            ExcludedTopic::Religious => "religious",
            ExcludedTopic::Political => "political",
            ExcludedTopic::Racist => "racist",
            ExcludedTopic::Sexist => "sexist",
            ExcludedTopic::Explicit => "explicit",
        }
    }
}

/// Convergence state of a JokeRequest
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
    /// Not reconciled yet
    #[default]
    Unknown,
    /// Convergence attempt in flight
    Processing,
    /// A live Joke matches the current spec
    Created,
    /// Last attempt failed; left only by a spec change or a missing Joke
    Error,
    /// Reserved. No transition leads here.
    AlreadyPresent,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            State::Unknown => "UNKNOWN",
            State::Processing => "PROCESSING",
            State::Created => "CREATED",
            State::Error => "ERROR",
            State::AlreadyPresent => "ALREADY_PRESENT",
        };
        f.write_str(s)
    }
}

/// Events that drive the status state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusEvent {
    /// A convergence attempt started
    Accepted,
    /// The Joke resource was created
    Materialized,
    /// Any failure along the way
    Failed,
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusEvent::Accepted => "accepted",
            StatusEvent::Materialized => "materialized",
            StatusEvent::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl State {
    /// Next state after `event`, or `Error::InvalidTransition`
    pub fn next(self, event: StatusEvent) -> Result<State> {
        match (self, event) {
            (_, StatusEvent::Failed) => Ok(State::Error),
            // Every state is a re-entry point, including a PROCESSING left
            // behind by an interrupted reconcile
            (_, StatusEvent::Accepted) => Ok(State::Processing),
            (State::Processing, StatusEvent::Materialized) => Ok(State::Created),
            (from, event) => Err(Error::InvalidTransition {
                from,
                event: event.to_string(),
            }),
        }
    }
}

/// JokeRequest status, written only by the operator
///
/// Absent fields serialize as `null` so a merge patch clears stale values.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct JokeRequestStatus {
    /// Convergence state
    pub state: State,

    /// Whether the last reconcile failed
    pub error: bool,

    /// Human-readable message
    pub message: Option<String>,

    /// Spec the status was computed for
    pub applied_spec: Option<JokeRequestSpec>,

    /// Name of the Joke materialized for this request
    pub joke_id: Option<String>,
}

impl JokeRequestStatus {
    /// Status while a convergence attempt is in flight
    pub fn accepted(previous: State, spec: &JokeRequestSpec) -> Result<Self> {
        Ok(Self {
            state: previous.next(StatusEvent::Accepted)?,
            error: false,
            message: None,
            applied_spec: Some(spec.clone()),
            joke_id: None,
        })
    }

    /// Status after the Joke named `joke_id` was created
    pub fn materialized(self, joke_id: &str) -> Result<Self> {
        Ok(Self {
            state: self.state.next(StatusEvent::Materialized)?,
            error: false,
            message: Some(format!("Joke {} created", joke_id)),
            joke_id: Some(joke_id.to_string()),
            ..self
        })
    }

    /// Failed status carrying `message`
    pub fn failed(message: impl Into<String>, applied_spec: Option<JokeRequestSpec>) -> Self {
        Self {
            state: State::Error,
            error: true,
            message: Some(message.into()),
            applied_spec,
            joke_id: None,
        }
    }

    /// True if this status claims the Joke for `spec` already exists
    pub fn is_created_for(&self, spec: &JokeRequestSpec) -> bool {
        self.state == State::Created
            && self.applied_spec.as_ref() == Some(spec)
            && self.joke_id.is_some()
    }
}
