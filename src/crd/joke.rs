//! Joke Custom Resource Definition

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::adapters::JokeModel;
use crate::error::{Error, Result};

/// Joke resource specification, one upstream joke.
///
/// The resource name is the upstream joke id.
#[derive(CustomResource, Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "joke.platform.kb.dk",
    version = "v1alpha1",
    kind = "Joke",
    plural = "jokes",
    singular = "joke",
    namespaced,
    printcolumn = r#"{"name": "Category", "type": "string", "jsonPath": ".spec.category"}"#,
    printcolumn = r#"{"name": "Safe", "type": "boolean", "jsonPath": ".spec.safe"}"#,
    printcolumn = r#"{"name": "Lang", "type": "string", "jsonPath": ".spec.lang"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct JokeSpec {
    /// Joke text
    pub joke: String,

    /// Category reported by the joke API
    pub category: String,

    /// Whether the joke API considers the joke safe
    #[serde(default)]
    pub safe: bool,

    /// Language code
    pub lang: String,

    /// Flags reported by the joke API
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub flags: BTreeMap<String, bool>,
}

impl Joke {
    /// Build a Joke from a successful joke API response
    pub fn from_model(model: &JokeModel) -> Result<Self> {
        let id = model
            .id
            .ok_or_else(|| Error::malformed("joke response has no id"))?;
        let joke = model
            .joke
            .clone()
            .ok_or_else(|| Error::malformed(format!("joke {} has no text", id)))?;

        let spec = JokeSpec {
            joke,
            category: model.category.clone().unwrap_or_default(),
            safe: model.safe,
            lang: model.lang.clone().unwrap_or_default(),
            flags: model.flags.clone(),
        };

        Ok(Joke::new(&id.to_string(), spec))
    }
}
