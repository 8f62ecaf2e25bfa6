//! Joke API client
//!
//! Talks to a JokeAPI v2 compatible service. The service reports domain
//! errors (for example "No matching joke found") as a JSON body with
//! `error: true`, usually together with a 4xx status, so the body is decoded
//! regardless of the HTTP status.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::crd::{Category, JokeRequestSpec};
use crate::error::{Error, Result};

/// Joke shape requested from the API; the operator only handles one-liners
pub const JOKE_TYPE_SINGLE: &str = "single";

/// Parameters of one joke API call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JokeQuery {
    /// Category path segment
    pub category: Category,
    /// Comma-separated blacklist flags, possibly empty
    pub excluded: String,
    /// Safe mode
    pub safe: bool,
    /// Response shape selector
    pub joke_type: &'static str,
}

impl JokeQuery {
    /// Build the query for a JokeRequest spec
    pub fn from_spec(spec: &JokeRequestSpec) -> Self {
        Self {
            category: spec.category,
            excluded: spec.excluded_query(),
            safe: spec.safe,
            joke_type: JOKE_TYPE_SINGLE,
        }
    }
}

/// Joke API response, either a joke or a structured error
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JokeModel {
    pub error: bool,
    pub internal_error: bool,
    pub message: Option<String>,
    pub caused_by: Vec<String>,
    pub additional_info: Option<String>,
    pub category: Option<String>,
    pub joke: Option<String>,
    pub flags: BTreeMap<String, bool>,
    pub id: Option<u64>,
    pub safe: bool,
    pub lang: Option<String>,
}

impl JokeModel {
    /// Human-readable description of a domain error response
    pub fn error_message(&self) -> String {
        let mut msg = self
            .message
            .clone()
            .unwrap_or_else(|| "Joke API reported an error".to_string());
        if !self.caused_by.is_empty() {
            msg.push_str(": ");
            msg.push_str(&self.caused_by.join("; "));
        }
        if let Some(info) = self.additional_info.as_deref().filter(|i| !i.is_empty()) {
            msg.push_str(&format!(" ({})", info));
        }
        msg
    }
}

/// Source of random jokes
#[async_trait]
pub trait JokeService: Send + Sync {
    /// Fetch one random joke matching `query`
    async fn get_random(&self, query: &JokeQuery) -> Result<JokeModel>;
}

/// HTTP client for the joke API
#[derive(Clone, Debug)]
pub struct JokeApiClient {
    base_url: Url,
    http: reqwest::Client,
}

impl JokeApiClient {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("joke-operator/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let mut base_url = base_url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { base_url, http })
    }

    /// Full request URL for `query`
    pub fn joke_url(&self, query: &JokeQuery) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&format!("joke/{}", query.category.as_str()))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("type", query.joke_type);
            if !query.excluded.is_empty() {
                pairs.append_pair("blacklistFlags", &query.excluded);
            }
            if query.safe {
                pairs.append_key_only("safe-mode");
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl JokeService for JokeApiClient {
    async fn get_random(&self, query: &JokeQuery) -> Result<JokeModel> {
        let url = self.joke_url(query)?;
        info!(
            category = query.category.as_str(),
            excluded = %query.excluded,
            safe = query.safe,
            joke_type = query.joke_type,
            "Requesting joke"
        );

        let response = self.http.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        let model: JokeModel = match serde_json::from_slice(&body) {
            Ok(model) => model,
            Err(e) if status.is_success() => return Err(e.into()),
            Err(_) => {
                return Err(Error::malformed(format!("joke API answered HTTP {}", status)));
            }
        };

        if !status.is_success() && !model.error {
            return Err(Error::malformed(format!("joke API answered HTTP {}", status)));
        }

        debug!(status = %status, error = model.error, id = ?model.id, "Received joke response");
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::crd::ExcludedTopic;

    fn client_for(server: &MockServer) -> JokeApiClient {
        let url = Url::parse(&server.uri()).unwrap();
        JokeApiClient::new(url, Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_joke_url_encodes_every_parameter() {
        let client = JokeApiClient::new(
            Url::parse("https://v2.jokeapi.dev").unwrap(),
            Duration::from_secs(1),
        )
        .unwrap();
        let spec = JokeRequestSpec {
            category: Category::Programming,
            excluded: vec![ExcludedTopic::Nsfw, ExcludedTopic::Racist],
            safe: true,
        };

        let url = client.joke_url(&JokeQuery::from_spec(&spec)).unwrap();
        assert_eq!(
            url.as_str(),
            "https://v2.jokeapi.dev/joke/Programming?type=single&blacklistFlags=nsfw%2Cracist&safe-mode"
        );
    }

    #[test]
    fn test_joke_url_keeps_base_path() {
        let client = JokeApiClient::new(
            Url::parse("http://proxy.local/jokeapi").unwrap(),
            Duration::from_secs(1),
        )
        .unwrap();

        let url = client
            .joke_url(&JokeQuery::from_spec(&JokeRequestSpec::default()))
            .unwrap();
        assert_eq!(url.as_str(), "http://proxy.local/jokeapi/joke/Any?type=single");
    }

    #[test]
    fn test_error_message_includes_diagnostics() {
        let model = JokeModel {
            error: true,
            message: Some("No matching joke found".to_string()),
            caused_by: vec!["No jokes were found that match your provided filter(s).".to_string()],
            additional_info: Some("Try fewer filters".to_string()),
            ..JokeModel::default()
        };

        assert_eq!(
            model.error_message(),
            "No matching joke found: No jokes were found that match your provided filter(s). (Try fewer filters)"
        );
    }

    #[tokio::test]
    async fn test_get_random_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/joke/Any"))
            .and(query_param("type", "single"))
            .and(query_param_is_missing("blacklistFlags"))
            .and(query_param_is_missing("safe-mode"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": false,
                "category": "Misc",
                "type": "single",
                "joke": "Hello",
                "flags": {"nsfw": false, "racist": false},
                "id": 1,
                "safe": true,
                "lang": "en"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let model = client_for(&server)
            .get_random(&JokeQuery::from_spec(&JokeRequestSpec::default()))
            .await
            .unwrap();

        assert!(!model.error);
        assert_eq!(model.id, Some(1));
        assert_eq!(model.joke.as_deref(), Some("Hello"));
        assert_eq!(model.flags.get("nsfw"), Some(&false));
    }

    #[tokio::test]
    async fn test_get_random_domain_error_with_400() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/joke/Dark"))
            .and(query_param("blacklistFlags", "nsfw"))
            .and(query_param("safe-mode", ""))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": true,
                "internalError": false,
                "code": 106,
                "message": "No matching joke found",
                "causedBy": ["No jokes were found that match your provided filter(s)."],
                "additionalInfo": "",
                "timestamp": 1615998352457u64
            })))
            .mount(&server)
            .await;

        let spec = JokeRequestSpec {
            category: Category::Dark,
            excluded: vec![ExcludedTopic::Nsfw],
            safe: true,
        };
        let model = client_for(&server)
            .get_random(&JokeQuery::from_spec(&spec))
            .await
            .unwrap();

        assert!(model.error);
        assert!(model.error_message().starts_with("No matching joke found"));
    }

    #[tokio::test]
    async fn test_get_random_server_error_without_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_random(&JokeQuery::from_spec(&JokeRequestSpec::default()))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MalformedResponse(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_get_random_garbage_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_random(&JokeQuery::from_spec(&JokeRequestSpec::default()))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Serialization(_)));
    }
}
