//! Custom Resource Definitions for the Joke Operator

mod joke;
mod joke_request;

pub use joke::*;
pub use joke_request::*;

use kube::CustomResourceExt;

/// Generate all CRD YAML manifests
pub fn generate_crds() -> serde_yaml::Result<Vec<String>> {
    Ok(vec![
        serde_yaml::to_string(&JokeRequest::crd())?,
        serde_yaml::to_string(&Joke::crd())?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_crds() {
        let crds = generate_crds().unwrap();
        assert_eq!(crds.len(), 2);
        assert!(crds[0].contains("jokerequests.joke.platform.kb.dk"));
        assert!(crds[0].contains("status"));
        assert!(crds[1].contains("jokes.joke.platform.kb.dk"));
    }
}
