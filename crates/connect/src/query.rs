//! Request URL construction: query parameters and auth decoration.

use policyfeed_core::AuthDescriptor;
use url::Url;

use crate::error::FetchError;
use crate::secrets::SecretStore;

pub fn parse_endpoint(endpoint: &str) -> Result<Url, FetchError> {
    Url::parse(endpoint).map_err(|e| FetchError::InvalidUrl {
        url: endpoint.to_string(),
        reason: e.to_string(),
    })
}

/// Set query parameters, replacing any existing values for the same keys.
/// Untouched keys keep their position.
pub fn set_query_params(url: &mut Url, params: &[(String, String)]) {
    if params.is_empty() {
        return;
    }
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !params.iter().any(|(name, _)| name == k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut pairs = url.query_pairs_mut();
    pairs.clear();
    for (k, v) in kept.iter().chain(params.iter()) {
        pairs.append_pair(k, v);
    }
}

/// Decorate a request URL according to the source's auth descriptor.
///
/// `query_key` fails fast when the named secret is absent.
pub fn apply_auth(
    url: &mut Url,
    auth: &AuthDescriptor,
    secrets: &dyn SecretStore,
) -> Result<(), FetchError> {
    match auth {
        AuthDescriptor::None => Ok(()),
        AuthDescriptor::QueryKey { env_key, param_name } => {
            let value = secrets
                .get(env_key)
                .ok_or_else(|| FetchError::MissingSecret(env_key.clone()))?;
            set_query_params(url, &[(param_name.clone(), value)]);
            Ok(())
        }
    }
}
