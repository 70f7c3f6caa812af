use std::time::Duration;

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::cache::{BulkResolver, CachePolicy, ResolveError, ResultCache};
use crate::core::result::MatchResult;
use crate::core::search::Search;
use crate::utils::normalize::Normalizer;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),
}

impl From<RemoteError> for ResolveError {
    fn from(e: RemoteError) -> Self {
        ResolveError::Remote(e.to_string())
    }
}

/// The HTTP side of the client, shared by the cache loaders
#[derive(Clone)]
struct Endpoint {
    http: Client,
    base_url: String,
}

impl Endpoint {
    fn url(&self, path: &str) -> String {
        format!("{}/api/{path}", self.base_url)
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, RemoteError> {
        debug!("GET {path}");
        let response = self.http.get(self.url(path)).query(query).send()?;
        Self::decode(response)
    }

    fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<T, RemoteError> {
        debug!("POST {path}");
        let response = self
            .http
            .post(self.url(path))
            .query(query)
            .json(body)
            .send()?;
        Self::decode(response)
    }

    fn decode<T: DeserializeOwned>(response: reqwest::blocking::Response) -> Result<T, RemoteError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }
        Ok(response.json()?)
    }

    fn match_search(&self, search: &Search) -> Result<MatchResult, RemoteError> {
        self.post("searchByClassification", &[], search)
    }

    fn match_all(&self, searches: &[Search]) -> Result<Vec<MatchResult>, RemoteError> {
        let results: Vec<Option<MatchResult>> =
            self.post("searchAllByClassification", &[], searches)?;
        Ok(results
            .into_iter()
            .map(|r| r.unwrap_or_else(MatchResult::no_match))
            .collect())
    }

    fn get_by_id(&self, id: &str, follow: bool) -> Result<MatchResult, RemoteError> {
        self.get("getByTaxonID", &[("taxonID", id), ("follow", follow_flag(follow))])
    }

    fn get_all(&self, ids: &[String], follow: bool) -> Result<Vec<MatchResult>, RemoteError> {
        let results: Vec<Option<MatchResult>> =
            self.post("getAllByTaxonID", &[("follow", follow_flag(follow))], ids)?;
        Ok(results
            .into_iter()
            .map(|r| r.unwrap_or_else(MatchResult::no_match))
            .collect())
    }
}

fn follow_flag(follow: bool) -> &'static str {
    if follow {
        "true"
    } else {
        "false"
    }
}

/// Resolves searches against a remote server, remembering answers locally.
///
/// Bulk calls send only the entries missing from the local caches, in one
/// request.
pub struct RemoteMatcher {
    endpoint: Endpoint,
    normalizer: Normalizer,
    search_cache: ResultCache<Search, MatchResult>,
    id_cache: ResultCache<String, MatchResult>,
    id_follow_cache: ResultCache<String, MatchResult>,
}

impl RemoteMatcher {
    /// Create a client for the server at `base_url` (e.g. `http://localhost:8080`)
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::InvalidUrl` for a URL without an http(s) scheme,
    /// or `RemoteError::Http` if the HTTP client cannot be built.
    pub fn new(base_url: &str, policy: CachePolicy) -> Result<Self, RemoteError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(RemoteError::InvalidUrl(base_url));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        let endpoint = Endpoint { http, base_url };

        let search_endpoint = endpoint.clone();
        let id_endpoint = endpoint.clone();
        let follow_endpoint = endpoint.clone();

        Ok(Self {
            endpoint,
            normalizer: Normalizer::default(),
            search_cache: ResultCache::new("remote search", policy, move |search: &Search| {
                Ok(search_endpoint.match_search(search)?)
            }),
            id_cache: ResultCache::new("remote id", policy, move |id: &String| {
                Ok(id_endpoint.get_by_id(id, false)?)
            }),
            id_follow_cache: ResultCache::new("remote id-follow", policy, move |id: &String| {
                Ok(follow_endpoint.get_by_id(id, true)?)
            }),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.endpoint.base_url
    }

    /// Resolve one search
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::Remote` if the server cannot be reached or
    /// answers with an error.
    pub fn match_search(&self, search: &Search) -> Result<MatchResult, ResolveError> {
        self.search_cache.get(&self.normalizer.normalize_search(search))
    }

    /// Resolve a list of searches with at most one server call
    ///
    /// # Errors
    ///
    /// Returns `ResolveError` if the batch call fails or its reply has the
    /// wrong length.
    pub fn match_all(&self, searches: &[Option<Search>]) -> Result<Vec<Option<MatchResult>>, ResolveError> {
        let normalized: Vec<Option<Search>> = searches
            .iter()
            .map(|s| s.as_ref().map(|s| self.normalizer.normalize_search(s)))
            .collect();
        BulkResolver::new(&self.search_cache)
            .resolve_batched(&normalized, |batch| Ok(self.endpoint.match_all(batch)?))
    }

    /// Look up an identifier, optionally following synonyms
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::Remote` if the server call fails.
    pub fn get(&self, id: &str, follow: bool) -> Result<MatchResult, ResolveError> {
        self.id_cache_for(follow).get(&id.trim().to_string())
    }

    /// Look up a list of identifiers with at most one server call
    ///
    /// # Errors
    ///
    /// Returns `ResolveError` if the batch call fails or its reply has the
    /// wrong length.
    pub fn get_all(
        &self,
        ids: &[Option<String>],
        follow: bool,
    ) -> Result<Vec<Option<MatchResult>>, ResolveError> {
        let ids: Vec<Option<String>> = ids
            .iter()
            .map(|id| id.as_deref().map(|id| id.trim().to_string()))
            .collect();
        BulkResolver::new(self.id_cache_for(follow))
            .resolve_batched(&ids, |batch| Ok(self.endpoint.get_all(batch, follow)?))
    }

    fn id_cache_for(&self, follow: bool) -> &ResultCache<String, MatchResult> {
        if follow {
            &self.id_follow_cache
        } else {
            &self.id_cache
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_url_without_scheme() {
        assert!(matches!(
            RemoteMatcher::new("localhost:8080", CachePolicy::default()),
            Err(RemoteError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let remote = RemoteMatcher::new("http://localhost:8080/", CachePolicy::default()).unwrap();
        assert_eq!(remote.base_url(), "http://localhost:8080");
        assert_eq!(
            remote.endpoint.url("getByTaxonID"),
            "http://localhost:8080/api/getByTaxonID"
        );
    }

    #[test]
    fn test_unreachable_server_is_remote_error() {
        // Port 9 (discard) is closed on test machines
        let remote = RemoteMatcher::new("http://127.0.0.1:9", CachePolicy::default()).unwrap();
        let err = remote.match_search(&Search::named("Acacia dealbata")).unwrap_err();
        assert!(matches!(err, ResolveError::Remote(_)));
    }

    #[test]
    fn test_cached_batch_needs_no_server() {
        let remote = RemoteMatcher::new("http://127.0.0.1:9", CachePolicy::default()).unwrap();
        let search = Search::named("Acacia dealbata");
        let mut cached = MatchResult::no_match();
        cached.success = true;
        cached.taxon_concept_id = Some("ACA-DEA".to_string());
        remote
            .search_cache
            .insert(remote.normalizer.normalize_search(&search), cached.clone());

        let results = remote.match_all(&[Some(search), None]).unwrap();
        assert_eq!(results, vec![Some(cached), None]);
    }
}
