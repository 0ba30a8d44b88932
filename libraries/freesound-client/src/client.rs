//! Main Freesound API client.

use crate::download;
use crate::error::{FreesoundError, Result};
use crate::object::{FreesoundObject, FromObject};
use crate::pager::{CombinedSearchPager, Paginated, Pager};
use crate::params::QueryParams;
use crate::resources::{Pack, Sound, User};
use crate::types::{ClientConfig, RetrieveProgress};
use crate::uris;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response};
use serde_json::Value;
use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Fields requested by searches unless the caller picks their own.
///
/// Includes the preview URIs so search results can be previewed directly.
pub const DEFAULT_SEARCH_FIELDS: &str = "id,name,tags,username,license,previews";

/// Client for the Freesound API.
///
/// The credential is fixed at construction and sent with every request.
/// Cloning is cheap: clones share the connection pool, and every object
/// returned by the client keeps a clone to make follow-up calls.
///
/// # Example
///
/// ```ignore
/// use freesound_client::{ClientConfig, FreesoundClient, QueryParams};
///
/// let client = FreesoundClient::new(ClientConfig::with_api_key("<your_api_key>"))?;
///
/// let sound = client.get_sound(96541, QueryParams::new()).await?;
/// println!("{}", sound.name()?);
///
/// let results = client
///     .text_search(QueryParams::new().param("query", "dubstep").param("filter", "tag:loop"))
///     .await?;
/// for sound in results.iter() {
///     println!("{}", sound?.name()?);
/// }
/// ```
#[derive(Clone, Debug)]
pub struct FreesoundClient {
    http: Client,
    base_url: Arc<str>,
    chunk_size: usize,
}

impl FreesoundClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let config = config.validated()?;

        let mut auth = HeaderValue::from_str(&config.credential.header_value())
            .map_err(|_| {
                FreesoundError::MissingCredential("token contains invalid characters".into())
            })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let mut builder = Client::builder()
            .default_headers(headers)
            .user_agent(format!("freesound-client/{}", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            base_url: config.base_url.into(),
            chunk_size: config.chunk_size,
        })
    }

    /// Get the API root URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URI of an endpoint template filled with `args`.
    pub fn uri(&self, template: &str, args: &[&dyn Display]) -> String {
        format!("{}{}", self.base_url, uris::expand(template, args))
    }

    // -------------------------------------------------------------------------
    // Transport
    // -------------------------------------------------------------------------

    /// Send an authenticated GET and fail on non-2xx statuses.
    ///
    /// An empty parameter set leaves `uri` untouched, so page links are
    /// requested exactly as the server sent them.
    pub(crate) async fn send(&self, uri: &str, params: &QueryParams) -> Result<Response> {
        debug!(uri = %uri, params = params.len(), "GET");

        let mut request = self.http.get(uri);
        if !params.is_empty() {
            request = request.query(params.as_pairs());
        }
        let response = request.send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            debug!(uri = %uri, status = status.as_u16(), "Request rejected");
            Err(FreesoundError::Api {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            })
        }
    }

    /// GET a JSON document.
    pub async fn get_json(&self, uri: &str, params: &QueryParams) -> Result<Value> {
        let body = self.send(uri, params).await?.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| FreesoundError::parse(format!("Couldn't parse response: {e}")))
    }

    /// GET a JSON object and wrap it as `T`.
    pub async fn request<T: FromObject>(&self, uri: &str, params: &QueryParams) -> Result<T> {
        let value = self.get_json(uri, params).await?;
        T::from_object(FreesoundObject::from_value(value, self.clone())?)
    }

    /// Download `uri` to `path`, overwriting it.
    ///
    /// See [`RetrieveProgress`] for what the callback receives.
    pub async fn retrieve(
        &self,
        uri: &str,
        path: &Path,
        progress: Option<&mut (dyn FnMut(RetrieveProgress) + Send)>,
    ) -> Result<()> {
        download::retrieve(self, uri, path, self.chunk_size, progress).await
    }

    // -------------------------------------------------------------------------
    // Endpoints
    // -------------------------------------------------------------------------

    /// Get a sound by id.
    ///
    /// Relevant params: `fields`, `descriptors`, `normalized`.
    pub async fn get_sound(&self, sound_id: u64, params: QueryParams) -> Result<Sound> {
        let uri = self.uri(uris::SOUND, &[&sound_id]);
        self.request(&uri, &params).await
    }

    /// Search sounds with a text query and/or filter.
    ///
    /// Relevant params: `query`, `filter`, `sort`, `page`, `page_size`,
    /// `fields`, `group_by_pack`.
    pub async fn text_search(&self, params: QueryParams) -> Result<Pager<Sound>> {
        let uri = self.uri(uris::TEXT_SEARCH, &[]);
        let params = params.with_default("fields", DEFAULT_SEARCH_FIELDS);
        self.request(&uri, &params).await
    }

    /// Search sounds by content-based descriptor target and/or filter.
    ///
    /// Relevant params: `target`, `descriptors_filter`, `page`, `page_size`,
    /// `fields`.
    pub async fn content_based_search(&self, params: QueryParams) -> Result<Pager<Sound>> {
        let uri = self.uri(uris::CONTENT_SEARCH, &[]);
        let params = params.with_default("fields", DEFAULT_SEARCH_FIELDS);
        self.request(&uri, &params).await
    }

    /// Combine text and content-based queries.
    ///
    /// Results use the one-directional `more` pagination.
    pub async fn combined_search(&self, params: QueryParams) -> Result<CombinedSearchPager> {
        let uri = self.uri(uris::COMBINED_SEARCH, &[]);
        let params = params.with_default("fields", DEFAULT_SEARCH_FIELDS);
        self.request(&uri, &params).await
    }

    /// Get a user by username.
    pub async fn get_user(&self, username: &str) -> Result<User> {
        let uri = self.uri(uris::USER, &[&username]);
        self.request(&uri, &QueryParams::new()).await
    }

    /// Get the user owning the OAuth2 token.
    pub async fn me(&self) -> Result<User> {
        let uri = self.uri(uris::ME, &[]);
        self.request(&uri, &QueryParams::new()).await
    }

    /// Get a pack by id.
    pub async fn get_pack(&self, pack_id: u64) -> Result<Pack> {
        let uri = self.uri(uris::PACK, &[&pack_id]);
        self.request(&uri, &QueryParams::new()).await
    }

    /// Resume a paginated listing from a page URI.
    ///
    /// ```ignore
    /// let saved = results.next_uri().unwrap().to_string();
    /// let page: Pager<Sound> = client.pager(&saved).await?;
    /// ```
    pub async fn pager<P: Paginated>(&self, uri: &str) -> Result<P> {
        P::fetch(self, uri, &QueryParams::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_building() {
        let client = FreesoundClient::new(
            ClientConfig::with_api_key("key").with_base_url("https://example.com/apiv2/"),
        )
        .expect("valid config");

        assert_eq!(client.base_url(), "https://example.com/apiv2");
        assert_eq!(
            client.uri(uris::PACK_SOUNDS, &[&3524]),
            "https://example.com/apiv2/packs/3524/sounds/"
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let result = FreesoundClient::new(ClientConfig::with_api_key("key").with_base_url("nope"));
        assert!(matches!(result, Err(FreesoundError::InvalidUrl(_))));
    }

    #[test]
    fn test_token_with_newline_rejected() {
        let result = FreesoundClient::new(ClientConfig::with_api_key("abc\ndef"));
        assert!(matches!(result, Err(FreesoundError::MissingCredential(_))));
    }
}
