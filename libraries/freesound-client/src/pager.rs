//! Paginated result sets.
//!
//! Freesound paginates in two incompatible ways:
//!
//! - [`Pager`]: `count`, `next`, `previous` links, navigable both ways.
//! - [`CombinedSearchPager`]: a single `more` link, forward only, total
//!   unknown and page size not guaranteed.
//!
//! Both implement [`Paginated`], which is enough to restart a listing from
//! a saved URI or to walk it as a lazy stream with [`into_stream`].

use crate::client::FreesoundClient;
use crate::error::{FreesoundError, Result};
use crate::object::{json_type, FreesoundObject, FromObject};
use crate::params::QueryParams;
use crate::resources::Sound;
use async_trait::async_trait;
use futures_util::stream::{self, Stream, TryStreamExt};
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use tracing::debug;

/// Shared behaviour of the two pagination styles.
#[async_trait]
pub trait Paginated: FromObject + Send + Sync + Sized {
    /// Type each entry of `results` is wrapped as
    type Item: FromObject + Send;

    /// Fetch the page at `uri`.
    async fn fetch(client: &FreesoundClient, uri: &str, params: &QueryParams) -> Result<Self> {
        client.request(uri, params).await
    }

    /// The whole page object (`results` plus links).
    fn page(&self) -> &FreesoundObject;

    /// Raw entries of this page, in server order.
    fn results(&self) -> &[Value];

    /// Link to the page that comes after this one, if any.
    fn following_uri(&self) -> Option<&str>;

    /// Fetch the page that comes after this one.
    async fn advance(&self) -> Result<Self>;

    fn client(&self) -> &FreesoundClient {
        self.page().client()
    }

    fn len(&self) -> usize {
        self.results().len()
    }

    fn is_empty(&self) -> bool {
        self.results().is_empty()
    }

    /// Entry at `index` of this page.
    fn get(&self, index: usize) -> Result<Self::Item> {
        let results = self.results();
        let entry = results.get(index).ok_or(FreesoundError::IndexOutOfRange {
            index,
            len: results.len(),
        })?;
        wrap_entry(entry, self.client())
    }

    /// All entries of this page.
    fn current_page(&self) -> Result<Vec<Self::Item>> {
        self.results()
            .iter()
            .map(|entry| wrap_entry(entry, self.client()))
            .collect()
    }
}

fn wrap_entry<T: FromObject>(entry: &Value, client: &FreesoundClient) -> Result<T> {
    T::from_object(FreesoundObject::from_value(entry.clone(), client.clone())?)
}

/// Walk a listing from `first` onward as a stream of items.
///
/// The following page is fetched only once every item of the current one
/// has been read. Items keep server order; nothing is merged or
/// deduplicated across pages. The stream ends after the last page and
/// stops at the first error.
pub fn into_stream<P: Paginated>(first: P) -> impl Stream<Item = Result<P::Item>> {
    stream::try_unfold(Walk::Start(first), walk_step::<P>)
        .map_ok(|items| stream::iter(items.into_iter().map(Ok::<_, FreesoundError>)))
        .try_flatten()
}

enum Walk<P> {
    Start(P),
    Follow(P),
}

type WalkStep<P> = Option<(Vec<<P as Paginated>::Item>, Walk<P>)>;

async fn walk_step<P: Paginated>(state: Walk<P>) -> Result<WalkStep<P>> {
    let page = match state {
        Walk::Start(page) => page,
        Walk::Follow(previous) => {
            if previous.following_uri().is_none() {
                return Ok(None);
            }
            previous.advance().await?
        }
    };
    let items = page.current_page()?;
    Ok(Some((items, Walk::Follow(page))))
}

fn optional_link(page: &FreesoundObject, name: &str) -> Result<Option<String>> {
    match page.get_opt(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(uri)) if uri.is_empty() => Ok(None),
        Some(Value::String(uri)) => Ok(Some(uri.clone())),
        Some(other) => Err(FreesoundError::parse(format!(
            "page link `{name}` should be a string, got {}",
            json_type(other)
        ))),
    }
}

/// Check that `results` is an array; [`page_results`] relies on it.
fn check_results(page: &FreesoundObject) -> Result<()> {
    match page.get_opt("results") {
        Some(Value::Array(_)) => Ok(()),
        Some(other) => Err(FreesoundError::parse(format!(
            "page `results` should be an array, got {}",
            json_type(other)
        ))),
        None => Err(FreesoundError::parse("page has no `results`")),
    }
}

fn page_results(page: &FreesoundObject) -> &[Value] {
    match page.get_opt("results") {
        Some(Value::Array(items)) => items,
        _ => &[],
    }
}

// =============================================================================
// Bidirectional pagination
// =============================================================================

/// One page of a listing with `next`/`previous` links.
///
/// `T` is what entries are wrapped as: [`Sound`] for sound listings,
/// [`Pack`](crate::Pack) for pack listings, [`FreesoundObject`] for the
/// rest (comments, bookmark categories).
///
/// ```ignore
/// let mut page = client.text_search(QueryParams::new().param("query", "cat")).await?;
/// loop {
///     for sound in page.iter() {
///         println!("{}", sound?.name()?);
///     }
///     if page.next_uri().is_none() {
///         break;
///     }
///     page = page.next_page().await?;
/// }
/// ```
pub struct Pager<T = Sound> {
    page: FreesoundObject,
    count: Option<u64>,
    next: Option<String>,
    previous: Option<String>,
    _item: PhantomData<fn() -> T>,
}

impl<T: FromObject + Send> Pager<T> {
    /// Total number of matches across all pages, when the server sends it.
    pub fn count(&self) -> Option<u64> {
        self.count
    }

    pub fn next_uri(&self) -> Option<&str> {
        self.next.as_deref()
    }

    pub fn previous_uri(&self) -> Option<&str> {
        self.previous.as_deref()
    }

    /// Fetch the next page.
    ///
    /// Fails with [`FreesoundError::NoMorePages`] on the last page, without
    /// touching the network.
    pub async fn next_page(&self) -> Result<Self> {
        let uri = self.next.as_deref().ok_or(FreesoundError::NoMorePages)?;
        debug!(uri = %uri, "Fetching next page");
        Self::fetch(self.page.client(), uri, &QueryParams::new()).await
    }

    /// Fetch the previous page.
    ///
    /// Fails with [`FreesoundError::AtFirstPage`] on the first page, without
    /// touching the network.
    pub async fn previous_page(&self) -> Result<Self> {
        let uri = self.previous.as_deref().ok_or(FreesoundError::AtFirstPage)?;
        debug!(uri = %uri, "Fetching previous page");
        Self::fetch(self.page.client(), uri, &QueryParams::new()).await
    }

    /// Entries of this page, wrapped, in server order.
    pub fn iter(&self) -> impl Iterator<Item = Result<T>> + '_ {
        page_results(&self.page)
            .iter()
            .map(move |entry| wrap_entry(entry, self.page.client()))
    }
}

impl<T> FromObject for Pager<T> {
    fn from_object(page: FreesoundObject) -> Result<Self> {
        check_results(&page)?;
        Ok(Self {
            count: match page.get_opt("count") {
                None | Some(Value::Null) => None,
                Some(value) => Some(value.as_u64().ok_or_else(|| {
                    FreesoundError::parse("page `count` should be an unsigned integer")
                })?),
            },
            next: optional_link(&page, "next")?,
            previous: optional_link(&page, "previous")?,
            page,
            _item: PhantomData,
        })
    }
}

#[async_trait]
impl<T: FromObject + Send> Paginated for Pager<T> {
    type Item = T;

    fn page(&self) -> &FreesoundObject {
        &self.page
    }

    fn results(&self) -> &[Value] {
        page_results(&self.page)
    }

    fn following_uri(&self) -> Option<&str> {
        self.next_uri()
    }

    async fn advance(&self) -> Result<Self> {
        self.next_page().await
    }
}

impl<T> Clone for Pager<T> {
    fn clone(&self) -> Self {
        Self {
            page: self.page.clone(),
            count: self.count,
            next: self.next.clone(),
            previous: self.previous.clone(),
            _item: PhantomData,
        }
    }
}

impl<T> PartialEq for Pager<T> {
    fn eq(&self, other: &Self) -> bool {
        self.page == other.page
    }
}

impl<T> fmt::Debug for Pager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pager")
            .field("results", &page_results(&self.page).len())
            .field("count", &self.count)
            .field("next", &self.next)
            .field("previous", &self.previous)
            .finish()
    }
}

// =============================================================================
// Combined search pagination
// =============================================================================

/// Results of a combined (text + content) search.
///
/// There is no total count and page sizes are not guaranteed. Advance with
/// [`more`](Self::more) until [`more_uri`](Self::more_uri) is `None`.
#[derive(Clone, PartialEq)]
pub struct CombinedSearchPager {
    page: FreesoundObject,
    more: Option<String>,
}

impl CombinedSearchPager {
    pub fn more_uri(&self) -> Option<&str> {
        self.more.as_deref()
    }

    /// Fetch more results.
    ///
    /// Fails with [`FreesoundError::ResultsExhausted`] once the server stops
    /// sending a `more` link, without touching the network.
    pub async fn more(&self) -> Result<Self> {
        let uri = self.more.as_deref().ok_or(FreesoundError::ResultsExhausted)?;
        debug!(uri = %uri, "Fetching more results");
        Self::fetch(self.page.client(), uri, &QueryParams::new()).await
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<Sound>> + '_ {
        page_results(&self.page)
            .iter()
            .map(move |entry| wrap_entry(entry, self.page.client()))
    }
}

impl FromObject for CombinedSearchPager {
    fn from_object(page: FreesoundObject) -> Result<Self> {
        check_results(&page)?;
        Ok(Self {
            more: optional_link(&page, "more")?,
            page,
        })
    }
}

#[async_trait]
impl Paginated for CombinedSearchPager {
    type Item = Sound;

    fn page(&self) -> &FreesoundObject {
        &self.page
    }

    fn results(&self) -> &[Value] {
        page_results(&self.page)
    }

    fn following_uri(&self) -> Option<&str> {
        self.more_uri()
    }

    async fn advance(&self) -> Result<Self> {
        self.more().await
    }
}

impl fmt::Debug for CombinedSearchPager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombinedSearchPager")
            .field("results", &page_results(&self.page).len())
            .field("more", &self.more)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClientConfig;
    use serde_json::json;

    fn client() -> FreesoundClient {
        FreesoundClient::new(ClientConfig::with_api_key("test")).expect("valid config")
    }

    fn pager(value: Value) -> Result<Pager<FreesoundObject>> {
        Pager::from_object(FreesoundObject::from_value(value, client())?)
    }

    #[test]
    fn test_page_fields() {
        let page = pager(json!({
            "count": 42,
            "next": "https://freesound.org/apiv2/search/text/?page=2",
            "previous": null,
            "results": [{"id": 1}, {"id": 2}]
        }))
        .unwrap();

        assert_eq!(page.count(), Some(42));
        assert_eq!(
            page.next_uri(),
            Some("https://freesound.org/apiv2/search/text/?page=2")
        );
        assert_eq!(page.previous_uri(), None);
        assert_eq!(page.len(), 2);
        assert_eq!(page.get(1).unwrap().u64("id").unwrap(), 2);
    }

    #[test]
    fn test_count_is_optional() {
        let page = pager(json!({"results": []})).unwrap();
        assert_eq!(page.count(), None);
        assert!(page.is_empty());
    }

    #[test]
    fn test_index_out_of_range() {
        let page = pager(json!({"results": [{"id": 1}]})).unwrap();
        match page.get(1) {
            Err(FreesoundError::IndexOutOfRange { index, len }) => {
                assert_eq!((index, len), (1, 1));
            }
            other => panic!("Expected IndexOutOfRange, got: {:?}", other),
        }
    }

    #[test]
    fn test_index_zero_of_empty_page() {
        let page = pager(json!({"count": 0, "results": []})).unwrap();
        assert!(matches!(
            page.get(0),
            Err(FreesoundError::IndexOutOfRange { index: 0, len: 0 })
        ));
        assert!(page.current_page().unwrap().is_empty());
    }

    #[test]
    fn test_missing_results_is_parse_error() {
        assert!(matches!(
            pager(json!({"count": 3})),
            Err(FreesoundError::Parse(_))
        ));
        assert!(matches!(
            pager(json!({"results": {"id": 1}})),
            Err(FreesoundError::Parse(_))
        ));
        assert!(matches!(
            pager(json!({"results": [], "next": 5})),
            Err(FreesoundError::Parse(_))
        ));
    }

    #[test]
    fn test_non_object_entry_fails_on_access() {
        let page = pager(json!({"results": [{"id": 1}, "oops"]})).unwrap();
        assert!(page.get(0).is_ok());
        assert!(matches!(page.get(1), Err(FreesoundError::Parse(_))));
        assert!(page.current_page().is_err());
    }

    #[tokio::test]
    async fn test_boundaries_fail_without_network() {
        // The base URL is unroutable; any request would fail with Request.
        let client = FreesoundClient::new(
            ClientConfig::with_api_key("test").with_base_url("http://127.0.0.1:9"),
        )
        .unwrap();
        let page: Pager<FreesoundObject> = Pager::from_object(
            FreesoundObject::from_value(json!({"results": []}), client.clone()).unwrap(),
        )
        .unwrap();

        assert!(matches!(page.next_page().await, Err(FreesoundError::NoMorePages)));
        assert!(matches!(page.previous_page().await, Err(FreesoundError::AtFirstPage)));

        let combined = CombinedSearchPager::from_object(
            FreesoundObject::from_value(json!({"results": [], "more": null}), client).unwrap(),
        )
        .unwrap();
        assert!(matches!(combined.more().await, Err(FreesoundError::ResultsExhausted)));
    }

    #[test]
    fn test_results_borrowed_from_page() {
        let page = pager(json!({"results": [{"id": 1}, {"id": 2}]})).unwrap();
        let Some(Value::Array(items)) = page.page().get_opt("results") else {
            panic!("page lost its results");
        };
        assert!(std::ptr::eq(page.results(), items.as_slice()));
    }

    #[tokio::test]
    async fn test_stream_of_last_page_ends_without_request() {
        let client = FreesoundClient::new(
            ClientConfig::with_api_key("test").with_base_url("http://127.0.0.1:9"),
        )
        .unwrap();
        let page: Pager<FreesoundObject> = Pager::from_object(
            FreesoundObject::from_value(
                json!({"results": [{"id": 1}, {"id": 2}], "next": null}),
                client,
            )
            .unwrap(),
        )
        .unwrap();

        let items: Vec<FreesoundObject> = into_stream(page).try_collect().await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_combined_pager_fields() {
        let page = CombinedSearchPager::from_object(
            FreesoundObject::from_value(
                json!({
                    "results": [{"id": 7, "name": "bell"}],
                    "more": "https://freesound.org/apiv2/search/combined/?cursor=abc"
                }),
                client(),
            )
            .unwrap(),
        )
        .unwrap();

        assert_eq!(
            page.more_uri(),
            Some("https://freesound.org/apiv2/search/combined/?cursor=abc")
        );
        let sounds: Vec<Sound> = page.iter().collect::<Result<_>>().unwrap();
        assert_eq!(sounds[0].name().unwrap(), "bell");
    }
}
