//! Shared types and paging infrastructure for the YouTube API client.

use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use tokio_stream::{Stream, StreamExt};

/// Largest `maxResults` the YouTube list endpoints accept.
pub const MAX_PAGE_SIZE: u32 = 50;

/// Response envelope shared by every `*.list` call.
///
/// See: <https://developers.google.com/youtube/v3/docs/playlistItems/list#response>
#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse<T> {
    /// Identifies the API resource's type, e.g. `youtube#playlistItemListResponse`.
    #[serde(default)]
    pub kind: String,
    /// The resources matching the request, in API order.
    #[serde(default = "VecDeque::new")]
    pub items: VecDeque<T>,
    #[serde(rename = "pageInfo", default)]
    pub page_info: PageInfo,
    /// Token that can be used as the value of the pageToken parameter to retrieve the next
    /// page in the result set.
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

/// Paging details for lists of resources.
///
/// See: <https://developers.google.com/youtube/v3/docs/pageInfo>
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PageInfo {
    /// The total number of results in the result set.
    #[serde(rename = "totalResults")]
    pub total_results: u32,
    /// The number of results included in the API response.
    #[serde(rename = "resultsPerPage")]
    pub results_per_page: u32,
}

/// One page of a paginated listing, positioned within the whole collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Absolute index of the first item on this page.
    pub start: u64,
    /// Total reported by the API for the whole collection.
    pub total_results: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    /// One past the absolute index of the last item on this page.
    pub fn end(&self) -> u64 {
        self.start + self.items.len() as u64
    }

    pub fn contains(&self, index: u64) -> bool {
        (self.start..self.end()).contains(&index)
    }

    pub fn item_at(&self, index: u64) -> Option<&T> {
        if !self.contains(index) {
            return None;
        }
        self.items.get((index - self.start) as usize)
    }

    pub fn is_last(&self) -> bool {
        self.next_page_token.is_none()
    }
}

/// Where a walk over a paginated listing should stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopAt {
    /// Stop at the page holding this absolute item index.
    Index(u64),
    /// Follow continuation tokens until the final page.
    Exhausted,
}

type OneFuturePage<'a, F, T> =
    Pin<Box<dyn Future<Output = Result<(F, ListResponse<T>), CatalogError>> + 'a + Send>>;

/// A lazy stream of pages from a YouTube API list endpoint.
///
/// Nothing is requested until the stream is first polled, and each following page is only
/// requested once the previous one has been yielded, so dropping the stream early stops the
/// walk. Every stream starts from the first page: restarting a walk means building a new
/// stream. Only supports forward pagination (no previous page support).
pub struct PagedStream<'a, T, F> {
    /// Future representing the currently pending API request, if any
    pending_request: Option<OneFuturePage<'a, F, T>>,
    /// Items yielded so far, i.e. the absolute index of the next page's first item
    consumed: u64,
}

impl<'a, T, F> PagedStream<'a, T, F> {
    /// Create a new PagedStream that calls `fetcher` with each continuation token in turn.
    pub fn new<Fut>(fetcher: F) -> Self
    where
        F: Fn(Option<String>) -> Fut,
        F: Send + 'a,
        Fut: Future<Output = Result<ListResponse<T>, CatalogError>> + Send + 'a,
    {
        let first_page = async move {
            let results = fetcher(None).await?;
            Ok((fetcher, results))
        };
        Self {
            pending_request: Some(Box::pin(first_page)),
            consumed: 0,
        }
    }
}

impl<'a, T, F> Unpin for PagedStream<'a, T, F> {}

impl<'a, T, F, Fut> Stream for PagedStream<'a, T, F>
where
    F: Fn(Option<String>) -> Fut,
    F: Send + 'a,
    Fut: Future<Output = Result<ListResponse<T>, CatalogError>> + Send + 'a,
{
    type Item = Result<Page<T>, CatalogError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        let Some(pending) = self.pending_request.as_mut() else {
            // The last page has been yielded, or a request failed
            return Poll::Ready(None);
        };

        match pending.as_mut().poll(cx) {
            Poll::Ready(Ok((fetcher, response))) => {
                let page = Page {
                    start: self.consumed,
                    total_results: response.page_info.total_results,
                    next_page_token: response.next_page_token,
                    items: Vec::from(response.items),
                };
                self.consumed = page.end();

                if let Some(next_token) = page.next_page_token.clone() {
                    // Set up the future for the next page (but don't poll it yet)
                    self.pending_request = Some(Box::pin(async move {
                        let results = fetcher(Some(next_token)).await?;
                        Ok((fetcher, results))
                    }));
                } else {
                    self.pending_request = None;
                }

                Poll::Ready(Some(Ok(page)))
            }
            Poll::Ready(Err(e)) => {
                self.pending_request = None;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Walks `pages` until the stopping policy is satisfied and returns the page it stopped on.
///
/// With [`StopAt::Index`], no page past the one holding the index is ever requested. Running
/// out of pages first is an [`CatalogError::ExhaustedPagination`].
pub async fn settle<T, S>(pages: S, stop: StopAt, parent_id: &str) -> Result<Page<T>, CatalogError>
where
    S: Stream<Item = Result<Page<T>, CatalogError>>,
{
    let mut pages = std::pin::pin!(pages);
    let mut last = None;
    while let Some(page) = pages.next().await {
        let page = page?;
        if let StopAt::Index(target) = stop {
            if page.contains(target) {
                return Ok(page);
            }
        }
        last = Some(page);
    }

    match (stop, last) {
        (StopAt::Exhausted, Some(page)) => Ok(page),
        (StopAt::Exhausted, None) => Err(CatalogError::ExhaustedPagination {
            parent_id: parent_id.to_string(),
            target: 0,
            consumed: 0,
        }),
        (StopAt::Index(target), last) => Err(CatalogError::ExhaustedPagination {
            parent_id: parent_id.to_string(),
            target,
            consumed: last.map(|page| page.end()).unwrap_or(0),
        }),
    }
}
