//! Drain multi-page list APIs.
//!
//! List APIs come in two flavours. Counted pages take a page number and a page
//! size, and a page shorter than the size is the last one. Token pages take an
//! opaque next token, and the last page comes back without one. Both are
//! configurations of the same [`list_all`] loop, selected by [`Pagination`].
//!
//! # Example
//!
//! ```ignore
//! use provider_waiters::pager::{list_all, Page, PageRequest, Pagination};
//!
//! let mut request = PageRequest::new(Pagination::PageNumber { page_size: 50 })
//!     .with_param("VpcId", "vpc-123");
//!
//! let vswitches = list_all(
//!     &mut request,
//!     |req| async move {
//!         let response = client.describe_vswitches(req.params()).await?;
//!         Ok(Page::new(response.vswitches))
//!     },
//!     |vsw| vsw.status == "Available",
//! )
//! .await?;
//! ```

use std::future::Future;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::Error;

/// Request key for the page number under counted pagination.
pub const PAGE_NUMBER_PARAM: &str = "PageNumber";
/// Request key for the page size under counted pagination.
pub const PAGE_SIZE_PARAM: &str = "PageSize";
/// Request key for the continuation token under token pagination.
pub const NEXT_TOKEN_PARAM: &str = "NextToken";
/// Request key for the page size under token pagination.
pub const MAX_RESULTS_PARAM: &str = "MaxResults";

/// Which pagination idiom a list API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// Page number and page size; a short page ends the listing.
    PageNumber {
        /// Items requested per page.
        page_size: u32,
    },
    /// Opaque next token; an empty or missing token ends the listing.
    NextToken {
        /// Items requested per page.
        max_results: u32,
    },
}

impl Pagination {
    /// Items requested per page.
    pub fn page_size(&self) -> u32 {
        match self {
            Self::PageNumber { page_size } => *page_size,
            Self::NextToken { max_results } => *max_results,
        }
    }
}

/// Position within a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// 1-based page number.
    Page(u32),
    /// Token for the next page; `None` on the first request.
    Token(Option<String>),
}

/// The request sent for each page. Advanced in place as pages are fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pagination: Pagination,
    cursor: Cursor,
    extra_params: Map<String, Value>,
}

impl PageRequest {
    /// Start at the first page.
    pub fn new(pagination: Pagination) -> Self {
        let cursor = match pagination {
            Pagination::PageNumber { .. } => Cursor::Page(1),
            Pagination::NextToken { .. } => Cursor::Token(None),
        };
        Self {
            pagination,
            cursor,
            extra_params: Map::new(),
        }
    }

    /// Add a request parameter that is sent with every page.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra_params.insert(key.into(), value.into());
        self
    }

    /// Jump to a page number. Has no effect under token pagination.
    pub fn at_page(mut self, page: u32) -> Self {
        if let Cursor::Page(_) = self.cursor {
            self.cursor = Cursor::Page(page.max(1));
        }
        self
    }

    /// The pagination idiom.
    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    /// Items requested per page.
    pub fn page_size(&self) -> u32 {
        self.pagination.page_size()
    }

    /// The current position.
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Parameters sent with every page.
    pub fn extra_params(&self) -> &Map<String, Value> {
        &self.extra_params
    }

    /// Render the wire parameters for the current page.
    ///
    /// Pagination keys override extra parameters of the same name. The token
    /// key is omitted on the first token request.
    pub fn params(&self) -> Map<String, Value> {
        let mut params = self.extra_params.clone();
        match &self.cursor {
            Cursor::Page(page) => {
                params.insert(PAGE_NUMBER_PARAM.to_string(), Value::from(*page));
                params.insert(PAGE_SIZE_PARAM.to_string(), Value::from(self.page_size()));
            }
            Cursor::Token(token) => {
                if let Some(token) = token {
                    params.insert(NEXT_TOKEN_PARAM.to_string(), Value::from(token.clone()));
                }
                params.insert(MAX_RESULTS_PARAM.to_string(), Value::from(self.page_size()));
            }
        }
        params
    }

    fn advance(&mut self, continuation: Continuation) {
        match continuation {
            Continuation::Token(token) => self.cursor = Cursor::Token(Some(token)),
            Continuation::PageCount { .. } => {
                if let Cursor::Page(page) = self.cursor {
                    self.cursor = Cursor::Page(page + 1);
                }
            }
        }
    }
}

/// One page returned by a list API.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items on this page, in API order.
    pub items: Vec<T>,
    /// Token for the next page, if the API uses tokens.
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    /// A page with no next token.
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }

    /// Attach the token for the next page.
    pub fn with_next_token(mut self, token: impl Into<String>) -> Self {
        self.next_token = Some(token.into());
        self
    }
}

/// What a fetched page says about the rest of the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// Token pagination: the token from the response, empty if none.
    Token(String),
    /// Counted pagination: how many items were asked for and returned.
    PageCount {
        /// Page size sent with the request.
        requested: u32,
        /// Items on the returned page.
        returned: usize,
    },
}

impl Continuation {
    /// Read the continuation off a fetched page.
    pub fn from_page<T>(pagination: Pagination, page: &Page<T>) -> Self {
        match pagination {
            Pagination::PageNumber { page_size } => Self::PageCount {
                requested: page_size,
                returned: page.items.len(),
            },
            Pagination::NextToken { .. } => {
                Self::Token(page.next_token.clone().unwrap_or_default())
            }
        }
    }

    /// Whether another page should be fetched.
    pub fn has_more(&self) -> bool {
        match self {
            Self::Token(token) => !token.is_empty(),
            Self::PageCount {
                requested,
                returned,
            } => *returned == *requested as usize,
        }
    }
}

/// Fetch every page and keep the items accepted by `predicate`.
///
/// Items keep their API order. `request` is advanced in place and is left
/// pointing at the last page fetched. Errors from `fetch` are returned
/// immediately; nothing here retries.
pub async fn list_all<T, F, Fut, P>(
    request: &mut PageRequest,
    mut fetch: F,
    mut predicate: P,
) -> Result<Vec<T>, Error>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Page<T>, Error>>,
    P: FnMut(&T) -> bool,
{
    if request.page_size() == 0 {
        return Err(Error::Configuration(
            "page size must be greater than zero".to_string(),
        ));
    }

    let mut accumulated = Vec::new();
    let mut pages = 0usize;

    loop {
        let page = fetch(request.clone()).await?;
        pages += 1;

        let continuation = Continuation::from_page(request.pagination(), &page);
        let returned = page.items.len();
        let before = accumulated.len();
        accumulated.extend(page.items.into_iter().filter(|item| predicate(item)));
        debug!(
            page = pages,
            returned,
            kept = accumulated.len() - before,
            "fetched page"
        );

        if !continuation.has_more() {
            break;
        }
        request.advance(continuation);
    }

    debug!(pages, total = accumulated.len(), "listing complete");
    Ok(accumulated)
}

/// [`list_all`] without a filter.
pub async fn list_all_unfiltered<T, F, Fut>(
    request: &mut PageRequest,
    fetch: F,
) -> Result<Vec<T>, Error>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Page<T>, Error>>,
{
    list_all(request, fetch, |_| true).await
}
