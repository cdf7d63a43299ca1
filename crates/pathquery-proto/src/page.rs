//! Page requests and page results.

use serde::{Deserialize, Serialize};

/// Page size used when a request asks for less than one element.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// A zero-based page request.
///
/// Construction normalizes out-of-range input instead of failing: a negative
/// page becomes page 0 and a size below 1 becomes [`DEFAULT_PAGE_SIZE`].
/// Deserialized requests are normalized the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPageRequest")]
pub struct PageRequest {
    page: u64,
    size: u64,
}

/// Wire form of a page request before normalization.
#[derive(Deserialize)]
struct RawPageRequest {
    #[serde(default)]
    page: i64,
    #[serde(default)]
    size: i64,
}

impl From<RawPageRequest> for PageRequest {
    fn from(raw: RawPageRequest) -> Self {
        Self::of(raw.page, raw.size)
    }
}

impl PageRequest {
    /// Create a normalized page request.
    pub fn of(page: i64, size: i64) -> Self {
        Self {
            page: page.max(0) as u64,
            size: if size < 1 {
                DEFAULT_PAGE_SIZE
            } else {
                size as u64
            },
        }
    }

    /// First page with the given size.
    pub fn first(size: i64) -> Self {
        Self::of(0, size)
    }

    /// Zero-based page number.
    pub fn page(&self) -> u64 {
        self.page
    }

    /// Page size.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of elements before this page.
    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }

    /// Request for the following page.
    pub fn next(&self) -> Self {
        Self {
            page: self.page + 1,
            size: self.size,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of results plus the total across all pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page, in sort order.
    pub content: Vec<T>,
    /// The request that produced this page.
    pub request: PageRequest,
    /// Total number of distinct items matching the query.
    pub total_elements: u64,
}

impl<T> Page<T> {
    /// Create a page.
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        Self {
            content,
            request,
            total_elements,
        }
    }

    /// An empty page.
    pub fn empty(request: PageRequest) -> Self {
        Self::new(Vec::new(), request, 0)
    }

    /// Number of pages needed for all elements.
    pub fn total_pages(&self) -> u64 {
        self.total_elements.div_ceil(self.request.size())
    }

    /// Number of items on this page.
    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    pub fn has_next(&self) -> bool {
        self.request.page() + 1 < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.request.page() > 0
    }

    pub fn is_last(&self) -> bool {
        !self.has_next()
    }

    /// Transform the content, keeping paging metadata.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            content: self.content.into_iter().map(f).collect(),
            request: self.request,
            total_elements: self.total_elements,
        }
    }
}
