//! Operation options and pagination.

use serde::{Deserialize, Serialize};

/// Options a caller passes with get/search operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOptions {
    /// Attributes to return. `None` means the defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes_to_get: Option<Vec<String>>,

    /// Also return default attributes when `attributes_to_get` is set.
    #[serde(default)]
    pub return_default_attributes: bool,

    /// Requested page size. `None` means "everything".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,

    /// 1-based offset of the first result of the requested page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paged_results_offset: Option<u32>,

    /// Allow multi-valued attributes to be returned without their values.
    #[serde(default)]
    pub allow_partial_attribute_values: bool,
}

impl OperationOptions {
    /// Create options requesting the default attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request specific attributes.
    #[must_use]
    pub fn with_attributes_to_get<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes_to_get = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Also return default attributes.
    #[must_use]
    pub fn with_default_attributes(mut self) -> Self {
        self.return_default_attributes = true;
        self
    }

    /// Request a single page.
    #[must_use]
    pub fn with_page(mut self, page_size: u32, offset: u32) -> Self {
        self.page_size = Some(page_size);
        self.paged_results_offset = Some(offset);
        self
    }

    /// Allow partial attribute values.
    #[must_use]
    pub fn with_partial_attribute_values(mut self) -> Self {
        self.allow_partial_attribute_values = true;
        self
    }

    /// Build the page request handed to the transport.
    ///
    /// A requested page size of zero falls back to `default_page_size`.
    pub fn page_request(&self, default_page_size: u32) -> PageRequest {
        match self.page_size {
            Some(page_size) => PageRequest::single(
                if page_size == 0 { default_page_size } else { page_size },
                self.paged_results_offset.unwrap_or(1),
            ),
            None => PageRequest::all(default_page_size),
        }
    }
}

/// Pagination request handed to a vendor client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based index of the first result.
    pub offset: u32,

    /// Maximum number of results per vendor page.
    pub page_size: u32,

    /// Fetch only the page at `offset` instead of walking every page.
    pub single_page: bool,
}

impl PageRequest {
    /// Walk every page starting at the first result.
    pub fn all(page_size: u32) -> Self {
        Self {
            offset: 1,
            page_size,
            single_page: false,
        }
    }

    /// Fetch a single page.
    pub fn single(page_size: u32, offset: u32) -> Self {
        Self {
            offset: offset.max(1),
            page_size,
            single_page: true,
        }
    }
}

/// Summary returned once a search has delivered its results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Total number of matching objects reported by the target, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,

    /// Results left after the requested page, when a page was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_paged_results: Option<u64>,

    /// Whether the search ran to completion.
    pub all_results_returned: bool,
}

impl SearchResult {
    /// Build the summary for a search that returned `total` objects.
    pub fn from_total(total: u64, page: &PageRequest) -> Self {
        let remaining = page.single_page.then(|| {
            let consumed = u64::from(page.offset.saturating_sub(1)) + u64::from(page.page_size);
            total.saturating_sub(consumed)
        });
        Self {
            total_count: Some(total),
            remaining_paged_results: remaining,
            all_results_returned: true,
        }
    }
}
