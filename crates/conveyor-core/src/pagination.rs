//! Pagination and sorting for list operations.

use crate::validation::FieldErrors;
use serde::{Deserialize, Serialize};

/// Sort keys accepted by the job search endpoint. A leading `-` sorts
/// descending.
pub const JOB_SORT_SAFELIST: [&str; 10] = [
    "id",
    "task",
    "run_at",
    "status",
    "created_at",
    "-id",
    "-task",
    "-run_at",
    "-status",
    "-created_at",
];

/// Requested page, size and sort order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageParams {
    pub page: u32,
    pub page_size: u32,
    pub sort_by: String,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            sort_by: "-created_at".to_string(),
        }
    }
}

impl PageParams {
    /// Records validation errors for out-of-range or non-whitelisted values.
    pub fn validate(&self, errors: &mut FieldErrors) {
        errors.check(self.page > 0, "page", "must be greater than zero");
        errors.check(
            self.page <= 10_000_000,
            "page",
            "must be a maximum of 10 million",
        );
        errors.check(self.page_size > 0, "page_size", "must be greater than zero");
        errors.check(
            self.page_size <= 100,
            "page_size",
            "must be a maximum of 100",
        );
        errors.check(
            JOB_SORT_SAFELIST.contains(&self.sort_by.as_str()),
            "sort",
            "invalid sort value",
        );
    }

    /// Returns the sort column with any direction prefix stripped.
    ///
    /// Values outside the safelist fall back to `created_at`; callers are
    /// expected to have run [`PageParams::validate`] first.
    #[must_use]
    pub fn sort_column(&self) -> &str {
        if JOB_SORT_SAFELIST.contains(&self.sort_by.as_str()) {
            self.sort_by.trim_start_matches('-')
        } else {
            "created_at"
        }
    }

    /// Returns true if the sort order is descending.
    #[must_use]
    pub fn sort_descending(&self) -> bool {
        self.sort_by.starts_with('-')
    }

    /// Row limit for the backing query.
    #[must_use]
    pub const fn limit(&self) -> i64 {
        self.page_size as i64
    }

    /// Row offset for the backing query.
    #[must_use]
    pub const fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }
}

/// Metadata describing one page of results.
///
/// An empty result set serialises as an empty object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    #[serde(skip_serializing_if = "is_zero_u32", default)]
    pub current_page: u32,
    #[serde(skip_serializing_if = "is_zero_u32", default)]
    pub page_size: u32,
    #[serde(skip_serializing_if = "is_zero_u32", default)]
    pub first_page: u32,
    #[serde(skip_serializing_if = "is_zero_u32", default)]
    pub last_page: u32,
    #[serde(skip_serializing_if = "is_zero_u64", default)]
    pub total_records: u64,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero_u32(n: &u32) -> bool {
    *n == 0
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero_u64(n: &u64) -> bool {
    *n == 0
}

impl PageMetadata {
    /// Builds metadata for a result set.
    #[must_use]
    pub fn new(total_records: u64, page: u32, page_size: u32) -> Self {
        if total_records == 0 {
            return Self::default();
        }

        Self {
            current_page: page,
            page_size,
            first_page: 1,
            last_page: ((total_records + u64::from(page_size) - 1) / u64::from(page_size)) as u32,
            total_records,
        }
    }
}

/// One page of results with its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub metadata: PageMetadata,
}

impl<T> Page<T> {
    /// Creates a page from items and the total count across all pages.
    #[must_use]
    pub fn new(items: Vec<T>, total_records: u64, params: &PageParams) -> Self {
        Self {
            items,
            metadata: PageMetadata::new(total_records, params.page, params.page_size),
        }
    }

    /// Creates an empty page.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            metadata: PageMetadata::default(),
        }
    }
}
