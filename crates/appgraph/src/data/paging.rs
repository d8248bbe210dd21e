//! Paging contract of the remote schema API

use serde::{Deserialize, Serialize};

/// Request for a single 1-based page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagingRequest {
    pub page_number: u32,
}

impl PagingRequest {
    pub fn first() -> Self {
        Self { page_number: 1 }
    }

    pub fn page(page_number: u32) -> Self {
        Self { page_number }
    }

    /// Requests for every page after the first, up to and including `total_pages`.
    pub fn remaining(total_pages: u32) -> impl Iterator<Item = PagingRequest> {
        (2..=total_pages).map(PagingRequest::page)
    }
}

/// One page of results. Transient: produced by the remote client and consumed
/// immediately by the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub page_number: u32,
    pub total_pages: u32,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn has_more(&self) -> bool {
        self.total_pages > 1
    }
}
