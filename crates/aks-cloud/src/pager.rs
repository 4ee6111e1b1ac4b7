//! Lazy traversal of ARM list responses.
//!
//! ARM list operations return `{"value": [...], "nextLink": "..."}`; the next
//! page is fetched by following `nextLink` until it is absent.

use crate::error::{AksError, Result};
use crate::transport::ArmTransport;
use serde::de::DeserializeOwned;
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashSet;
use std::marker::PhantomData;

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Page<T> {
    #[serde(default)]
    value: Vec<T>,
    #[serde(rename = "nextLink", default)]
    next_link: Option<String>,
}

/// Single-pass producer of result pages.
///
/// Nothing is requested until the first [`Pager::next_page`] call. Once the
/// last page has been returned, or a fetch has failed, [`Pager::more`] is
/// `false` and the pager cannot be restarted.
///
/// A `nextLink` is only followed when it has the same origin as the page that
/// returned it and has not been visited before.
pub struct Pager<'a, T> {
    transport: &'a dyn ArmTransport,
    next: Option<String>,
    visited: HashSet<String>,
    pages_fetched: usize,
    _item: PhantomData<fn() -> T>,
}

impl<'a, T: DeserializeOwned> Pager<'a, T> {
    pub fn new(transport: &'a dyn ArmTransport, first_url: String) -> Self {
        Self {
            transport,
            next: Some(first_url),
            visited: HashSet::new(),
            pages_fetched: 0,
            _item: PhantomData,
        }
    }

    /// Whether another page is available.
    pub fn more(&self) -> bool {
        self.next.is_some()
    }

    /// Number of pages fetched so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Fetch the next page.
    ///
    /// # Errors
    ///
    /// Returns [`AksError::PagerExhausted`] when called after the last page,
    /// [`AksError::InvalidNextLink`] when the page links back to a visited URL
    /// or to another origin, or the transport/decode error of the failed fetch.
    pub async fn next_page(&mut self) -> Result<Vec<T>> {
        let url = self.next.take().ok_or(AksError::PagerExhausted)?;
        self.visited.insert(url.clone());
        let body = self.transport.get_json(&url).await?;
        let page: Page<T> = serde_json::from_value(body)?;

        self.pages_fetched += 1;
        if let Some(link) = page.next_link.filter(|link| !link.is_empty()) {
            self.check_next_link(&url, &link)?;
            self.next = Some(link);
        }
        tracing::trace!(
            url = %url,
            items = page.value.len(),
            has_next = self.next.is_some(),
            "Fetched page"
        );
        Ok(page.value)
    }

    fn check_next_link(&self, current: &str, link: &str) -> Result<()> {
        if self.visited.contains(link) {
            return Err(AksError::InvalidNextLink {
                url: link.to_string(),
                reason: "page was already fetched".to_string(),
            });
        }
        let same_origin = match (Url::parse(current), Url::parse(link)) {
            (Ok(current), Ok(link)) => current.origin() == link.origin(),
            _ => false,
        };
        if !same_origin {
            return Err(AksError::InvalidNextLink {
                url: link.to_string(),
                reason: "origin differs from the listing endpoint".to_string(),
            });
        }
        Ok(())
    }
}
