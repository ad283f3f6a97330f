//! Continuation-token pagination shared by every listing source.
//!
//! A listing is a sequence of page requests. Each page carries the keys it
//! returned and, when more keys remain, an opaque token that must be handed
//! back on the next request. [`collect_pages`] drives that loop until the
//! source stops reporting a token.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Opaque cursor used to resume a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One response unit of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListPage {
    pub keys: Vec<String>,
    pub next_token: Option<ContinuationToken>,
}

impl ListPage {
    pub fn is_last(&self) -> bool {
        self.next_token.is_none()
    }
}

/// A source of listing pages.
pub trait PageSource {
    /// Fetch the page that follows `token`, or the first page when `token` is `None`.
    fn fetch_page(
        &mut self,
        token: Option<&ContinuationToken>,
    ) -> impl Future<Output = Result<ListPage>> + Send;
}

/// A listing that stopped on a failed page request.
#[derive(Debug)]
pub struct PageFailure {
    /// Keys accumulated from the pages that succeeded before the failure.
    pub partial_keys: Vec<String>,
    pub source: Error,
}

/// Request pages from `source` until it reports no continuation token and
/// return every key in the order the pages delivered them.
pub async fn collect_pages<S: PageSource>(
    source: &mut S,
) -> std::result::Result<Vec<String>, PageFailure> {
    let mut keys = Vec::new();
    let mut token: Option<ContinuationToken> = None;
    let mut pages = 0usize;

    loop {
        let page = match source.fetch_page(token.as_ref()).await {
            Ok(page) => page,
            Err(err) => {
                log::debug!(
                    "page request {} failed after {} key(s)",
                    pages + 1,
                    keys.len()
                );
                return Err(PageFailure {
                    partial_keys: keys,
                    source: err,
                });
            }
        };
        pages += 1;
        keys.extend(page.keys);

        match page.next_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    log::debug!("collected {} key(s) over {pages} page(s)", keys.len());
    Ok(keys)
}
