use crate::error::Result;
use crate::storage::pagination::{ContinuationToken, ListPage, PageSource};
use futures::stream::TryStreamExt;
use opendal::Operator;

/// Page source backed by an OpenDAL listing.
///
/// The first request opens a recursive listing under `prefix` with a per-request
/// limit of `page_size`; OpenDAL follows the provider's continuation token
/// while the stream is drained. Each call to [`PageSource::fetch_page`] takes
/// the next `page_size` object keys from that stream. The token handed out is
/// the last key of a full page, which a fresh lister resumes from as the
/// provider's `start-after` cursor.
pub struct OpenDalLister {
    operator: Operator,
    prefix: String,
    page_size: usize,
    stream: Option<opendal::Lister>,
    exhausted: bool,
}

impl OpenDalLister {
    /// Create a new lister with the given OpenDAL operator.
    pub fn new(operator: Operator, prefix: impl Into<String>, page_size: usize) -> Self {
        Self {
            operator,
            prefix: prefix.into(),
            page_size,
            stream: None,
            exhausted: false,
        }
    }
}

/// Open a recursive listing under `prefix`, resuming after `token` when given.
async fn open_lister(
    operator: &Operator,
    prefix: &str,
    page_size: usize,
    token: Option<&ContinuationToken>,
) -> Result<opendal::Lister> {
    let capability = operator.info().full_capability();

    let mut lister = operator.lister_with(prefix).recursive(true);
    if capability.list_with_limit {
        lister = lister.limit(page_size);
    }
    if let Some(token) = token {
        if !capability.list_with_start_after {
            return Err(opendal::Error::new(
                opendal::ErrorKind::Unsupported,
                "service cannot resume a listing from a continuation token",
            )
            .with_context("token", token.as_str())
            .into());
        }
        lister = lister.start_after(token.as_str());
    }

    Ok(lister.await?)
}

impl PageSource for OpenDalLister {
    async fn fetch_page(&mut self, token: Option<&ContinuationToken>) -> Result<ListPage> {
        if self.exhausted {
            return Ok(ListPage::default());
        }
        if self.stream.is_none() {
            let stream = open_lister(&self.operator, &self.prefix, self.page_size, token).await?;
            self.stream = Some(stream);
        }
        let Some(stream) = self.stream.as_mut() else {
            return Ok(ListPage::default());
        };

        let mut keys = Vec::with_capacity(self.page_size);
        while keys.len() < self.page_size {
            match stream.try_next().await? {
                // Directory placeholders are not objects.
                Some(entry) if entry.metadata().mode().is_file() => {
                    keys.push(entry.path().to_string());
                }
                Some(_) => {}
                None => {
                    self.exhausted = true;
                    break;
                }
            }
        }

        let next_token = if self.exhausted {
            self.stream = None;
            None
        } else {
            keys.last().map(|key| ContinuationToken::new(key.as_str()))
        };

        log::debug!(
            "list page prefix={} keys={} more={}",
            self.prefix,
            keys.len(),
            next_token.is_some()
        );
        Ok(ListPage { keys, next_token })
    }
}
