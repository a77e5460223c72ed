use crate::error::NeoError;
use crate::model::FeedPage;
use crate::retry::{RetryPolicy, Sleep};
use serde_json::Value;
use tracing::{error, info, warn};

/// A single GET against the feed. Implementations map their failures into
/// `Transient` (connection, timeout, non-2xx), `Malformed` (body not JSON) or
/// `Fatal` (a URL no request can be built from).
pub trait FeedTransport {
    fn get_json(&self, url: &str, query: &[(String, String)]) -> Result<Value, NeoError>;
}

impl<T: FeedTransport + ?Sized> FeedTransport for &T {
    fn get_json(&self, url: &str, query: &[(String, String)]) -> Result<Value, NeoError> {
        (**self).get_json(url, query)
    }
}

pub struct Fetcher<'a, T> {
    transport: T,
    policy: RetryPolicy,
    sleeper: &'a dyn Sleep,
}

impl<'a, T: FeedTransport> Fetcher<'a, T> {
    pub fn new(transport: T, policy: RetryPolicy, sleeper: &'a dyn Sleep) -> Self {
        Self {
            transport,
            policy,
            sleeper,
        }
    }

    /// Fetches one page, retrying transient and malformed responses. The last
    /// error is returned once the attempt budget is spent.
    pub fn fetch(&self, url: &str, query: &[(String, String)]) -> Result<FeedPage, NeoError> {
        let max_attempts = self.policy.max_attempts;
        self.policy
            .run(
                self.sleeper,
                |attempt| {
                    let result = self
                        .transport
                        .get_json(url, query)
                        .and_then(FeedPage::from_value);
                    if let Err(err) = &result {
                        warn!(
                            url = %redact_query(url),
                            attempt,
                            max_attempts,
                            error = %err,
                            "feed request failed"
                        );
                    }
                    result
                },
                |err| matches!(err, NeoError::Transient(_) | NeoError::Malformed(_)),
            )
            .map_err(|failure| {
                error!(
                    url = %redact_query(url),
                    attempts = failure.attempts(),
                    "giving up on feed page"
                );
                failure.into_error()
            })
    }

    /// Lazily walks the feed starting at `url`. Follow-up requests use the
    /// server's `links.next` verbatim with no extra query parameters.
    pub fn paginate(&self, url: &str, query: &[(String, String)]) -> Pages<'_, 'a, T> {
        Pages {
            fetcher: self,
            cursor: Some(Cursor::First {
                url: url.to_string(),
                query: query.to_vec(),
            }),
        }
    }
}

enum Cursor {
    First {
        url: String,
        query: Vec<(String, String)>,
    },
    Next(String),
}

/// Iterator over feed pages. Fused after the last page or the first error.
pub struct Pages<'f, 'a, T> {
    fetcher: &'f Fetcher<'a, T>,
    cursor: Option<Cursor>,
}

impl<T: FeedTransport> Iterator for Pages<'_, '_, T> {
    type Item = Result<FeedPage, NeoError>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.take()?;
        let result = match &cursor {
            Cursor::First { url, query } => {
                info!(url = %redact_query(url), "fetching feed page");
                self.fetcher.fetch(url, query)
            }
            Cursor::Next(url) => {
                info!(url = %redact_query(url), "fetching feed page");
                self.fetcher.fetch(url, &[])
            }
        };
        if let Ok(page) = &result {
            self.cursor = page.next_link().map(|next| Cursor::Next(next.to_string()));
        }
        Some(result)
    }
}

impl<T: FeedTransport> std::iter::FusedIterator for Pages<'_, '_, T> {}

/// Hides the `api_key` parameter that next links carry.
fn redact_query(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };
    let pairs: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some(("api_key", _)) => "api_key=***".to_string(),
            _ => pair.to_string(),
        })
        .collect();
    format!("{base}?{}", pairs.join("&"))
}
