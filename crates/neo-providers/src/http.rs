use anyhow::Context;
use neo_core::error::NeoError;
use neo_core::feed::FeedTransport;
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::time::Duration;

const BODY_SNIPPET_CHARS: usize = 200;

pub(crate) fn build_client(timeout: Duration) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("neo-sync/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("build http client")
}

/// Blocking GET transport for the NEO feed.
pub struct HttpFeedTransport {
    client: Client,
}

impl HttpFeedTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }
}

impl FeedTransport for HttpFeedTransport {
    fn get_json(&self, url: &str, query: &[(String, String)]) -> Result<Value, NeoError> {
        let url = Url::parse(url)
            .map_err(|err| NeoError::Fatal(format!("invalid feed url: {err}")))?;
        let mut builder = self.client.get(url);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        let response = builder.send().map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(NeoError::Transient(status_message(status, &body)));
        }
        let body = response.text().map_err(transport_error)?;
        serde_json::from_str(&body)
            .map_err(|err| NeoError::Malformed(format!("response body is not JSON: {err}")))
    }
}

/// Connection failures, timeouts and body read errors are transient. A request
/// that could not be built will never succeed and is fatal.
/// The URL is dropped from the message since it may carry credentials.
pub(crate) fn transport_error(err: reqwest::Error) -> NeoError {
    if err.is_builder() {
        return NeoError::Fatal(format!("invalid request: {}", err.without_url()));
    }
    let kind = if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connect"
    } else if err.is_body() || err.is_decode() {
        "body"
    } else {
        "request"
    };
    NeoError::Transient(format!("{kind} error: {}", err.without_url()))
}

pub(crate) fn status_message(status: StatusCode, body: &str) -> String {
    let snippet: String = body.trim().chars().take(BODY_SNIPPET_CHARS).collect();
    if snippet.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {snippet}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use neo_core::feed::Fetcher;
    use neo_core::model::FeedPage;
    use neo_core::retry::{Backoff, RetryPolicy, Sleep};
    use serde_json::json;
    use std::cell::Cell;

    struct NoSleep;

    impl Sleep for NoSleep {
        fn sleep(&self, _delay: Duration) {}
    }

    #[derive(Default)]
    struct CountingSleep(Cell<u32>);

    impl Sleep for CountingSleep {
        fn sleep(&self, _delay: Duration) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn transport() -> HttpFeedTransport {
        HttpFeedTransport::new(Duration::from_secs(5)).unwrap()
    }

    fn query() -> Vec<(String, String)> {
        vec![
            ("start_date".to_string(), "2024-03-01".to_string()),
            ("end_date".to_string(), "2024-03-08".to_string()),
            ("api_key".to_string(), "DEMO_KEY".to_string()),
        ]
    }

    #[test]
    fn sends_query_parameters_and_parses_json() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/neo/rest/v1/feed")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("start_date".into(), "2024-03-01".into()),
                Matcher::UrlEncoded("end_date".into(), "2024-03-08".into()),
                Matcher::UrlEncoded("api_key".into(), "DEMO_KEY".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"element_count": 0, "near_earth_objects": {}}).to_string())
            .create();

        let url = format!("{}/neo/rest/v1/feed", server.url());
        let value = transport().get_json(&url, &query()).unwrap();

        assert_eq!(value["element_count"], 0);
        mock.assert();
    }

    #[test]
    fn non_success_status_is_transient() {
        let mut server = Server::new();
        let _mock = server
            .mock("GET", "/feed")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body("{\"error_message\": \"Date Format Exception\"}")
            .create();

        let err = transport()
            .get_json(&format!("{}/feed", server.url()), &query())
            .unwrap_err();

        match err {
            NeoError::Transient(message) => {
                assert!(message.contains("400"));
                assert!(message.contains("Date Format Exception"));
            }
            other => panic!("expected transient error, got {other:?}"),
        }
    }

    #[test]
    fn invalid_json_is_malformed() {
        let mut server = Server::new();
        let _mock = server
            .mock("GET", "/feed")
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create();

        let err = transport()
            .get_json(&format!("{}/feed", server.url()), &[])
            .unwrap_err();
        assert!(matches!(err, NeoError::Malformed(_)));
    }

    #[test]
    fn unparseable_urls_are_fatal() {
        for url in ["not a url", "/neo/rest/v1/feed?page=2", ""] {
            let err = transport().get_json(url, &[]).unwrap_err();
            assert!(
                matches!(&err, NeoError::Fatal(message) if message.contains("invalid feed url")),
                "{url:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn unsupported_scheme_is_fatal() {
        let err = transport()
            .get_json("ftp://127.0.0.1/feed", &[])
            .unwrap_err();
        assert!(matches!(err, NeoError::Fatal(message) if message.starts_with("invalid request")));
    }

    #[test]
    fn bad_next_link_is_not_retried() {
        let mut server = Server::new();
        let first = server
            .mock("GET", "/feed")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                json!({
                    "links": {"next": "feed?page=2&api_key=DEMO_KEY"},
                    "near_earth_objects": {"2024-03-01": [{"id": "1"}]}
                })
                .to_string(),
            )
            .expect(1)
            .create();

        let sleeper = CountingSleep::default();
        let fetcher = Fetcher::new(transport(), RetryPolicy::fetch_default(), &sleeper);
        let mut pages = fetcher.paginate(&format!("{}/feed", server.url()), &query());

        assert!(pages.next().unwrap().is_ok());
        assert!(matches!(pages.next().unwrap(), Err(NeoError::Fatal(_))));
        assert!(pages.next().is_none());
        assert_eq!(sleeper.0.get(), 0);
        first.assert();
    }

    #[test]
    fn refused_connection_is_transient() {
        let err = transport()
            .get_json("http://127.0.0.1:1/feed", &[])
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn paginates_across_chained_next_links() {
        let mut server = Server::new();
        let base = server.url();
        let first = server
            .mock("GET", "/feed")
            .match_query(Matcher::UrlEncoded("start_date".into(), "2024-03-01".into()))
            .with_status(200)
            .with_body(
                json!({
                    "links": {"next": format!("{base}/feed?page=2&api_key=DEMO_KEY")},
                    "near_earth_objects": {"2024-03-01": [{"id": "1"}]}
                })
                .to_string(),
            )
            .create();
        let second = server
            .mock("GET", "/feed")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(200)
            .with_body(
                json!({
                    "links": {"next": format!("{base}/feed?page=3&api_key=DEMO_KEY")},
                    "near_earth_objects": {"2024-03-02": [{"id": "2"}]}
                })
                .to_string(),
            )
            .create();
        let third = server
            .mock("GET", "/feed")
            .match_query(Matcher::UrlEncoded("page".into(), "3".into()))
            .with_status(200)
            .with_body(json!({"near_earth_objects": {"2024-03-03": [{"id": "3"}]}}).to_string())
            .create();

        let policy = RetryPolicy {
            max_attempts: 1,
            backoff: Backoff::Doubling { base_secs: 0 },
        };
        let fetcher = Fetcher::new(transport(), policy, &NoSleep);
        let pages: Vec<FeedPage> = fetcher
            .paginate(&format!("{base}/feed"), &query())
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(pages.len(), 3);
        first.assert();
        second.assert();
        third.assert();
    }
}
