//! End-to-end tests: raw proxy responses through the full reader.

#[cfg(test)]
mod tests {
    use crate::config::{ExtractionConfig, PostProcessConfig, ReaderConfig, ScoringWeights};
    use crate::errors::{ErrorKind, ExtractError};
    use crate::fetch::{FetchResult, Fetcher, MockFetcher};
    use crate::observability::{AttemptEvent, CollectingAttemptObserver, NoOpAttemptObserver};
    use crate::pipeline::ContentPipeline;
    use crate::race::ArticleReader;
    use crate::readability::ReadabilityExtractor;
    use crate::strategy::RetrievalStrategy;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const URL: &str = "https://blog.example.com/2024/05/post.html";

    /// Returns the same body for every request and counts calls.
    struct StaticFetcher {
        body: String,
        calls: AtomicUsize,
    }

    impl StaticFetcher {
        fn new(body: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                body: body.into(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchResult, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FetchResult::ok(url, self.body.clone()))
        }
    }

    fn direct_reader(fetcher: Arc<StaticFetcher>, config: ReaderConfig) -> ArticleReader {
        let config = config.with_strategies(vec![RetrievalStrategy::direct()]);
        ArticleReader::new(config, fetcher, Arc::new(NoOpAttemptObserver)).unwrap()
    }

    fn prose(chars: usize) -> String {
        let sentence = "Static markup is all the reader ever sees. ";
        sentence.repeat(chars / sentence.len() + 1)[..chars].trim_end().to_string()
    }

    #[tokio::test]
    async fn test_nav_article_footer_page() {
        let body = prose(250);
        let page = format!(
            "<html><head><title>Post</title><script>track()</script></head><body>\
             <nav><a href=\"/\">Home</a> <a href=\"/archive\">Archive</a></nav>\
             <article><p>{body}</p></article>\
             <footer>Copyright 2024 Example Blog. All rights reserved.</footer></body></html>"
        );
        let reader = direct_reader(StaticFetcher::new(page), ReaderConfig::default());

        let html = reader.extract(URL, None, None).await.unwrap();
        assert_eq!(html, format!("<p>{body}</p>"));
        assert!(!html.contains("Archive"));
        assert!(!html.contains("Copyright"));
    }

    #[tokio::test]
    async fn test_extraction_is_byte_identical_across_runs() {
        let page = format!(
            "<body><div class=\"sidebar\"><ul><li>a</li><li>b</li></ul></div>\
             <main><h1>Title</h1><h2>Part one</h2><p>{}</p><p>See <a href=\"../other.html\">this</a>.</p>\
             <figure><img src=\"pic.jpg\"><figcaption>Caption</figcaption></figure></main></body>",
            prose(400)
        );
        let reader = direct_reader(StaticFetcher::new(page), ReaderConfig::default());

        let first = reader.extract(URL, None, None).await.unwrap();
        let second = reader.extract(URL, None, None).await.unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("<h2>Part one</h2>"));
        assert!(first.contains("href=\"https://blog.example.com/2024/other.html\""));
        assert!(!first.contains("<img"));
    }

    #[tokio::test]
    async fn test_json_error_envelope_fails_without_parsing() {
        let fetcher = StaticFetcher::new(r#"{"contents": null, "error": "Failed to fetch: 403"}"#);
        let reader = direct_reader(fetcher.clone(), ReaderConfig::default());

        let err = reader.extract(URL, None, None).await.unwrap_err();
        let ExtractError::AllAttemptsFailed { message, failures } = &err else {
            panic!("expected aggregate failure, got {err:?}");
        };
        assert_eq!(message, "Failed to fetch: 403");
        assert_eq!(failures[0].error.kind(), ErrorKind::Envelope);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reader_proxy_markdown() {
        let text = "Title: A Post\n\
                    URL Source: https://blog.example.com/2024/05/post.html\n\
                    Published Time: 2024-05-01T00:00:00Z\n\
                    \n\
                    Markdown Content:\n\
                    # A Post\n\
                    \n\
                    ## Background\n\
                    \n\
                    - first point\n\
                    - second point\n\
                    \n\
                    Details are [here](/details) and ![chart](chart.png).";
        let reader = direct_reader(StaticFetcher::new(text), ReaderConfig::default());

        let html = reader.extract(URL, None, None).await.unwrap();
        assert_eq!(
            html,
            "<h2>Background</h2><ul><li>first point</li><li>second point</li></ul>\
             <p>Details are <a href=\"https://blog.example.com/details\" rel=\"noopener noreferrer\">here</a> and .</p>"
        );
    }

    #[tokio::test]
    async fn test_legacy_table_layout() {
        let page = format!(
            "<html><body><table><tr><td width=\"150\"><a href=\"/\">Home</a></td>\
             <td width=\"435\"><p>{}</p><p>{}</p></td></tr></table></body></html>",
            prose(200),
            prose(150)
        );
        let reader = direct_reader(StaticFetcher::new(page), ReaderConfig::default());

        let html = reader.extract(URL, None, None).await.unwrap();
        assert!(html.starts_with("<p>Static markup"));
        assert!(!html.contains("Home"));
    }

    #[tokio::test]
    async fn test_em_dash_repaired_end_to_end() {
        let page = format!("<article><p>{} \u{FFFD} and more</p></article>", prose(220));
        let reader = direct_reader(StaticFetcher::new(page), ReaderConfig::default());

        let html = reader.extract(URL, None, None).await.unwrap();
        assert!(html.contains(" \u{2014} and more"));
        assert!(!html.contains('\u{FFFD}'));
    }

    #[tokio::test]
    async fn test_postprocess_can_keep_images() {
        let page = format!(
            "<article><h1>Title</h1><p>{}</p><img src=\"/a.png\" alt=\"a\"></article>",
            prose(220)
        );
        let config = ReaderConfig::default().with_postprocess(PostProcessConfig {
            strip_images: false,
            ..PostProcessConfig::default()
        });
        let reader = direct_reader(StaticFetcher::new(page), config);

        let html = reader.extract(URL, None, None).await.unwrap();
        assert!(html.ends_with("<img alt=\"a\" src=\"https://blog.example.com/a.png\">"));
        assert!(!html.contains("<h1>"));
    }

    #[test]
    fn test_injected_selectors_and_weights() {
        let page = format!(
            "<body><div class=\"story\"><p>{}</p></div><article><p>{}</p></article></body>",
            prose(210),
            prose(300)
        );

        let config = ExtractionConfig::default()
            .with_content_selectors([".story"])
            .with_weights(ScoringWeights {
                sentence: 0.0,
                ..ScoringWeights::default()
            });
        let extractor = ReadabilityExtractor::new(config).unwrap();
        let html = extractor.extract(&page, URL).unwrap();
        assert_eq!(html, format!("<p>{}</p>", prose(210)));
    }

    #[tokio::test]
    async fn test_custom_noise_selector_and_lower_bar() {
        let page = "<body><article><p>A short dispatch, but a real one.</p>\
                    <div class=\"newsletter\">Subscribe for more!</div></article></body>";
        let extraction = ExtractionConfig::default()
            .with_noise_selector(".newsletter")
            .with_min_text(20);
        let config = ReaderConfig::default().with_extraction(extraction);
        let reader = direct_reader(StaticFetcher::new(page), config);

        let html = reader.extract(URL, None, None).await.unwrap();
        assert_eq!(html, "<p>A short dispatch, but a real one.</p>");
    }

    #[test]
    fn test_pipeline_from_json_config() {
        let config = ReaderConfig::from_json_str(
            r#"{"extraction": {"min_candidate_text": 10}, "postprocess": {"sanitize": false}}"#,
        )
        .unwrap();
        let pipeline = ContentPipeline::new(&config).unwrap();

        let html = pipeline
            .process("<article><p class=\"lead\">Short but enough.</p></article>", URL)
            .unwrap();
        assert_eq!(html, "<p class=\"lead\">Short but enough.</p>");
    }

    #[tokio::test]
    async fn test_default_strategy_table_races_every_proxy() {
        let body = format!("<article><p>{}</p></article>", prose(220));
        let mut mock = MockFetcher::new();
        mock.expect_fetch().returning(move |url: &str| {
            if url.starts_with("https://r.jina.ai/") {
                Ok(FetchResult::ok(url, body.clone()))
            } else {
                Ok(FetchResult {
                    status_code: 502,
                    ..FetchResult::ok(url, "")
                })
            }
        });

        let observer = Arc::new(CollectingAttemptObserver::new());
        let reader = ArticleReader::new(ReaderConfig::default(), Arc::new(mock), observer.clone()).unwrap();
        reader.extract(URL, None, None).await.unwrap();

        let mut started = observer.started();
        started.sort();
        assert_eq!(started, vec!["allorigins", "cors.lol", "corsproxy.io", "jina-reader"]);
        assert!(observer.events().contains(&AttemptEvent::Started {
            strategy: "jina-reader".to_string(),
            proxied_url: format!("https://r.jina.ai/{URL}"),
        }));
        assert!(observer.events().contains(&AttemptEvent::Completed {
            winner: Some("jina-reader".to_string()),
        }));
    }

    #[cfg(feature = "http")]
    #[tokio::test]
    async fn test_http_fetcher_end_to_end() {
        use crate::fetch::HttpFetcher;
        use httpmock::prelude::*;

        let server = MockServer::start();
        let body = prose(260);
        let mock = server.mock(|when, then| {
            when.method(GET).path("/post");
            then.status(200)
                .header("content-type", "text/html; charset=utf-8")
                .body(format!(
                    "<html><body><header>Site</header><article><p>{body} <a href=\"/next\">next</a></p></article></body></html>"
                ));
        });

        let config = ReaderConfig::default().with_strategies(vec![RetrievalStrategy::direct()]);
        let fetcher = HttpFetcher::new(&config.fetch).unwrap();
        let reader = ArticleReader::new(config, Arc::new(fetcher), Arc::new(NoOpAttemptObserver)).unwrap();

        let html = reader.extract(&server.url("/post"), None, None).await.unwrap();
        mock.assert();
        assert!(html.starts_with("<p>Static markup"));
        assert!(html.contains(&format!("href=\"{}\"", server.url("/next"))));
    }
}
