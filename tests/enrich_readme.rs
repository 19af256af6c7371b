// tests/enrich_readme.rs
use serde_json::json;
use std::time::Duration;
use trend_sieve::enrich::{MetadataEnricher, ReadmeEnricher};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn enricher(server: &MockServer, token: Option<&str>) -> ReadmeEnricher {
    ReadmeEnricher::new(Duration::from_secs(5), token.map(str::to_string))
        .unwrap()
        .with_base_urls(format!("{}/raw", server.uri()), format!("{}/api", server.uri()))
}

#[tokio::test]
async fn readme_falls_back_to_later_filenames_and_license_is_lowercased() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/raw/acme/agent/HEAD/README.md"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/raw/acme/agent/HEAD/readme.md"))
        .respond_with(ResponseTemplate::new(200).set_body_string("# agent\n\n```python\nrun()\n```"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/repos/acme/agent/license"))
        .and(header("authorization", "Bearer t0ken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"license": {"spdx_id": "MIT"}})))
        .mount(&server)
        .await;

    let out = enricher(&server, Some("t0ken"))
        .fetch_many(&["acme/agent".to_string()])
        .await;
    let e = &out["acme/agent"];
    assert!(e.readme.as_deref().unwrap().starts_with("# agent"));
    assert_eq!(e.license.as_deref(), Some("mit"));
    assert!(e.is_open_source);
}

#[tokio::test]
async fn every_requested_name_gets_an_entry_even_when_everything_fails() {
    // Nothing mounted: every request answers 404.
    let server = MockServer::start().await;
    let names = vec!["a/one".to_string(), "b/two".to_string(), "c/three".to_string()];

    let out = enricher(&server, None).fetch_many(&names).await;
    assert_eq!(out.len(), 3);
    for name in &names {
        let e = &out[name];
        assert!(e.readme.is_none());
        assert!(e.license.is_none());
        assert!(!e.is_open_source);
    }
}

#[tokio::test]
async fn non_allow_listed_license_is_not_open_source() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/repos/x/y/license"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"license": {"spdx_id": "NOASSERTION"}})),
        )
        .mount(&server)
        .await;

    let e = enricher(&server, None).fetch_metadata("x/y").await;
    assert_eq!(e.license.as_deref(), Some("noassertion"));
    assert!(!e.is_open_source);
}

#[tokio::test]
async fn transport_failure_counts_as_absent() {
    // Unroutable port: connection refused.
    let e = ReadmeEnricher::new(Duration::from_millis(500), None)
        .unwrap()
        .with_base_urls("http://127.0.0.1:9", "http://127.0.0.1:9")
        .fetch_metadata("a/b")
        .await;
    assert_eq!(e, Default::default());
}
