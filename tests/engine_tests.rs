//! HTTP-level engine tests against a mock server.

use citeflow::models::FragmentType;
use citeflow::sources::crossref::CrossrefEngine;
use citeflow::sources::{Engine, EngineError};
use citeflow::utils::HttpClient;

fn search_body() -> serde_json::Value {
    serde_json::json!({
        "message": {
            "items": [
                {
                    "title": ["Social Capital in the Creation of Human Capital"],
                    "author": [{"given": "James S.", "family": "Coleman"}],
                    "issued": {"date-parts": [[1988]]},
                    "container-title": ["American Journal of Sociology"],
                    "DOI": "10.1086/228943"
                },
                {
                    "author": [{"family": "Untitled"}]
                }
            ]
        }
    })
}

#[tokio::test]
async fn search_parses_items_and_skips_malformed_ones() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/works")
        .match_query(mockito::Matcher::UrlEncoded(
            "query.bibliographic".into(),
            "Coleman 1988".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(search_body().to_string())
        .create_async()
        .await;

    let engine = CrossrefEngine::new(HttpClient::new()).with_base_url(server.url());
    let results = engine.search("Coleman 1988").await.unwrap();

    mock.assert_async().await;
    // The entry without a title is dropped, not an error.
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].authors, vec!["James S. Coleman"]);
    assert_eq!(results[0].identifiers.doi.as_deref(), Some("10.1086/228943"));
}

#[tokio::test]
async fn get_by_id_maps_404_to_none() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", mockito::Matcher::Regex(r"^/works/.*$".to_string()))
        .with_status(404)
        .create_async()
        .await;

    let engine = CrossrefEngine::new(HttpClient::new()).with_base_url(server.url());
    let result = engine
        .get_by_id(FragmentType::Doi, "10.9999/nope")
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn rate_limit_surfaces_as_rate_limit_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/works")
        .match_query(mockito::Matcher::Any)
        .with_status(429)
        .create_async()
        .await;

    let engine = CrossrefEngine::new(HttpClient::new()).with_base_url(server.url());
    let err = engine.search("anything").await.unwrap_err();
    assert!(matches!(err, EngineError::RateLimit(_)));
}

#[tokio::test]
async fn malformed_json_surfaces_as_parse_or_network_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/works")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("{not json")
        .create_async()
        .await;

    let engine = CrossrefEngine::new(HttpClient::new()).with_base_url(server.url());
    // reqwest reports body decode failures as its own error type; either
    // mapping is acceptable, what matters is that it is an Err.
    assert!(engine.search("anything").await.is_err());
}

#[tokio::test]
async fn unsupported_identifier_kind_is_rejected() {
    let engine = CrossrefEngine::new(HttpClient::new());
    let err = engine
        .get_by_id(FragmentType::Isbn, "9780140283297")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotSupported(_)));
}
