//! Loader back-end tests for the HTTP paths.

use httpmock::prelude::*;
use url::Url;

use ragline::ingestion::{SourceDescriptor, load};
use ragline::types::RagError;

#[tokio::test]
async fn remote_text_becomes_one_document() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/notes.txt");
            then.status(200).body("remote content here");
        })
        .await;

    let url = Url::parse(&server.url("/notes.txt")).unwrap();
    let docs = load(&reqwest::Client::new(), &SourceDescriptor::remote_text(url.clone()))
        .await
        .unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].source_id, url.to_string());
    assert_eq!(docs[0].raw_text, "remote content here");
}

#[tokio::test]
async fn empty_remote_source_yields_no_documents() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/blank.txt");
            then.status(200).body("   \n ");
        })
        .await;

    let url = Url::parse(&server.url("/blank.txt")).unwrap();
    let docs = load(&reqwest::Client::new(), &SourceDescriptor::remote_text(url))
        .await
        .unwrap();
    assert!(docs.is_empty());
}

#[tokio::test]
async fn http_error_is_a_load_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/gone.txt");
            then.status(404);
        })
        .await;

    let url = Url::parse(&server.url("/gone.txt")).unwrap();
    let err = load(&reqwest::Client::new(), &SourceDescriptor::remote_text(url))
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::Load { .. }));
}

#[tokio::test]
async fn transcript_endpoint_is_fetched_and_stripped() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/timedtext");
            then.status(200).body(
                r#"<transcript>
                    <text start="0" dur="2">welcome to the&#39;</text>
                    <text start="2" dur="2">video about &amp; stuff</text>
                </transcript>"#,
            );
        })
        .await;

    let url = Url::parse(&server.url("/timedtext")).unwrap();
    let docs = load(&reqwest::Client::new(), &SourceDescriptor::Transcript { url })
        .await
        .unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].raw_text, "welcome to the' video about & stuff");
}
