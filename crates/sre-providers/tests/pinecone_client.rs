//! Pinecone index client against a local HTTP responder.
#![cfg_attr(
    test,
    allow(
        dead_code,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::tests_outside_test_module,
        reason = "Test allows"
    )
)]

use serde_json::json;
use sre_core::{Error, SimilarityStore as _};
use sre_providers::PineconeIndex;
use sre_test_support::{StubServer, closed_url};

const DIMENSION: usize = 3;

fn index() -> PineconeIndex {
    PineconeIndex::new("pc-test".to_owned(), "chatbot".to_owned(), DIMENSION)
        .unwrap_or_else(|err| panic!("index: {err}"))
}

#[tokio::test]
async fn test_dimension_mismatch_makes_no_request() {
    let server = StubServer::respond(200, r#"{"matches": []}"#);
    let store = index().with_host(&server.base_url);

    for wrong in [vec![], vec![0.1; DIMENSION - 1], vec![0.1; DIMENSION + 1], vec![0.0; 1536]] {
        let result = store.query(&wrong, 5).await;
        assert!(
            matches!(result, Err(Error::DimensionMismatch { expected: DIMENSION, actual }) if actual == wrong.len()),
            "unexpected result for length {}: {result:?}",
            wrong.len()
        );
    }
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_dimension_mismatch_skips_host_resolution() {
    let control_plane = StubServer::respond(200, r#"{"host": "unused"}"#);
    let store = index().with_control_plane_url(control_plane.base_url.clone());

    let result = store.query(&[1.0], 5).await;
    assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
    assert!(control_plane.requests().is_empty());
}

#[tokio::test]
async fn test_query_payload_and_matches() {
    let server = StubServer::respond(
        200,
        json!({
            "matches": [
                {"id": "doc-2", "score": 0.71, "metadata": {"content": "Second", "source": "wiki"}},
                {"id": "doc-1", "score": 0.93, "metadata": {"content": "First"}}
            ],
            "namespace": "incidents"
        })
        .to_string(),
    );
    let store = index()
        .with_host(&server.base_url)
        .with_namespace("incidents".to_owned());

    let matches = store
        .query(&[0.5, 0.25, 0.0], 5)
        .await
        .unwrap_or_else(|err| panic!("query failed: {err}"));

    let ids: Vec<_> = matches.iter().map(|found| found.id.as_str()).collect();
    assert_eq!(ids, ["doc-1", "doc-2"]);
    assert_eq!(matches[1].content(), "Second");
    assert_eq!(matches[1].metadata.get("source"), Some(&json!("wiki")));

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path(), "/query");
    assert_eq!(request.header("api-key"), Some("pc-test"));
    assert_eq!(
        request.json(),
        json!({
            "vector": [0.5, 0.25, 0.0],
            "topK": 5,
            "includeValues": false,
            "includeMetadata": true,
            "namespace": "incidents"
        })
    );
}

#[tokio::test]
async fn test_empty_result_is_not_an_error() {
    let server = StubServer::respond(200, r#"{"matches": [], "namespace": ""}"#);
    let store = index().with_host(&server.base_url);
    let matches = store
        .query(&[0.0; DIMENSION], 5)
        .await
        .unwrap_or_else(|err| panic!("query failed: {err}"));
    assert!(matches.is_empty());
}

#[tokio::test]
async fn test_server_error_is_retrieval_error() {
    let server = StubServer::respond(503, r#"{"message": "unavailable"}"#);
    let store = index().with_host(&server.base_url);
    let result = store.query(&[0.0; DIMENSION], 5).await;
    let Err(Error::Retrieval(message)) = result else {
        panic!("expected retrieval error, got {result:?}");
    };
    assert!(message.contains("503"));
}

#[tokio::test]
async fn test_unreachable_host_is_retrieval_error() {
    let store = index().with_host(&format!("{}/", closed_url()));
    let result = store.query(&[0.0; DIMENSION], 5).await;
    assert!(matches!(result, Err(Error::Retrieval(_))));
}

#[tokio::test]
async fn test_host_resolved_once_through_control_plane() {
    let data_plane = StubServer::respond(
        200,
        json!({"matches": [{"id": "doc-1", "score": 0.5, "metadata": {"content": "x"}}]}).to_string(),
    );
    let control_plane = StubServer::respond(
        200,
        json!({"name": "chatbot", "dimension": DIMENSION, "host": data_plane.base_url}).to_string(),
    );

    let store = index().with_control_plane_url(control_plane.base_url.clone());
    for _ in 0..2 {
        let matches = store
            .query(&[0.0; DIMENSION], 5)
            .await
            .unwrap_or_else(|err| panic!("query failed: {err}"));
        assert_eq!(matches.len(), 1);
    }

    let describes = control_plane.requests();
    assert_eq!(describes.len(), 1);
    assert_eq!(describes[0].method, "GET");
    assert_eq!(describes[0].path(), "/indexes/chatbot");
    assert_eq!(data_plane.requests().len(), 2);
}

#[tokio::test]
async fn test_failed_host_resolution_is_retrieval_error() {
    let control_plane = StubServer::respond(404, r#"{"error": "index not found"}"#);
    let store = index().with_control_plane_url(control_plane.base_url.clone());
    let result = store.query(&[0.0; DIMENSION], 5).await;
    assert!(matches!(result, Err(Error::Retrieval(_))));
}
