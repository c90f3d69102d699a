//! Dimensions client tests: login, token refresh, iterative paging, schemas.

use serde_json::{Value, json};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scisci_mcp::DimensionsClient;
use scisci_mcp::config::Config;
use scisci_mcp::error::ClientError;
use scisci_mcp::models::DimensionsSource;

fn client(server: &MockServer) -> DimensionsClient {
    DimensionsClient::new(&Config::for_testing(&server.uri())).unwrap()
}

async fn mount_auth(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/dimensions/auth.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": token})))
        .mount(server)
        .await;
}

fn publications(total: u64, ids: &[&str]) -> Value {
    json!({
        "_stats": {"total_count": total},
        "publications": ids.iter().map(|id| json!({"id": id, "title": format!("Paper {id}")})).collect::<Vec<_>>()
    })
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_query_sends_jwt_header() {
    let server = MockServer::start().await;
    mount_auth(&server, "tok-1").await;

    Mock::given(method("POST"))
        .and(path("/dimensions/dsl/v2"))
        .and(header("Authorization", "JWT tok-1"))
        .and(body_string_contains("search publications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(publications(2, &["pub.1", "pub.2"])))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server)
        .query("search publications for \"graphene\" return publications limit 2")
        .await
        .unwrap();
    assert_eq!(response.total_count(), Some(2));
    assert_eq!(response.records("publications").len(), 2);
}

#[tokio::test]
async fn test_expired_token_triggers_single_reauth() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/dimensions/auth.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "stale"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_auth(&server, "fresh").await;

    Mock::given(method("POST"))
        .and(path("/dimensions/dsl/v2"))
        .and(header("Authorization", "JWT stale"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"errors": "expired"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/dimensions/dsl/v2"))
        .and(header("Authorization", "JWT fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(publications(1, &["pub.9"])))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server).query("search publications return publications").await.unwrap();
    assert_eq!(response.records("publications")[0]["id"], "pub.9");
}

#[tokio::test]
async fn test_login_without_token_is_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/dimensions/auth.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": ""})))
        .mount(&server)
        .await;

    let err = client(&server).authenticate().await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized { .. }));
}

#[tokio::test]
async fn test_missing_key_is_reported() {
    let server = MockServer::start().await;
    let mut config = Config::for_testing(&server.uri());
    config.dimensions_key = None;

    let client = DimensionsClient::new(&config).unwrap();
    assert!(!client.has_key());

    let err = client.query("search grants return grants").await.unwrap_err();
    assert!(matches!(err, ClientError::MissingCredentials(_)));
}

// =============================================================================
// Iterative retrieval
// =============================================================================

#[tokio::test]
async fn test_iterative_stops_on_short_batch() {
    let server = MockServer::start().await;
    mount_auth(&server, "tok").await;

    Mock::given(method("POST"))
        .and(path("/dimensions/dsl/v2"))
        .and(body_string_contains("limit 2 skip 0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(publications(10, &["p1", "p2"])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/dimensions/dsl/v2"))
        .and(body_string_contains("limit 2 skip 2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(publications(10, &["p3"])))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server)
        .query_iterative("search publications return publications limit 50 skip 100", None, None, 2)
        .await
        .unwrap();

    assert_eq!(result.key, "publications");
    assert_eq!(result.source, Some(DimensionsSource::Publications));
    assert_eq!(result.base_query, "search publications return publications");
    assert_eq!(result.total, Some(10));
    assert_eq!(result.pages, 2);
    assert_eq!(result.records.len(), 3);
}

#[tokio::test]
async fn test_iterative_respects_max_results() {
    let server = MockServer::start().await;
    mount_auth(&server, "tok").await;

    Mock::given(method("POST"))
        .and(path("/dimensions/dsl/v2"))
        .and(body_string_contains("skip 0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(publications(100, &["p1", "p2", "p3"])))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server)
        .query_iterative("search publications return publications", None, Some(3), 3)
        .await
        .unwrap();

    assert_eq!(result.total, Some(3));
    assert_eq!(result.pages, 1);
    assert_eq!(result.records.len(), 3);
}

#[tokio::test]
async fn test_iterative_later_failure_keeps_partial() {
    let server = MockServer::start().await;
    mount_auth(&server, "tok").await;

    Mock::given(method("POST"))
        .and(path("/dimensions/dsl/v2"))
        .and(body_string_contains("skip 0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(publications(10, &["p1", "p2"])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/dimensions/dsl/v2"))
        .and(body_string_contains("skip 2"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let result = client(&server)
        .query_iterative("search publications return publications", None, None, 2)
        .await
        .unwrap();

    assert_eq!(result.records.len(), 2);
    assert!(result.warnings.iter().any(|w| w.starts_with("Error at skip=2")));
}

#[tokio::test]
async fn test_iterative_uses_given_source_over_query_text() {
    let server = MockServer::start().await;
    mount_auth(&server, "tok").await;

    Mock::given(method("POST"))
        .and(path("/dimensions/dsl/v2"))
        .and(body_string_contains("skip 0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_stats": {"total_count": 1},
            "grants": [{"id": "grant.1"}]
        })))
        .mount(&server)
        .await;

    let result = client(&server)
        .query_iterative(
            "search grants for \"datasets return publications\" return grants",
            Some(DimensionsSource::Grants),
            None,
            5,
        )
        .await
        .unwrap();

    assert_eq!(result.key, "grants");
    assert_eq!(result.records.len(), 1);
}

#[tokio::test]
async fn test_iterative_without_total_pages_until_short_batch() {
    let server = MockServer::start().await;
    mount_auth(&server, "tok").await;

    Mock::given(method("POST"))
        .and(path("/dimensions/dsl/v2"))
        .and(body_string_contains("limit 2 skip 0"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"publications": [{"id": "p1"}, {"id": "p2"}]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/dimensions/dsl/v2"))
        .and(body_string_contains("limit 2 skip 2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"publications": [{"id": "p3"}]})))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server)
        .query_iterative("search publications return publications", None, None, 2)
        .await
        .unwrap();

    assert_eq!(result.total, None);
    assert_eq!(result.pages, 2);
    assert_eq!(result.records.len(), 3);
}

// =============================================================================
// Schema discovery
// =============================================================================

#[tokio::test]
async fn test_describe_source_is_cached() {
    let server = MockServer::start().await;
    mount_auth(&server, "tok").await;

    Mock::given(method("POST"))
        .and(path("/dimensions/dsl/v2"))
        .and(body_string_contains("describe source publications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "fields": {
                "year": {"type": "integer", "is_facet": true, "is_filter": true},
                "funders": {"type": "organizations", "is_facet": true, "is_filter": true},
                "title": {"type": "string", "is_filter": false}
            },
            "fieldsets": ["basics", "extras"],
            "metrics": {"count": {"description": "Total count"}, "citations_total": {}},
            "search_fields": ["title_only", "full_data"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let schema = client.describe_source(DimensionsSource::Publications).await.unwrap();
    assert_eq!(schema.facets().len(), 2);
    assert!(schema.facets().contains("funders"));
    assert_eq!(schema.filters().len(), 2);
    assert!(schema.metric_names().contains("citations_total"));

    let again = client.describe_source(DimensionsSource::Publications).await.unwrap();
    assert_eq!(again.fieldsets, vec!["basics", "extras"]);
}
