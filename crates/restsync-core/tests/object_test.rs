#![allow(clippy::unwrap_used)]
// Lifecycle tests for `ApiObject` against a wiremock server.

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use restsync_api::HttpClientConfig;
use restsync_core::{
    ApiClient, ApiObject, CancellationToken, ClientConfig, CoreError, Method, ObjectConfig,
    ReadSearch,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn client_config(server: &MockServer) -> ClientConfig {
    ClientConfig {
        http: HttpClientConfig {
            base_url: server.uri(),
            ..HttpClientConfig::default()
        },
        ..ClientConfig::default()
    }
}

fn object(server: &MockServer, config: ObjectConfig) -> ApiObject {
    let client = ApiClient::new(client_config(server)).unwrap();
    ApiObject::new(client, config).unwrap()
}

fn base(data: Value) -> ObjectConfig {
    ObjectConfig {
        path: "/api/objects".into(),
        data: data.to_string(),
        ..ObjectConfig::default()
    }
}

fn cancel() -> CancellationToken {
    CancellationToken::new()
}

/// Matches the raw query string exactly, parameter order included.
struct RawQuery(&'static str);

impl Match for RawQuery {
    fn matches(&self, request: &Request) -> bool {
        request.url.query() == Some(self.0)
    }
}

// ── Read ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_read_adopts_server_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/objects/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"Id": "1", "Thing": "potato", "age": 3})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let obj = object(
        &server,
        ObjectConfig {
            id_attribute: Some("Id".into()),
            ..base(json!({"Id": "1", "Thing": "potato"}))
        },
    );
    assert_eq!(obj.id(), "1");

    obj.read(&cancel()).await.unwrap();

    assert_eq!(obj.id(), "1");
    assert_eq!(
        Value::Object(obj.api_data()),
        json!({"Id": "1", "Thing": "potato", "age": 3})
    );
    assert_eq!(
        Value::Object(obj.declared()),
        json!({"Id": "1", "Thing": "potato"})
    );

    let drift = obj.drift();
    assert!(drift.has_changes);
    assert_eq!(drift.modified.get("age"), Some(&json!(3)));
    assert!(!obj.compute_delta(&[], true).has_changes);
}

#[tokio::test]
async fn test_read_of_deleted_object_clears_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/objects/1"))
        .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
        .mount(&server)
        .await;

    let obj = object(&server, base(json!({"id": "1"})));
    obj.read(&cancel()).await.unwrap();

    assert_eq!(obj.id(), "");
}

#[tokio::test]
async fn test_read_propagates_other_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/objects/1"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let obj = object(&server, base(json!({"id": "1"})));
    let err = obj.read(&cancel()).await.unwrap_err();

    assert!(matches!(err, CoreError::Http4xx { status: 403, .. }));
    assert_eq!(err.to_string(), "unexpected response code '403': forbidden");
    assert_eq!(obj.id(), "1");
}

#[tokio::test]
async fn test_read_sends_read_data_and_query_string() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/objects/1"))
        .and(query_param("expand", "all"))
        .and(body_json(json!({"fields": ["name"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "1", "name": "a"})))
        .expect(1)
        .mount(&server)
        .await;

    let obj = object(
        &server,
        ObjectConfig {
            read_method: Some(Method::POST),
            query_string: Some("expand=all".into()),
            read_data: Some(r#"{"fields":["name"]}"#.into()),
            ..base(json!({"id": "1", "name": "a"}))
        },
    );
    obj.read(&cancel()).await.unwrap();

    assert!(!obj.drift().has_changes);
}

// ── Search ──────────────────────────────────────────────────────────

fn search_config() -> ObjectConfig {
    ObjectConfig {
        query_string: Some("v=2".into()),
        read_search: Some(ReadSearch {
            search_key: "name".into(),
            search_value: "target-object".into(),
            results_key: Some("data".into()),
            query_string: Some("q=target".into()),
            ..ReadSearch::default()
        }),
        ..base(json!({"name": "target-object"}))
    }
}

#[tokio::test]
async fn test_search_read_adopts_first_match() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/objects"))
        .and(RawQuery("q=target&v=2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [
            {"id": "obj-2", "name": "target-object"},
            {"id": "obj-1", "name": "other"}
        ]})))
        .expect(1)
        .mount(&server)
        .await;

    let obj = object(&server, search_config());
    assert_eq!(obj.id(), "");

    obj.read(&cancel()).await.unwrap();

    assert_eq!(obj.id(), "obj-2");
    assert_eq!(obj.api_data().get("name"), Some(&json!("target-object")));
}

#[tokio::test]
async fn test_search_without_match_clears_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/objects"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": [{"id": "obj-1", "name": "other"}]})),
        )
        .mount(&server)
        .await;

    let obj = object(
        &server,
        ObjectConfig {
            object_id: Some("stale".into()),
            ..search_config()
        },
    );
    obj.read(&cancel()).await.unwrap();

    assert_eq!(obj.id(), "");
}

#[tokio::test]
async fn test_search_with_bad_shape_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/objects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"id": "x"}})))
        .mount(&server)
        .await;

    let obj = object(&server, search_config());
    let err = obj.read(&cancel()).await.unwrap_err();

    assert!(matches!(err, CoreError::SearchShape { .. }));
}

#[tokio::test]
async fn test_find_applies_patch_without_adopting() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/objects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"uuid": "u-1", "meta": {"name": "web-42"}, "secret": "s"}
        ])))
        .mount(&server)
        .await;

    let obj = object(
        &server,
        ObjectConfig {
            object_id: Some("42".into()),
            id_attribute: Some("uuid".into()),
            read_search: Some(ReadSearch {
                search_key: "meta/name".into(),
                search_value: "web-{id}".into(),
                search_patch: Some(r#"[{"op":"remove","path":"/secret"}]"#.into()),
                ..ReadSearch::default()
            }),
            ..base(json!({"meta": {"name": "web-42"}}))
        },
    );

    let (id, record) = obj.find(&cancel()).await.unwrap().unwrap();
    assert_eq!(id, "u-1");
    assert_eq!(record, json!({"uuid": "u-1", "meta": {"name": "web-42"}}));

    assert_eq!(obj.id(), "42");
    assert!(obj.api_data().is_empty());
}

// ── Create ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_with_returned_object_adopts_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/objects"))
        .and(body_json(json!({"name": "x"})))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"id": "new-1", "name": "x", "rev": 1})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let obj = object(
        &server,
        ObjectConfig {
            create_returns_object: Some(true),
            copy_keys: Some(vec!["rev".into()]),
            ..base(json!({"name": "x"}))
        },
    );
    obj.create(&cancel()).await.unwrap();

    assert_eq!(obj.id(), "new-1");
    assert_eq!(obj.declared().get("rev"), Some(&json!(1)));
    let snapshot = obj.snapshot();
    assert_eq!(snapshot.id, "new-1");
    assert!(snapshot.create_response.unwrap().contains("new-1"));
}

#[tokio::test]
async fn test_create_then_read_when_response_is_not_authoritative() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/objects"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/objects/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "7", "name": "x"})))
        .expect(1)
        .mount(&server)
        .await;

    let obj = object(&server, base(json!({"id": "7", "name": "x"})));
    obj.create(&cancel()).await.unwrap();

    assert_eq!(obj.id(), "7");
    assert_eq!(obj.create_response(), None);
    assert!(!obj.drift().has_changes);
}

#[tokio::test]
async fn test_create_after_object_vanished_reuses_declared_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/objects/7"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/objects"))
        .and(body_json(json!({"id": "7", "name": "x"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/objects/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "7", "name": "x"})))
        .mount(&server)
        .await;

    let obj = object(&server, base(json!({"id": "7", "name": "x"})));
    obj.read(&cancel()).await.unwrap();
    assert_eq!(obj.id(), "");

    obj.create(&cancel()).await.unwrap();

    assert_eq!(obj.id(), "7");
    assert!(!obj.drift().has_changes);
}

#[tokio::test]
async fn test_create_without_id_in_response_fails_loudly() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/objects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    let obj = object(
        &server,
        ObjectConfig {
            write_returns_object: Some(true),
            ..base(json!({"name": "x"}))
        },
    );
    let err = obj.create(&cancel()).await.unwrap_err();

    assert!(matches!(err, CoreError::InternalInvariant { .. }));
    assert_eq!(obj.create_response().as_deref(), Some(r#"{"status":"ok"}"#));
}

#[tokio::test]
async fn test_cancelled_create_reports_ambiguity() {
    let server = MockServer::start().await;
    let obj = object(
        &server,
        ObjectConfig {
            write_returns_object: Some(true),
            ..base(json!({"name": "x"}))
        },
    );

    let token = CancellationToken::new();
    token.cancel();
    let err = obj.create(&token).await.unwrap_err();

    assert!(matches!(err, CoreError::InternalInvariant { .. }));
    assert!(err.to_string().contains("without a known id"));
}

// ── Update ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_update_sends_update_data_and_adopts() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/objects/1"))
        .and(body_json(json!({"op": "rename"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "1", "name": "y"})))
        .expect(1)
        .mount(&server)
        .await;

    let obj = object(
        &server,
        ObjectConfig {
            update_method: Some(Method::PATCH),
            update_data: Some(r#"{"op":"rename"}"#.into()),
            write_returns_object: Some(true),
            ..base(json!({"id": "1", "name": "y"}))
        },
    );
    obj.update(&cancel()).await.unwrap();

    assert_eq!(obj.api_data().get("name"), Some(&json!("y")));
}

#[tokio::test]
async fn test_update_without_id_is_refused() {
    let server = MockServer::start().await;
    let obj = object(
        &server,
        ObjectConfig {
            write_returns_object: Some(true),
            ..base(json!({"name": "x"}))
        },
    );

    let err = obj.update(&cancel()).await.unwrap_err();
    assert!(matches!(err, CoreError::IdentityMissing { .. }));
}

// ── Delete ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_delete_of_gone_object_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/objects/1"))
        .respond_with(ResponseTemplate::new(410))
        .expect(1)
        .mount(&server)
        .await;

    let obj = object(&server, base(json!({"id": "1"})));
    obj.delete(&cancel()).await.unwrap();

    assert_eq!(obj.id(), "");
}

#[tokio::test]
async fn test_delete_of_missing_object_clears_id() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/objects/1"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let obj = object(&server, base(json!({"id": "1"})));
    obj.delete(&cancel()).await.unwrap();

    assert_eq!(obj.id(), "");
    assert!(!obj.is_locatable());
}

#[tokio::test]
async fn test_delete_uses_destroy_path_and_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/objects/1/remove"))
        .and(body_json(json!({"force": true})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let obj = object(
        &server,
        ObjectConfig {
            destroy_path: Some("/api/objects/{id}/remove".into()),
            destroy_method: Some(Method::POST),
            destroy_data: Some(r#"{"force":true}"#.into()),
            ..base(json!({"id": "1"}))
        },
    );
    obj.delete(&cancel()).await.unwrap();

    assert_eq!(obj.id(), "");
}

#[tokio::test]
async fn test_delete_server_error_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/objects/1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let obj = object(&server, base(json!({"id": "1"})));
    let err = obj.delete(&cancel()).await.unwrap_err();

    assert!(matches!(err, CoreError::Http5xx { status: 500, .. }));
    assert_eq!(obj.id(), "1");
}
