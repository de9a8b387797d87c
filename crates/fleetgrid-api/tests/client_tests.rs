//! Integration tests for `ApiClient` against a mock RPC endpoint.

use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use fleetgrid_api::{ApiClient, ApiError, ApiSession, AssetClass, EntityId, Group};

async fn authenticated_client(server: &MockServer) -> ApiClient {
    Mock::given(method("POST"))
        .and(path("/apiv1"))
        .and(body_partial_json(json!({ "method": "Authenticate" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "credentials": {
                    "database": "fleet1",
                    "userName": "admin@fleet.example",
                    "sessionId": "sess-123"
                }
            }
        })))
        .mount(server)
        .await;

    let client = ApiClient::new(&server.uri(), "fleet1", "admin@fleet.example", "secret")
        .expect("client should build");
    client.authenticate().await.expect("authenticate should succeed");
    client
}

#[tokio::test]
async fn authenticate_stores_session_and_calls_succeed() {
    let server = MockServer::start().await;
    let client = authenticated_client(&server).await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "Get",
            "params": { "typeName": "Group", "credentials": { "sessionId": "sess-123" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [
                { "id": "b1", "name": "Organization", "reference": "ORG" },
                { "id": "b2", "name": "Depot", "reference": "D-1", "parentId": "b1", "color": 255 }
            ]
        })))
        .mount(&server)
        .await;

    let groups = client.fetch_groups().await.unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[1].reference, "D-1");
    assert_eq!(groups[1].parent_id, Some(EntityId::new("b1")));
    assert_eq!(groups[1].color, 255);
}

#[tokio::test]
async fn authenticate_failure_maps_to_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": { "message": "invalid user or password" }
        })))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri(), "fleet1", "admin@fleet.example", "wrong").unwrap();
    let err = client.authenticate().await.unwrap_err();
    assert!(matches!(err, ApiError::Authentication(_)));
    assert!(err.to_string().contains("invalid user or password"));
}

#[tokio::test]
async fn calls_without_authentication_are_rejected_locally() {
    let server = MockServer::start().await;
    let client = ApiClient::new(&server.uri(), "fleet1", "user", "pw").unwrap();

    let err = client.fetch_groups().await.unwrap_err();
    assert!(matches!(err, ApiError::Authentication(_)));
    // No request reaches the server.
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn add_group_sends_entity_and_returns_id() {
    let server = MockServer::start().await;
    let client = authenticated_client(&server).await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "Add",
            "params": {
                "typeName": "Group",
                "entity": { "name": "Depot", "reference": "D-1", "parentId": "b1" }
            }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "result": "b77" })),
        )
        .mount(&server)
        .await;

    let mut group = Group::new("Depot", "D-1");
    group.parent_id = Some(EntityId::new("b1"));
    let id = client.add_group(&group).await.unwrap();
    assert_eq!(id, EntityId::new("b77"));
}

#[tokio::test]
async fn rpc_error_object_maps_to_server_error() {
    let server = MockServer::start().await;
    let client = authenticated_client(&server).await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "Remove" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": { "message": "group is not empty", "code": 409 }
        })))
        .mount(&server)
        .await;

    let mut group = Group::new("Depot", "D-1");
    group.id = Some(EntityId::new("b2"));
    let err = client.remove_group(&group).await.unwrap_err();
    match err {
        ApiError::Server { code, message } => {
            assert_eq!(code, 409);
            assert!(message.contains("not empty"));
        }
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test]
async fn http_failure_status_maps_to_server_error() {
    let server = MockServer::start().await;
    let client = authenticated_client(&server).await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "Get" })))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = client.fetch_groups().await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn asset_refs_decode_groups_per_class() {
    let server = MockServer::start().await;
    let client = authenticated_client(&server).await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "Get",
            "params": { "typeName": "Device" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [
                { "id": "d1", "groups": ["b2", "b3"] },
                { "id": "d2" }
            ]
        })))
        .mount(&server)
        .await;

    let refs = client.fetch_asset_refs(AssetClass::Device).await.unwrap();
    assert_eq!(refs.len(), 2);
    assert_eq!(refs[0].class, AssetClass::Device);
    assert!(refs[0].references(&EntityId::new("b3")));
    assert!(refs[1].group_ids.is_empty());
}

#[tokio::test]
async fn set_asset_groups_writes_only_id_and_groups() {
    let server = MockServer::start().await;
    let client = authenticated_client(&server).await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "Set",
            "params": {
                "typeName": "Zone",
                "entity": { "id": "z1", "groups": ["b1"] }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": null })))
        .mount(&server)
        .await;

    let asset = fleetgrid_api::AssetRef::new("z1", AssetClass::Zone, vec![EntityId::new("b1")]);
    client.set_asset_groups(&asset).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let set_request: &Request = requests
        .iter()
        .find(|r| {
            serde_json::from_slice::<Value>(&r.body)
                .map(|b| b["method"] == "Set")
                .unwrap_or(false)
        })
        .expect("set request should have been sent");
    let body: Value = serde_json::from_slice(&set_request.body).unwrap();
    assert_eq!(body["params"]["entity"]["groups"], json!(["b1"]));
}
