mod auth_support;

use std::sync::Arc;

use auth_support::{credential, Harness};
use chrono::Duration;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use shuttle_bridge::mcp::{JsonRpcRequest, McpServer};
use tokio::io::AsyncReadExt;
use wiremock::matchers::path;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn server_for(mock: &MockServer) -> Arc<McpServer> {
    let harness = Harness::new(mock);
    harness
        .store
        .set(credential("T1", Duration::hours(1), None))
        .unwrap();
    let dispatcher = harness.dispatcher(mock, harness.guard());
    Arc::new(McpServer::new(Arc::new(dispatcher)))
}

async fn call(server: &McpServer, id: i64, method: &str, params: Option<Value>) -> Value {
    let response = server
        .handle_request(JsonRpcRequest::new(id, method, params))
        .await
        .expect("request with id must be answered");
    serde_json::to_value(response).unwrap()
}

#[tokio::test]
async fn initialize_advertises_tools_capability() {
    let mock = MockServer::start().await;
    let server = server_for(&mock);

    let response = call(&server, 1, "initialize", Some(json!({}))).await;

    assert_eq!(response["id"], json!(1));
    assert_eq!(response["result"]["protocolVersion"], json!("2024-11-05"));
    assert_eq!(response["result"]["serverInfo"]["name"], json!("shuttle-bridge"));
    assert!(response["result"]["capabilities"]["tools"].is_object());
}

#[tokio::test]
async fn tools_list_exposes_whole_catalog() {
    let mock = MockServer::start().await;
    let server = server_for(&mock);

    let response = call(&server, 2, "tools/list", None).await;
    let tools = response["result"]["tools"].as_array().unwrap();

    assert_eq!(tools.len(), 17);
    let get_resource = tools
        .iter()
        .find(|tool| tool["name"] == "get_resource")
        .unwrap();
    assert_eq!(get_resource["inputSchema"]["type"], json!("object"));
    assert_eq!(get_resource["inputSchema"]["required"], json!(["resource_id"]));
}

#[tokio::test]
async fn tools_call_wraps_payload_as_text_content() {
    let mock = MockServer::start().await;
    Mock::given(path("/api/v1/rf/resources/public/tags/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["ocean", "climate"])))
        .mount(&mock)
        .await;
    let server = server_for(&mock);

    let response = call(
        &server,
        3,
        "tools/call",
        Some(json!({ "name": "get_all_tags", "arguments": {} })),
    )
    .await;

    assert_eq!(response["result"]["isError"], json!(false));
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    assert_eq!(response["result"]["content"][0]["type"], json!("text"));
    assert_eq!(
        serde_json::from_str::<Value>(text).unwrap(),
        json!(["ocean", "climate"])
    );
}

#[tokio::test]
async fn tool_failures_are_results_with_is_error() {
    let mock = MockServer::start().await;
    let server = server_for(&mock);

    let response = call(
        &server,
        4,
        "tools/call",
        Some(json!({ "name": "no_such_tool", "arguments": {} })),
    )
    .await;

    assert!(response.get("error").is_none());
    assert_eq!(response["result"]["isError"], json!(true));
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    let error: Value = serde_json::from_str(text).unwrap();
    assert_eq!(error["error_kind"], json!("unknown_tool"));
}

#[tokio::test]
async fn malformed_call_params_are_invalid_params() {
    let mock = MockServer::start().await;
    let server = server_for(&mock);

    let response = call(&server, 5, "tools/call", Some(json!({ "arguments": {} }))).await;
    assert_eq!(response["error"]["code"], json!(-32602));

    let response = call(&server, 6, "tools/call", None).await;
    assert_eq!(response["error"]["code"], json!(-32602));
}

#[tokio::test]
async fn unknown_method_is_method_not_found() {
    let mock = MockServer::start().await;
    let server = server_for(&mock);

    let response = call(&server, 7, "resources/list", None).await;
    assert_eq!(response["error"]["code"], json!(-32601));
    assert_eq!(response["id"], json!(7));
}

#[tokio::test]
async fn notifications_get_no_response() {
    let mock = MockServer::start().await;
    let server = server_for(&mock);

    let notification: JsonRpcRequest =
        serde_json::from_value(json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }))
            .unwrap();
    assert!(server.handle_request(notification).await.is_none());
}

#[tokio::test]
async fn serve_answers_each_line_and_stops_on_shutdown() {
    let mock = MockServer::start().await;
    let server = server_for(&mock);

    let input = [
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        "",
        "this is not json",
        r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
        r#"{"jsonrpc":"2.0","id":3,"method":"shutdown"}"#,
        r#"{"jsonrpc":"2.0","id":4,"method":"ping"}"#,
    ]
    .join("\n");

    let (writer, mut client) = tokio::io::duplex(64 * 1024);
    server.serve(input.as_bytes(), writer).await.unwrap();

    let mut output = String::new();
    client.read_to_string(&mut output).await.unwrap();
    let responses: Vec<Value> = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(responses.len(), 4);
    assert_eq!(responses[0]["id"], json!(1));
    assert_eq!(responses[1]["error"]["code"], json!(-32700));
    assert_eq!(responses[1]["id"], Value::Null);
    assert_eq!(responses[2]["id"], json!(2));
    assert_eq!(responses[3]["id"], json!(3));
    assert!(responses.iter().all(|r| r["id"] != json!(4)));
}

#[tokio::test]
async fn serve_completes_in_flight_calls_before_returning() {
    let mock = MockServer::start().await;
    Mock::given(path("/api/v1/rf/projects/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "id": "p-1" }]))
                .set_delay(std::time::Duration::from_millis(100)),
        )
        .mount(&mock)
        .await;
    let server = server_for(&mock);

    let input = [
        r#"{"jsonrpc":"2.0","id":"slow","method":"tools/call","params":{"name":"list_projects"}}"#,
        r#"{"jsonrpc":"2.0","id":"fast","method":"ping"}"#,
    ]
    .join("\n");

    let (writer, mut client) = tokio::io::duplex(64 * 1024);
    server.serve(input.as_bytes(), writer).await.unwrap();

    let mut output = String::new();
    client.read_to_string(&mut output).await.unwrap();
    let ids: Vec<Value> = output
        .lines()
        .map(|line| serde_json::from_str::<Value>(line).unwrap()["id"].clone())
        .collect();

    assert_eq!(ids, vec![json!("fast"), json!("slow")]);
}

#[tokio::test]
async fn long_session_answers_every_call() {
    let mock = MockServer::start().await;
    Mock::given(path("/api/v1/rf/resources/public/tags/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["ocean"])))
        .expect(40)
        .mount(&mock)
        .await;
    let server = server_for(&mock);

    let input = (0..40)
        .map(|id| {
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": "tools/call",
                "params": { "name": "get_all_tags" }
            })
            .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n");

    let (writer, mut client) = tokio::io::duplex(256 * 1024);
    server.serve(input.as_bytes(), writer).await.unwrap();

    let mut output = String::new();
    client.read_to_string(&mut output).await.unwrap();
    let mut ids: Vec<i64> = output
        .lines()
        .map(|line| {
            let response: Value = serde_json::from_str(line).unwrap();
            assert_eq!(response["result"]["isError"], json!(false));
            response["id"].as_i64().unwrap()
        })
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, (0..40).collect::<Vec<_>>());
}
