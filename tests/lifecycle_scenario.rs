//! Detector lifecycle against a mock SignalFx API: create, refresh, drift,
//! update, out-of-band deletion and delete.

use serde_json::{json, Value};
use signalform_provider::testing::{assert_drifted, assert_gone, assert_synced, ProviderTester};
use signalform_provider::{CredentialSources, ProviderService, SignalformProvider};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn no_env(_: &str) -> Option<String> {
    None
}

fn detector(threshold: u32) -> Value {
    json!({
        "name": "cpu high",
        "program_text": format!("signal = data('cpu.utilization').publish('cpu')\ndetect(when(signal > {})).publish('cpu high')", threshold),
        "rule": [{
            "severity": "Critical",
            "detect_label": "cpu high",
            "notifications": ["Email,ops@example.com"]
        }]
    })
}

async fn tester(server: &MockServer) -> ProviderTester<SignalformProvider> {
    let provider = SignalformProvider::new(CredentialSources::none()).with_env(no_env);
    let tester = ProviderTester::new(provider);
    tester
        .configure(json!({
            "auth_token": "secret",
            "api_url": server.uri(),
            "app_url": "https://app.example.com"
        }))
        .await
        .unwrap();
    tester
}

fn object(id: &str, last_updated: f64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"id": id, "lastUpdated": last_updated}))
}

#[tokio::test]
async fn detector_full_lifecycle() {
    let server = MockServer::start().await;
    let tester = tester(&server).await;

    // create + refresh without drift
    Mock::given(method("POST"))
        .and(path("/v2/detector"))
        .and(header("X-SF-Token", "secret"))
        .and(body_partial_json(json!({
            "name": "cpu high",
            "maxDelay": null,
            "rules": [{
                "severity": "Critical",
                "detectLabel": "cpu high",
                "notifications": [{"type": "Email", "email": "ops@example.com"}]
            }]
        })))
        .respond_with(object("D1", 1_000.0))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/detector/D1"))
        .respond_with(object("D1", 1_000.0))
        .mount(&server)
        .await;

    let state = tester
        .lifecycle_create("signalform_detector", detector(80))
        .await
        .unwrap();
    assert_synced(&state);
    assert_eq!(state["id"], "D1");
    assert_eq!(state["last_updated"], 1_000.0);
    assert_eq!(state["url"], "https://app.example.com/#/detector/v2/D1/edit");

    // someone edits the detector in the UI
    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/v2/detector/D1"))
        .respond_with(object("D1", 50_000.0))
        .mount(&server)
        .await;

    let state = tester.read("signalform_detector", state).await.unwrap();
    assert_drifted(&state);
    assert_eq!(state["last_updated"], 50_000.0);

    // update pushes the declared configuration back
    server.reset().await;
    Mock::given(method("PUT"))
        .and(path("/v2/detector/D1"))
        .and(body_partial_json(json!({"name": "cpu high"})))
        .respond_with(object("D1", 60_000.0))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/detector/D1"))
        .respond_with(object("D1", 60_000.0))
        .mount(&server)
        .await;

    let state = tester
        .lifecycle_update("signalform_detector", state, detector(90))
        .await
        .unwrap();
    assert_synced(&state);
    assert_eq!(state["last_updated"], 60_000.0);

    // deleted out of band
    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/v2/detector/D1"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Detector D1 not found"))
        .mount(&server)
        .await;

    let gone = tester.read("signalform_detector", state.clone()).await.unwrap();
    assert_gone(&gone);

    // delete treats a 404 as already deleted
    server.reset().await;
    Mock::given(method("DELETE"))
        .and(path("/v2/detector/D1"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    tester.delete("signalform_detector", state).await.unwrap();
}

#[tokio::test]
async fn unexpected_status_is_reported_with_body() {
    let server = MockServer::start().await;
    let tester = tester(&server).await;

    Mock::given(method("POST"))
        .and(path("/v2/chart"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad program"))
        .mount(&server)
        .await;

    let err = tester
        .create("signalform_text_chart", json!({"name": "notes", "markdown": "hi"}))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert!(err.to_string().contains("bad program"));
}

#[tokio::test]
async fn invalid_declaration_never_reaches_the_api() {
    let server = MockServer::start().await;
    let tester = tester(&server).await;

    let mut declared = detector(80);
    declared["rule"][0]["severity"] = json!("Fatal");

    let diagnostics = tester
        .provider()
        .validate_resource_config("signalform_detector", declared.clone())
        .await
        .unwrap();
    signalform_provider::testing::assert_error_contains(&diagnostics, "Fatal");

    assert!(tester
        .lifecycle_create("signalform_detector", declared)
        .await
        .is_err());
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}
