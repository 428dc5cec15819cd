mod helpers;

use apicontroller::controller::SaveRequest;
use helpers::{closed_port_url, controller, get_request};
use mockito::Matcher;
use serde_json::json;

#[test]
fn test_simple_recording_success() {
    let mut server = mockito::Server::new();
    let health = server
        .mock("GET", "/health")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok":true}"#)
        .create();
    let dir = tempfile::tempdir().unwrap();
    let mut controller = controller(dir.path());
    controller.save(&get_request("ping", &format!("{}/health", server.url())));

    let outcome = controller.execute("ping");
    assert!(outcome.success, "{}", outcome.transcript);
    assert!(outcome.transcript.contains("200"));
    assert!(outcome.transcript.contains("\"ok\": true"));
    health.assert();
}

#[test]
fn test_simple_recording_server_error() {
    let mut server = mockito::Server::new();
    server.mock("GET", "/health").with_status(500).with_body("boom").create();
    let dir = tempfile::tempdir().unwrap();
    let mut controller = controller(dir.path());
    controller.save(&get_request("ping", &format!("{}/health", server.url())));

    let outcome = controller.execute("ping");
    assert!(!outcome.success);
    assert!(outcome.transcript.contains("500"));
    assert!(outcome.transcript.contains("boom"));
}

#[test]
fn test_simple_recording_sends_stored_request() {
    let mut server = mockito::Server::new();
    let items = server
        .mock("POST", "/items")
        .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
        .match_header("x-token", "abc")
        .match_body(Matcher::Json(json!({"title": "hello"})))
        .with_status(201)
        .expect(1)
        .create();
    let dir = tempfile::tempdir().unwrap();
    let mut controller = controller(dir.path());
    let status = controller.save(&SaveRequest {
        name: "Create Item".to_string(),
        url: format!("{}/items", server.url()),
        method: "POST".to_string(),
        headers: r#"{"X-Token": "abc"}"#.to_string(),
        query_params: r#"{"page": 2}"#.to_string(),
        body: r#"{"title": "hello"}"#.to_string(),
    });
    assert!(status.starts_with("✅"), "{}", status);

    let outcome = controller.execute("Create Item");
    assert!(outcome.success, "{}", outcome.transcript);
    items.assert();
}

#[test]
fn test_simple_recording_transport_failure() {
    let dir = tempfile::tempdir().unwrap();
    let mut controller = controller(dir.path());
    controller.save(&get_request("down", &closed_port_url()));

    let outcome = controller.execute("down");
    assert!(!outcome.success);
    assert!(outcome.transcript.contains("ERREUR"));
}

#[test]
fn test_unknown_recording() {
    let dir = tempfile::tempdir().unwrap();
    let controller = controller(dir.path());

    let outcome = controller.execute("ghost");
    assert!(!outcome.success);
    assert!(outcome.transcript.contains("'ghost' introuvable"));
}

#[test]
fn test_sequence_runs_every_step() {
    let mut server = mockito::Server::new();
    let fail = server
        .mock("POST", "/fail")
        .match_body(Matcher::Json(json!({"text": "hello", "count": 2})))
        .with_status(500)
        .with_body("kaput")
        .expect(1)
        .create();
    let ok = server
        .mock("POST", "/ok")
        .match_body(Matcher::Json(json!({"text": "again"})))
        .with_status(200)
        .with_body(r#"{"data": ["done"]}"#)
        .expect(1)
        .create();
    let dir = tempfile::tempdir().unwrap();
    let mut controller = controller(dir.path());
    let status = controller.import_transcript(
        "flow",
        &server.url(),
        r#"
result = client.predict(text="hello", count=2, api_name="/fail")
result = client.predict(text="again", api_name="/ok")
"#,
    );
    assert!(status.starts_with("✅"), "{}", status);

    let outcome = controller.execute("flow");
    assert!(!outcome.success);
    assert_eq!(outcome.transcript.matches("Succès").count(), 1);
    assert_eq!(outcome.transcript.matches("Échec").count(), 1);
    assert!(outcome.transcript.contains("Étape 1: Échec /fail"));
    assert!(outcome.transcript.contains("kaput"));
    assert!(outcome.transcript.contains("Étape 2: Succès /ok"));
    fail.assert();
    ok.assert();
}

#[test]
fn test_sequence_steps_stay_on_the_target() {
    let mut server = mockito::Server::new();
    let ok = server.mock("POST", "/app/ok").with_status(200).with_body("{}").expect(1).create();
    let anything_else = server
        .mock("POST", Matcher::Regex("^/(admin|x)".to_string()))
        .expect(0)
        .create();
    let dir = tempfile::tempdir().unwrap();
    let mut controller = controller(dir.path());
    let transcript = format!(
        r#"
client.predict(api_name="{}/x")
client.predict(api_name="../admin")
client.predict(api_name="/ok")
"#,
        server.url()
    );
    controller.import_transcript("flow", &format!("{}/app", server.url()), &transcript);

    let outcome = controller.execute("flow");
    assert!(!outcome.success);
    assert!(outcome.transcript.contains("must be a path, not a URL"), "{}", outcome.transcript);
    assert!(outcome.transcript.contains("contains the segment '..'"));
    assert!(outcome.transcript.contains("Étape 3: Succès /ok"));
    ok.assert();
    anything_else.assert();
}
