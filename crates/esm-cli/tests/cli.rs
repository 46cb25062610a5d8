//! CLI tests against a mock ESM instance.

mod common;

use std::fs::OpenOptions;
use std::time::Duration;

use common::{
    DATA_PATH, LOGIN_PATH, mount_login, run_esm, run_esm_bare, run_esm_success, spawn_esm,
};
use fs2::FileExt;
use serde_json::{Value, json};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn listing(ids: &[u64]) -> Value {
    let data: Vec<_> = ids
        .iter()
        .map(|id| json!({ "dataCardId": id.to_string(), "hidden": false }))
        .collect();
    json!({ "data": data, "meta": { "count": ids.len() } })
}

#[tokio::test]
async fn poll_emits_once_and_persists_state() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path(DATA_PATH))
        .and(header("Authorization", "Bearer cli-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&[1, 2, 3])))
        .mount(&server)
        .await;

    let state = tempfile::tempdir().unwrap();
    let state_dir = state.path().to_str().unwrap();
    let args = ["poll", "Incidents", "--state-dir", state_dir];

    let (stdout, _) = run_esm_success(&args, &server).await;
    let ids: Vec<String> = stdout
        .lines()
        .map(|line| {
            let record: Value = serde_json::from_str(line).unwrap();
            record["dataCardId"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(ids, ["1", "2", "3"]);

    let state_file = state.path().join("Incidents.json");
    assert!(state_file.exists());
    let stored: Value =
        serde_json::from_str(&std::fs::read_to_string(&state_file).unwrap()).unwrap();
    assert_eq!(stored["template"], "Incidents");
    assert_eq!(stored["cursor"]["processedIds"], json!(["1", "2", "3"]));

    let (stdout, stderr) = run_esm_success(&args, &server).await;
    assert!(stdout.is_empty());
    assert!(stderr.contains("No new data."));
}

#[tokio::test]
async fn poll_refuses_while_trigger_is_held() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    let state = tempfile::tempdir().unwrap();
    let held = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(state.path().join("Incidents.lock"))
        .unwrap();
    held.lock_exclusive().unwrap();

    let output = run_esm(
        &["poll", "Incidents", "--state-dir", state.path().to_str().unwrap()],
        &server,
    )
    .await;

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("is running"));
    assert!(server.received_requests().await.unwrap().is_empty());
    held.unlock().unwrap();
}

#[tokio::test]
async fn poll_state_changed_mid_run_emits_nothing() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path(DATA_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing(&[1, 2, 3]))
                .set_delay(Duration::from_millis(1500)),
        )
        .mount(&server)
        .await;

    let state = tempfile::tempdir().unwrap();
    let state_dir = state.path().to_str().unwrap();
    let args = ["poll", "Incidents", "--state-dir", state_dir];

    let child = spawn_esm(&args, &server);

    // State is loaded before login, so once login arrives the run holds a
    // stale read.
    let mut logged_in = false;
    for _ in 0..250 {
        let requests = server.received_requests().await.unwrap_or_default();
        if requests.iter().any(|r| r.url.path() == LOGIN_PATH) {
            logged_in = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(logged_in);

    let foreign = json!({
        "baseUrl": server.uri(),
        "template": "Incidents",
        "updatedAt": "2026-01-01T00:00:00Z",
        "cursor": { "lastFilterId": 0, "processedIds": [], "version": 7 }
    });
    std::fs::write(
        state.path().join("Incidents.json"),
        serde_json::to_string(&foreign).unwrap(),
    )
    .unwrap();

    let output = child.wait_with_output().await.unwrap();
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("changed while polling"));

    let (stdout, _) = run_esm_success(&args, &server).await;
    assert_eq!(stdout.lines().count(), 3);

    let (stdout, stderr) = run_esm_success(&args, &server).await;
    assert!(stdout.is_empty());
    assert!(stderr.contains("No new data."));
}

#[tokio::test]
async fn create_sends_parsed_fields() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path(DATA_PATH))
        .and(body_string_contains("\"folderCode\":\"incidents\""))
        .and(body_string_contains("Printer on fire"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "dataCardId": "77" })))
        .expect(1)
        .mount(&server)
        .await;

    let (stdout, _) = run_esm_success(
        &[
            "create",
            "Incidents",
            "--folder",
            "incidents",
            "-f",
            "subject:string=Printer on fire",
            "-f",
            "priority:number=2",
        ],
        &server,
    )
    .await;

    let created: Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(created["dataCardId"], "77");
}

#[tokio::test]
async fn malformed_field_fails_before_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let output = run_esm(
        &["create", "Incidents", "--folder", "x", "-f", "no-type-here"],
        &server,
    )
    .await;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("name:type=value"));
}

#[tokio::test]
async fn missing_url_is_reported() {
    let output = run_esm_bare(&["list", "Incidents"]).await;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ESM_URL"));
}

#[tokio::test]
async fn login_without_token_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(200).insert_header("X-Request-Id", "r-1"))
        .mount(&server)
        .await;

    let output = run_esm(&["login"], &server).await;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no token found"));
    assert!(stderr.contains("x-request-id=r-1"));
}

#[tokio::test]
async fn list_passes_limit_and_folder() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path(DATA_PATH))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&[4, 5])))
        .mount(&server)
        .await;

    let (stdout, _) = run_esm_success(&["list", "Incidents", "--limit", "2"], &server).await;
    assert_eq!(stdout.lines().count(), 2);
}

#[tokio::test]
async fn import_continues_past_failed_rows() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path(DATA_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "dataCardId": "1" })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(DATA_PATH))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({ "message": "DataCard is locked" })),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("rows.ndjson");
    std::fs::write(
        &input,
        concat!(
            r#"[{"name":"subject","type":"string","value":"first"}]"#,
            "\n",
            r#"[{"name":"subject","type":"string","value":"second"}]"#,
            "\n"
        ),
    )
    .unwrap();

    let (stdout, stderr) = run_esm_success(
        &[
            "import",
            "Incidents",
            "--folder",
            "incidents",
            "--input",
            input.to_str().unwrap(),
            "--continue-on-fail",
        ],
        &server,
    )
    .await;

    let lines: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["dataCardId"], "1");
    assert_eq!(lines[1]["itemIndex"], 1);
    assert!(stderr.contains("1 of 2 rows failed"));
}

#[tokio::test]
async fn import_stops_on_first_failure_by_default() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path(DATA_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("rows.ndjson");
    std::fs::write(
        &input,
        "[{\"name\":\"subject\",\"type\":\"string\",\"value\":\"a\"}]\n[]\n",
    )
    .unwrap();

    let output = run_esm(
        &[
            "import",
            "Incidents",
            "--folder",
            "incidents",
            "--input",
            input.to_str().unwrap(),
        ],
        &server,
    )
    .await;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Import stopped at row 0"));
}
