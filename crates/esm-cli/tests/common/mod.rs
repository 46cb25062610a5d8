use std::process::{Output, Stdio};

use tokio::process::{Child, Command};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const LOGIN_PATH: &str = "/rest-api/itsm/v1/users/login";
pub const DATA_PATH: &str = "/rest-api/itsm/v1/dc/Incidents/data";

fn esm_command(args: &[&str], server: &MockServer) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_esm"));
    cmd.args(args)
        .env("ESM_URL", server.uri())
        .env("ESM_USERNAME", "integration")
        .env("ESM_PASSWORD", "secret")
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("ESM_STATE_DIR");
    cmd
}

/// Run the CLI binary against a mock instance.
///
/// The child runs on the test's runtime so the mock server keeps serving.
pub async fn run_esm(args: &[&str], server: &MockServer) -> Output {
    esm_command(args, server)
        .output()
        .await
        .expect("Failed to execute CLI")
}

/// Start the CLI without waiting for it, capturing its output.
pub fn spawn_esm(args: &[&str], server: &MockServer) -> Child {
    esm_command(args, server)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start CLI")
}

/// Run the CLI with an empty environment.
pub async fn run_esm_bare(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_esm"))
        .args(args)
        .env_clear()
        .output()
        .await
        .expect("Failed to execute CLI")
}

/// Run the CLI and expect success, returning stdout.
pub async fn run_esm_success(args: &[&str], server: &MockServer) -> (String, String) {
    let output = run_esm(args, server).await;
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    if !output.status.success() {
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    (stdout, stderr)
}

pub async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(200).insert_header("Authorization", "Bearer cli-token"))
        .mount(server)
        .await;
}
