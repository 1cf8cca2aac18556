use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

static SERVER: OnceLock<Option<TestServer>> = OnceLock::new();

pub struct TestServer {
    pub base_url: String,
    pub upload_dir: std::path::PathBuf,
    #[allow(dead_code)]
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Keep uploads out of the workspace
        let upload_dir = std::env::temp_dir().join(format!("docflow-uploads-{}", port));

        // Spawn the already-built binary to keep start fast during tests.
        // Inherits the environment so the server sees DB_* settings.
        let mut cmd = Command::new("target/debug/docflow-api");
        cmd.env("PORT", port.to_string())
            .env("UPLOAD_DIR", &upload_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { base_url, upload_dir, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!(
            "server did not become ready on {} within {:?} (is the database up?)",
            self.base_url,
            timeout
        )
    }
}

/// Spawn the server once per test binary. Returns None when it cannot start
/// (typically no database available); callers skip in that case, the same
/// way the integration suite in the original backend did.
pub async fn try_server() -> Option<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().ok());
    match server {
        Some(s) => match s.wait_ready(Duration::from_secs(10)).await {
            Ok(()) => Some(s),
            Err(e) => {
                eprintln!("skipping integration test: {e}");
                None
            }
        },
        None => {
            eprintln!("skipping integration test: failed to spawn server binary");
            None
        }
    }
}

/// Login suffix that is unique per call, so repeated test runs against a
/// persistent database never collide on the unique login constraint.
#[allow(dead_code)]
pub fn unique(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    format!("{}_{}", prefix, nanos)
}

/// Register a fresh user and log in, returning (token, user_id, login).
#[allow(dead_code)]
pub async fn register_and_login(base_url: &str) -> Result<(String, i64, String)> {
    let client = reqwest::Client::new();
    let login = unique("user");

    let res = client
        .post(format!("{}/auth/register", base_url))
        .json(&json!({ "login": login, "password": "pw1" }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::CREATED, "register failed: {}", res.status());

    let res = client
        .post(format!("{}/auth/login", base_url))
        .json(&json!({ "login": login, "password": "pw1" }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "login failed: {}", res.status());

    let body: Value = res.json().await?;
    let token = body["token"].as_str().context("missing token")?.to_string();
    let user_id = body["user"]["id"].as_i64().context("missing user id")?;

    Ok((token, user_id, login))
}
