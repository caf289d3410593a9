use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;

const BINARY: &str = "target/debug/agency-ledger-api";
const READY_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(150);

static SERVER: OnceLock<TestServer> = OnceLock::new();

/// One server process shared by every test in the binary. The child is held
/// so the process lives as long as the test run.
pub struct TestServer {
    pub base_url: String,
    #[allow(dead_code)]
    child: Child,
}

/// Spawn the server once (on a free port, with deterministic secrets) and
/// block until `/health` answers.
pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| spawn().expect("failed to spawn server binary"));
    await_ready(&server.base_url, READY_TIMEOUT).await?;
    Ok(server)
}

fn spawn() -> Result<TestServer> {
    let port = portpicker::pick_unused_port().context("no free port available")?;

    // DATABASE_URL and the rest of .env are inherited from the parent; only
    // the knobs the tests depend on are pinned here. GEMINI_API_KEY must be
    // absent so the missing-credential path stays reachable.
    let child = Command::new(BINARY)
        .env("LEDGER_API_PORT", port.to_string())
        .env("JWT_SECRET", "integration-test-secret")
        .env_remove("GEMINI_API_KEY")
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .with_context(|| format!("failed to spawn {BINARY} (run `cargo build` first)"))?;

    Ok(TestServer { base_url: format!("http://127.0.0.1:{port}"), child })
}

async fn await_ready(base_url: &str, timeout: Duration) -> Result<()> {
    let client = reqwest::Client::new();
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Ok(resp) = client.get(format!("{base_url}/health")).send().await {
            // 503 still means the router is up, just without a database
            if matches!(resp.status(), StatusCode::OK | StatusCode::SERVICE_UNAVAILABLE) {
                return Ok(());
            }
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    anyhow::bail!("server at {base_url} not ready after {timeout:?}")
}

/// True when the spawned server reports a healthy database. Tests that need
/// Postgres call this and return early when the environment has none.
#[allow(dead_code)]
pub async fn database_available(server: &TestServer) -> Result<bool> {
    let client = reqwest::Client::new();
    let res = client.get(format!("{}/health", server.base_url)).send().await?;
    Ok(res.status() == StatusCode::OK)
}
