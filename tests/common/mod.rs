#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};

use recruit_api::app::{build_router, AppState};
use recruit_api::config::{AppConfig, StoreBackend};
use recruit_api::database::DatabaseManager;
use recruit_api::mail::{Email, MailError, Mailer};

pub const ADMIN_EMAIL: &str = "admin@gmail.com";
pub const USER_EMAIL: &str = "user@gmail.com";
pub const PASSWORD: &str = "123456";

/// Captures outgoing mail; `fail_after` makes every send past that count fail
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Email>>,
    pub fail_after: Option<usize>,
}

impl RecordingMailer {
    pub fn failing_after(count: usize) -> Self {
        Self {
            sent: Mutex::new(vec![]),
            fail_after: Some(count),
        }
    }

    pub fn recipients(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|e| e.to.clone()).collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        let mut sent = self.sent.lock().unwrap();
        if matches!(self.fail_after, Some(limit) if sent.len() >= limit) {
            return Err(MailError::Transport("relay refused".into()));
        }
        sent.push(email);
        Ok(())
    }
}

/// One in-process server per test: its own port, memory store and mailer
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub prefix: String,
    pub client: Client,
    pub mailer: Arc<RecordingMailer>,
    pub state: AppState,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.prefix, path)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    /// Logs in and returns the access token
    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "username": email, "password": password }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "login failed: {}", res.status());
        let body: Value = res.json().await?;
        body["data"]["access_token"]
            .as_str()
            .map(str::to_string)
            .context("login response has no access_token")
    }

    pub async fn admin_token(&self) -> Result<String> {
        self.login(ADMIN_EMAIL, PASSWORD).await
    }

    pub async fn user_token(&self) -> Result<String> {
        self.login(USER_EMAIL, PASSWORD).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<Response> {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        Ok(req.send().await?)
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Result<Response> {
        let mut req = self.client.post(self.url(path)).json(&body);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        Ok(req.send().await?)
    }

    pub async fn patch(&self, path: &str, token: Option<&str>, body: Value) -> Result<Response> {
        let mut req = self.client.patch(self.url(path)).json(&body);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        Ok(req.send().await?)
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<Response> {
        let mut req = self.client.delete(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        Ok(req.send().await?)
    }
}

pub async fn spawn_server() -> Result<TestServer> {
    spawn_server_with(RecordingMailer::default()).await
}

pub async fn spawn_server_with(mailer: RecordingMailer) -> Result<TestServer> {
    spawn_server_configured(mailer, |_| {}).await
}

/// Like `spawn_server_with`, letting the test adjust the config before startup
pub async fn spawn_server_configured(mailer: RecordingMailer, tweak: impl FnOnce(&mut AppConfig)) -> Result<TestServer> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;

    let mut config = AppConfig::development();
    config.server.port = port;
    config.database.backend = StoreBackend::Memory;
    config.bootstrap.should_init = true;
    config.mail.smtp_host = None;
    tweak(&mut config);
    let config = Arc::new(config);

    let store = DatabaseManager::connect_store(&config).await?;
    let mailer = Arc::new(mailer);
    let state = AppState::new(config.clone(), store, mailer.clone());
    state.bootstrap.run().await?;

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .with_context(|| format!("failed to bind port {}", port))?;
    let app = build_router(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let server = TestServer {
        port,
        base_url: format!("http://127.0.0.1:{}", port),
        prefix: config.server.api_prefix.clone(),
        client: Client::builder().cookie_store(true).build()?,
        mailer,
        state,
    };
    server.wait_ready(Duration::from_secs(5)).await?;
    Ok(server)
}

/// Unwraps the success envelope, failing on any other status
pub async fn data(res: Response, expected: StatusCode) -> Result<Value> {
    let status = res.status();
    let body: Value = res.json().await?;
    anyhow::ensure!(status == expected, "expected {}, got {}: {}", expected, status, body);
    anyhow::ensure!(body["success"] == true, "not a success envelope: {}", body);
    Ok(body["data"].clone())
}

/// Asserts an error envelope with the given status and returns it
pub async fn error(res: Response, expected: StatusCode) -> Result<Value> {
    let status = res.status();
    let body: Value = res.json().await?;
    anyhow::ensure!(status == expected, "expected {}, got {}: {}", expected, status, body);
    anyhow::ensure!(body["success"] == false, "not an error envelope: {}", body);
    Ok(body)
}
