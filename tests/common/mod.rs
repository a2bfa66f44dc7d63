#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{body::Body, http::Request, Router};
use reqwest::StatusCode;
use serde_json::Value;
use tower::ServiceExt;

use rbac_admin_api::presence::{EventPublisher, PresenceHub};
use rbac_admin_api::server::{app, AppState};

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_rbac-admin-api"));
        cmd.arg("serve")
            .env("RBAC_API_PORT", port.to_string())
            .env("DATABASE_RUN_MIGRATIONS", "true")
            .env("SEED_ENABLED", "true")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // Inherit environment so the server can see DATABASE_URL from .env (loaded by the server)
        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
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
                // Ready once /health answers, with or without a database
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(15)).await?;
    Ok(server)
}

/// Router wired to a fresh hub, for in-process requests that never reach the database
pub fn test_app() -> Router {
    let (events, _rx) = EventPublisher::channel(16);
    app(AppState::new(Arc::new(PresenceHub::new(events))))
}

/// Send one request through the router and decode the JSON envelope
pub async fn send(router: Router, request: Request<Body>) -> Result<(axum::http::StatusCode, Value)> {
    let response = router.oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let body = serde_json::from_slice(&bytes).context("response body is not JSON")?;
    Ok((status, body))
}

pub fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("valid request")
}

/// DATABASE_URL from the environment or `.env`; database-backed tests skip without it
pub fn database_url() -> Option<String> {
    let _ = dotenvy::dotenv();
    std::env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty())
}

/// Unique, valid username for one test run
pub fn unique_username(prefix: &str) -> String {
    format!("{}{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..12])
}

/// JSON client against the spawned server, optionally carrying a bearer token
#[derive(Clone)]
pub struct Api {
    base_url: String,
    client: reqwest::Client,
    token: Option<String>,
}

impl Api {
    pub fn new(server: &TestServer) -> Self {
        Self {
            base_url: server.base_url.clone(),
            client: reqwest::Client::new(),
            token: None,
        }
    }

    pub fn with_token(&self, token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            ..self.clone()
        }
    }

    pub async fn call(&self, method: reqwest::Method, path: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut request = self.client.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let status = response.status();
        let body = response.json::<Value>().await?;
        Ok((status, body))
    }

    pub async fn get(&self, path: &str) -> Result<(StatusCode, Value)> {
        self.call(reqwest::Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.call(reqwest::Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.call(reqwest::Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<(StatusCode, Value)> {
        self.call(reqwest::Method::DELETE, path, None).await
    }

    /// Log in and return the token pair from the envelope
    pub async fn login(&self, username: &str, password: &str) -> Result<Value> {
        let (status, body) = self
            .post("/api/auth/login", serde_json::json!({ "username": username, "password": password }))
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "login failed for {}: {}", username, body);
        Ok(body["data"].clone())
    }

    /// Register a fresh account, log it in and return a client carrying its access token
    pub async fn fresh_user(&self) -> Result<(Self, Value)> {
        let username = unique_username("u");
        let (status, body) = self
            .post(
                "/api/auth/register",
                serde_json::json!({ "username": username, "password": "secret123" }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "register failed: {}", body);
        let tokens = self.login(&username, "secret123").await?;
        let token = tokens["access_token"].as_str().unwrap_or_default().to_string();
        Ok((self.with_token(&token), tokens))
    }

    /// Client signed in as the seeded administrator
    pub async fn admin(&self) -> Result<Self> {
        let seed = &rbac_admin_api::config::config().seed;
        let tokens = self.login(&seed.admin_username, &seed.admin_password).await?;
        let token = tokens["access_token"].as_str().unwrap_or_default().to_string();
        Ok(self.with_token(&token))
    }
}
