#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use lexcase_api::auth::hash_password;
use lexcase_api::config::AppConfig;
use lexcase_api::database::models::{NewTenant, NewUser, Tenant, User};
use lexcase_api::database::TenantId;
use lexcase_api::{router, AppState};

pub const PASSWORD: &str = "correct-horse-battery";

// ---------------------------------------------------------------------------
// In-process router backed by memory stores
// ---------------------------------------------------------------------------

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.tenancy.auto_provision = false;
    config.security.jwt_secret = "integration-test-secret".to_string();
    config.api.enable_request_logging = false;
    config
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Bytes,
}

impl Reply {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes).unwrap_or(Value::Null)
    }
}

pub fn host(subdomain: &str) -> String {
    format!("{}.lexcase.test", subdomain)
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let state = AppState::in_memory(config).expect("in-memory state");
        Self {
            router: router(state.clone()),
            state,
        }
    }

    pub async fn provision(&self, subdomain: &str) -> Tenant {
        self.state
            .provisioner
            .provision(NewTenant::for_subdomain(subdomain))
            .await
            .expect("provision tenant")
            .tenant
    }

    /// Insert a user directly (any role, including root) and mint a token
    pub async fn user_with_role(&self, tenant: &Tenant, email: &str, role: &str) -> (User, String) {
        let user = self
            .state
            .repositories
            .users
            .create(
                TenantId::from(tenant.id),
                NewUser {
                    email: email.to_string(),
                    name: email.split('@').next().unwrap_or(email).to_string(),
                    password_hash: hash_password(PASSWORD).expect("hash"),
                    role: role.to_string(),
                },
            )
            .await
            .expect("create user");
        let token = self.state.keys.issue(&user).expect("issue token");
        (user, token)
    }

    pub async fn send(
        &self,
        method: Method,
        host: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        let mut builder = Request::builder().method(method).uri(path).header(header::HOST, host);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        Reply { status, headers, bytes }
    }

    pub async fn get(&self, host: &str, path: &str, token: Option<&str>) -> Reply {
        self.send(Method::GET, host, path, token, None).await
    }

    pub async fn post(&self, host: &str, path: &str, token: Option<&str>, body: Value) -> Reply {
        self.send(Method::POST, host, path, token, Some(body)).await
    }

    pub async fn put(&self, host: &str, path: &str, token: Option<&str>, body: Value) -> Reply {
        self.send(Method::PUT, host, path, token, Some(body)).await
    }

    pub async fn delete(&self, host: &str, path: &str, token: Option<&str>) -> Reply {
        self.send(Method::DELETE, host, path, token, None).await
    }

    /// Register through the API and return (token, user JSON)
    pub async fn register(&self, host: &str, email: &str, role: Option<&str>) -> (String, Value) {
        let mut body = json!({ "email": email, "name": "Test User", "password": PASSWORD });
        if let Some(role) = role {
            body["role"] = json!(role);
        }
        let reply = self.post(host, "/api/usuarios/register", None, body).await;
        assert_eq!(reply.status, StatusCode::CREATED, "register failed: {}", reply.json());
        let data = reply.json()["data"].clone();
        let token = data["token"].as_str().expect("token").to_string();
        (token, data["user"].clone())
    }
}

// ---------------------------------------------------------------------------
// Spawned server binary, for smoke tests
// ---------------------------------------------------------------------------

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

        // No database or broker is required: the pool is lazy and health
        // reports degraded instead of failing
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_lexcase-api"));
        cmd.env("PORT", port.to_string())
            .env("HOST", "127.0.0.1")
            .env("APP_ENV", "development")
            .env("RABBITMQ_ENABLED", "false")
            .env("DATABASE_MIGRATE_ON_START", "false")
            .env("DATABASE_CONNECT_TIMEOUT", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

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
                if resp.status() == reqwest::StatusCode::OK
                    || resp.status() == reqwest::StatusCode::SERVICE_UNAVAILABLE
                {
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
