mod common;

use axum::http::StatusCode;
use common::{host, test_config, TestApp};
use lexcase_api::database::models::{TenantStatus, TenantUpdate};

#[tokio::test]
async fn unknown_subdomain_is_404_and_creates_nothing() {
    let app = TestApp::new();
    let reply = app.post(&host("ghost"), "/api/usuarios/login", None, serde_json::json!({
        "email": "a@b.es", "password": "whatever-pass"
    })).await;

    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.json()["error"], "Tenant not found: ghost");
    assert!(app.state.tenants.find_by_subdomain("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn development_auto_provisioning_creates_one_row_and_reuses_it() {
    let mut config = test_config();
    config.tenancy.auto_provision = true;
    let app = TestApp::with_config(config);

    let (token, _) = app.register("acme.example.com", "ana@acme.es", None).await;
    let first = app.get("acme.example.com", "/api/tenant", Some(&token)).await;
    assert_eq!(first.status, StatusCode::OK);
    let tenant = first.json()["data"].clone();
    assert_eq!(tenant["name"], "Tenant acme");
    assert_eq!(tenant["subdomain"], "acme");
    assert_eq!(tenant["status"], "active");

    let second = app.get("acme.example.com:8080", "/api/tenant", Some(&token)).await;
    assert_eq!(second.json()["data"]["id"], tenant["id"]);
    assert_eq!(app.state.tenants.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn localhost_and_ip_hosts_use_the_default_tenant() {
    let app = TestApp::new();
    app.provision("default").await;

    let hosts = ["localhost", "localhost:3000", "127.0.0.1:3000", "10.1.2.3", "[::1]:3000"];
    for (i, candidate) in hosts.into_iter().enumerate() {
        let (token, _) = app.register(candidate, &format!("user{}@bufete.es", i), None).await;
        let reply = app.get(candidate, "/api/tenant", Some(&token)).await;
        assert_eq!(reply.json()["data"]["subdomain"], "default", "host {}", candidate);
    }
}

#[tokio::test]
async fn inactive_tenant_is_not_attached() {
    let app = TestApp::new();
    let tenant = app.provision("dormant").await;
    app.state
        .tenants
        .update(
            tenant.id,
            TenantUpdate {
                status: Some(TenantStatus::Suspended),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let reply = app
        .post(&host("dormant"), "/api/usuarios/login", None, serde_json::json!({
            "email": "a@b.es", "password": "whatever-pass"
        }))
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn auto_provisioning_never_creates_invalid_subdomains() {
    let mut config = test_config();
    config.tenancy.auto_provision = true;
    let app = TestApp::with_config(config);

    let reply = app.get("bad_name.example.com", "/api/tenant", None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert!(app.state.tenants.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn catalog_routes_work_with_or_without_a_tenant() {
    let app = TestApp::new();
    app.provision("acme").await;

    let with_tenant = app.get(&host("acme"), "/api/provincies", None).await;
    let without_tenant = app.get(&host("nobody"), "/api/provincies", None).await;

    assert_eq!(with_tenant.status, StatusCode::OK);
    assert_eq!(without_tenant.status, StatusCode::OK);
    assert_eq!(with_tenant.json()["data"].as_array().unwrap().len(), 52);
    // The optional lookup never provisions
    assert!(app.state.tenants.find_by_subdomain("nobody").await.unwrap().is_none());
}
