mod common;

use axum::http::{Method, StatusCode};
use common::{host, TestApp};
use serde_json::json;

#[tokio::test]
async fn root_manages_tenants_across_the_platform() {
    let app = TestApp::new();
    let ops = app.provision("ops").await;
    let (_, root_token) = app.user_with_role(&ops, "root@lexcase.es", "root").await;
    let ops_host = host("ops");

    let created = app
        .post(&ops_host, "/api/root/tenants", Some(&root_token), json!({
            "subdomain": "acme", "name": "Bufete Acme"
        }))
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let acme = created.json()["data"].clone();
    assert_eq!(acme["name"], "Bufete Acme");

    let again = app
        .post(&ops_host, "/api/root/tenants", Some(&root_token), json!({ "subdomain": "acme" }))
        .await;
    assert_eq!(again.status, StatusCode::OK);
    assert_eq!(again.json()["data"]["id"], acme["id"]);

    let list = app.get(&ops_host, "/api/root/tenants", Some(&root_token)).await;
    assert_eq!(list.json()["data"].as_array().unwrap().len(), 2);

    let path = format!("/api/root/tenants/{}", acme["id"].as_str().unwrap());
    let suspended = app
        .send(Method::PATCH, &ops_host, &path, Some(&root_token), Some(json!({ "status": "suspended" })))
        .await;
    assert_eq!(suspended.status, StatusCode::OK);
    assert_eq!(suspended.json()["data"]["status"], "suspended");

    // A suspended tenant no longer resolves
    let reply = app
        .post(&host("acme"), "/api/usuarios/login", None, json!({ "email": "a@b.es", "password": "whatever-pass" }))
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn provisioning_rejects_invalid_subdomains() {
    let app = TestApp::new();
    let ops = app.provision("ops").await;
    let (_, root_token) = app.user_with_role(&ops, "root@lexcase.es", "root").await;

    let reply = app
        .post(&host("ops"), "/api/root/tenants", Some(&root_token), json!({ "subdomain": "Bad_Name" }))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tenant_admins_are_not_root() {
    let app = TestApp::new();
    app.provision("acme").await;
    let acme = host("acme");
    let (admin_token, _) = app.register(&acme, "jefa@acme.es", Some("admin")).await;

    assert_eq!(
        app.get(&acme, "/api/root/tenants", Some(&admin_token)).await.status,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.get(&acme, "/api/root/tenants", None).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn tenant_settings_are_self_service_except_status() {
    let app = TestApp::new();
    app.provision("acme").await;
    let acme = host("acme");
    let (admin_token, _) = app.register(&acme, "jefa@acme.es", Some("admin")).await;
    let (lawyer_token, _) = app.register(&acme, "ana@acme.es", None).await;

    let reply = app
        .put(&acme, "/api/tenant/settings", Some(&admin_token), json!({
            "company_name": "Acme Abogados SLP", "settings": { "locale": "es" }
        }))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    let tenant = reply.json()["data"].clone();
    assert_eq!(tenant["company_name"], "Acme Abogados SLP");
    assert_eq!(tenant["settings"]["locale"], "es");

    let merged = app
        .put(&acme, "/api/tenant/settings", Some(&admin_token), json!({ "settings": { "currency": "EUR" } }))
        .await;
    assert_eq!(merged.json()["data"]["settings"]["locale"], "es");
    assert_eq!(merged.json()["data"]["settings"]["currency"], "EUR");

    assert_eq!(
        app.put(&acme, "/api/tenant/settings", Some(&admin_token), json!({ "status": "suspended" })).await.status,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.put(&acme, "/api/tenant/settings", Some(&lawyer_token), json!({ "name": "Otro" })).await.status,
        StatusCode::FORBIDDEN
    );
}
