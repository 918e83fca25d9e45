mod common;

use axum::http::StatusCode;
use common::{host, TestApp};
use serde_json::json;

#[tokio::test]
async fn status_reports_the_memory_backend() {
    let app = TestApp::new();
    app.provision("acme").await;
    let acme = host("acme");
    let (token, _) = app.register(&acme, "ana@acme.es", None).await;

    let status = app.get(&acme, "/api/rabbitmq/status", Some(&token)).await.json()["data"].clone();
    assert_eq!(status["backend"], "memory");
    assert_eq!(status["connected"], true);
    assert_eq!(status["binding_key"], "usuario.*");
}

#[tokio::test]
async fn registrations_show_up_in_the_message_log() {
    let app = TestApp::new();
    app.provision("acme").await;
    let acme = host("acme");
    let (token, user) = app.register(&acme, "ana@acme.es", None).await;

    let listing = app.get(&acme, "/api/rabbitmq/messages", Some(&token)).await.json()["data"].clone();
    assert_eq!(listing["count"], 1);
    let message = &listing["messages"][0];
    assert_eq!(message["routing_key"], "usuario.creado");
    assert_eq!(message["payload"]["id"], user["id"]);
    assert!(message["payload"].get("password_hash").is_none());
}

#[tokio::test]
async fn diagnostic_publish_is_admin_only_and_restricted_to_user_keys() {
    let app = TestApp::new();
    app.provision("acme").await;
    let acme = host("acme");
    let (admin_token, _) = app.register(&acme, "jefa@acme.es", Some("admin")).await;
    let (lawyer_token, _) = app.register(&acme, "ana@acme.es", None).await;

    let body = json!({ "routing_key": "usuario.test", "payload": { "ping": 1 } });
    assert_eq!(
        app.post(&acme, "/api/rabbitmq/publish", Some(&lawyer_token), body.clone()).await.status,
        StatusCode::FORBIDDEN
    );

    let reply = app
        .post(&acme, "/api/rabbitmq/publish", Some(&admin_token), json!({
            "routing_key": "caso.x", "payload": {}
        }))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.json()["field_errors"]["routing_key"].is_string());

    let reply = app.post(&acme, "/api/rabbitmq/publish", Some(&admin_token), body).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["data"]["published"], true);

    let newest = &app.state.messages.recent().await[0];
    assert_eq!(newest.routing_key, "usuario.test");
    assert_eq!(newest.payload["ping"], 1);
}

#[tokio::test]
async fn message_log_and_publish_stay_inside_the_tenant() {
    let app = TestApp::new();
    let acme_tenant = app.provision("acme").await;
    app.provision("globex").await;
    let acme = host("acme");
    let globex = host("globex");
    let (acme_token, _) = app.register(&acme, "secret.partner@acme.es", None).await;
    let (globex_admin, _) = app.register(&globex, "jefa@globex.es", Some("admin")).await;

    let listing = app.get(&globex, "/api/rabbitmq/messages", Some(&globex_admin)).await.json()["data"].clone();
    assert_eq!(listing["count"], 1);
    assert_eq!(listing["messages"][0]["payload"]["email"], "jefa@globex.es");
    assert!(!listing.to_string().contains("secret.partner@acme.es"));

    // A forged tenant_id is overwritten with the caller's tenant
    let reply = app
        .post(&globex, "/api/rabbitmq/publish", Some(&globex_admin), json!({
            "routing_key": "usuario.creado",
            "payload": { "tenant_id": acme_tenant.id, "email": "forged@acme.es" }
        }))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    let acme_view = app.get(&acme, "/api/rabbitmq/messages", Some(&acme_token)).await.json()["data"].clone();
    assert_eq!(acme_view["count"], 1);
    assert!(!acme_view.to_string().contains("forged@acme.es"));

    // Root sees the whole platform
    let (_, acme_root) = app.user_with_role(&acme_tenant, "root@lexcase.es", "root").await;
    let all = app.get(&acme, "/api/rabbitmq/messages", Some(&acme_root)).await.json()["data"].clone();
    assert_eq!(all["count"], 3);
    assert!(all.to_string().contains("forged@acme.es"));

    let reply = app
        .post(&globex, "/api/rabbitmq/publish", Some(&globex_admin), json!({
            "routing_key": "usuario.test", "payload": [1, 2, 3]
        }))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}
