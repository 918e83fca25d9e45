mod common;

use axum::http::{header, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{host, test_config, TestApp};
use serde_json::json;

const CONTENT: &[u8] = b"%PDF-1.4 escrito de demanda";

#[tokio::test]
async fn upload_download_and_soft_delete() {
    let app = TestApp::new();
    app.provision("acme").await;
    let acme = host("acme");
    let (token, user) = app.register(&acme, "ana@acme.es", None).await;

    let reply = app
        .post(&acme, "/api/documents", Some(&token), json!({
            "file_name": "demanda \"final\".pdf",
            "mime_type": "application/pdf",
            "content_base64": STANDARD.encode(CONTENT),
            "description": "Escrito de demanda"
        }))
        .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.json());
    let doc = reply.json()["data"].clone();
    assert_eq!(doc["size_bytes"], CONTENT.len());
    assert_eq!(doc["status"], "active");
    assert_eq!(doc["uploaded_by"], user["id"]);
    assert_eq!(doc["checksum"].as_str().unwrap().len(), 64);
    assert!(doc.get("content").is_none());

    let id = doc["id"].as_str().unwrap();
    let download = app.get(&acme, &format!("/api/documents/{}/download", id), Some(&token)).await;
    assert_eq!(download.status, StatusCode::OK);
    assert_eq!(download.headers[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        download.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"demanda _final_.pdf\""
    );
    assert_eq!(&download.bytes[..], CONTENT);

    let renamed = app
        .put(&acme, &format!("/api/documents/{}", id), Some(&token), json!({ "file_name": "demanda.pdf" }))
        .await;
    assert_eq!(renamed.json()["data"]["file_name"], "demanda.pdf");

    let deleted = app.delete(&acme, &format!("/api/documents/{}", id), Some(&token)).await;
    assert_eq!(deleted.status, StatusCode::OK);

    // Soft-deleted rows disappear from every read, but are kept in storage
    let list = app.get(&acme, "/api/documents", Some(&token)).await;
    assert!(list.json()["data"].as_array().unwrap().is_empty());
    assert_eq!(
        app.get(&acme, &format!("/api/documents/{}/download", id), Some(&token)).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.delete(&acme, &format!("/api/documents/{}", id), Some(&token)).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn upload_validation() {
    let app = TestApp::new();
    app.provision("acme").await;
    let acme = host("acme");
    let (token, _) = app.register(&acme, "ana@acme.es", None).await;

    let reply = app
        .post(&acme, "/api/documents", Some(&token), json!({
            "file_name": "x.bin", "content_base64": "%%% not base64 %%%"
        }))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.json()["field_errors"]["content_base64"].is_string());

    let reply = app
        .post(&acme, "/api/documents", Some(&token), json!({
            "file_name": "x.bin",
            "content_base64": STANDARD.encode(CONTENT),
            "case_id": "6f1c0b8e-3a57-4d8e-9d5c-2f1f7c3e9a10"
        }))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.json()["field_errors"]["case_id"].is_string());

    // Data URL prefix supplies the MIME type when none is given
    let reply = app
        .post(&acme, "/api/documents", Some(&token), json!({
            "file_name": "nota.txt",
            "content_base64": format!("data:text/plain;base64,{}", STANDARD.encode(b"hola"))
        }))
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.json()["data"]["mime_type"], "text/plain");
}

#[tokio::test]
async fn oversized_bodies_are_rejected_with_413() {
    let mut config = test_config();
    config.api.max_request_size_bytes = 1024;
    let app = TestApp::with_config(config);
    app.provision("acme").await;
    let acme = host("acme");
    let (token, _) = app.register(&acme, "ana@acme.es", None).await;

    let reply = app
        .post(&acme, "/api/documents", Some(&token), json!({
            "file_name": "grande.bin",
            "content_base64": STANDARD.encode(vec![7u8; 4096])
        }))
        .await;
    assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(reply.json()["code"], "PAYLOAD_TOO_LARGE");
}
