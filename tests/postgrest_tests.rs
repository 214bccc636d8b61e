// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PostgREST client tests against a mock row store.

use async_trait::async_trait;
use chrono::Utc;
use lead_console::db::postgrest::BearerSource;
use lead_console::db::{AttendanceStore, PostgrestDb, ProfileResolver};
use lead_console::error::AppError;
use lead_console::models::{ProfileStatus, Role};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct StaticBearer(&'static str);

#[async_trait]
impl BearerSource for StaticBearer {
    async fn bearer_token(&self) -> Option<String> {
        Some(self.0.to_string())
    }
}

fn db_for(server: &MockServer) -> PostgrestDb {
    PostgrestDb::new(&server.uri(), "anon").unwrap()
}

#[tokio::test]
async fn test_get_profile_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("id", "eq.u1"))
        .and(query_param("select", "*"))
        .and(header("apikey", "anon"))
        .and(header("authorization", "Bearer operator-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "u1",
            "role": "admin",
            "status": "active",
            "full_name": "Ada",
            "auto_logout": true
        }])))
        .mount(&server)
        .await;

    let db = db_for(&server).with_bearer_source(Arc::new(StaticBearer("operator-token")));
    let profile = db.get_profile_by_id("u1").await.unwrap().unwrap();

    assert_eq!(profile.role, Role::Admin);
    assert_eq!(profile.status, ProfileStatus::Active);
    assert_eq!(profile.full_name.as_deref(), Some("Ada"));
    assert!(profile.auto_logout);
}

#[tokio::test]
async fn test_get_profile_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(header("authorization", "Bearer anon"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let profile = db_for(&server).get_profile("nobody").await.unwrap();
    assert!(profile.is_none());
}

#[tokio::test]
async fn test_expired_jwt_is_auth_class() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": "PGRST301",
            "message": "JWT expired"
        })))
        .mount(&server)
        .await;

    let err = db_for(&server).get_profile("u1").await.unwrap_err();
    assert!(err.is_auth_class());
    assert!(err.to_string().contains("JWT expired"));
}

#[tokio::test]
async fn test_server_error_is_opaque() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;

    let err = db_for(&server).get_profile("u1").await.unwrap_err();
    assert!(matches!(err, AppError::Remote { status: Some(500), .. }));
    assert!(!err.is_auth_class());
}

#[tokio::test]
async fn test_open_attendance_inserts_row() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/attendance"))
        .and(header("prefer", "return=minimal"))
        .and(body_partial_json(json!({ "user_id": "u1" })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    db_for(&server)
        .open_attendance("u1", Utc::now())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_close_attendance_patches_open_rows() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/attendance"))
        .and(query_param("user_id", "eq.u1"))
        .and(query_param("check_out", "is.null"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    db_for(&server)
        .close_attendance("u1", Utc::now())
        .await
        .unwrap();
}
