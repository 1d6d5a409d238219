//! `BackendClient` against a mock backend on a local port.

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use meetcap::api::{ApiError, BackendClient, JoinRequest, RecordQuery, Timeouts};
use meetcap::link::LinkClassifier;
use meetcap::session::{JoiningStatus, MeetingSessionId};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

const TOKEN: &str = "token-1";

fn authorized(headers: &HeaderMap) -> bool {
    let expected = format!("Bearer {}", TOKEN);
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some(expected.as_str())
}

async fn join(headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "jwt expired"})));
    }
    if body["platform"] != "google" || body["meetingCode"] != "abc-defg-hij" {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "bad join body"})));
    }
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "response": {
                "_id": "m1",
                "platform": "google",
                "meetingCode": body["meetingCode"],
                "joiningStatus": "NEW",
                "languageCode": body["languageCode"]
            }
        })),
    )
}

async fn snapshot(Path(id): Path<String>) -> Json<Value> {
    Json(json!({
        "success": true,
        "response": {
            "recording": true,
            "chatMessages": [{"sender": "Ann", "message": "hi", "time": 1}],
            "transcripts": [{"speaker": "A", "transcript": "hello", "start": 0, "end": 500}],
            "meetingDetail": {"_id": id, "joiningStatus": "WATING_FOR_ADMIT", "title": "Sync"},
            "participants": 4
        }
    }))
}

async fn records(Query(query): Query<HashMap<String, String>>) -> impl IntoResponse {
    if query.get("orderBy").map(String::as_str) != Some("_id,desc") {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "missing orderBy"})));
    }
    let page: u32 = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(0);
    let limit: u32 = query.get("limit").and_then(|p| p.parse().ok()).unwrap_or(0);
    let keyword = query.get("keyword").cloned().unwrap_or_default();
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "response": {
                "data": [{"_id": "r1", "title": keyword, "platform": "zoom"}],
                "pagination": {"limit": limit, "page": page, "pageCount": 3, "total": 41}
            }
        })),
    )
}

async fn slow_stop() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!({"success": true}))
}

async fn live() -> Json<Value> {
    Json(json!({"success": false, "message": "Maintenance window"}))
}

async fn missing_info() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({"message": "Meeting not found"})))
}

async fn sign_up(Json(body): Json<Value>) -> impl IntoResponse {
    if body["email"] == "taken@example.com" {
        return (
            StatusCode::CONFLICT,
            Json(json!({"message": "ERROR_EMAIL_EXISTED"})),
        );
    }
    if body["name"] != "Ana" || body["password"] != "secret" {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "bad sign-up body"})));
    }
    (StatusCode::OK, Json(json!({"success": true, "message": "registered"})))
}

async fn activate(Json(body): Json<Value>) -> impl IntoResponse {
    if body["email"] != "ana@example.com" {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "bad activation body"})));
    }
    if body["otpCode"] != "12345" {
        return (StatusCode::OK, Json(json!({"success": false, "message": "ERROR_OTP_INVALID"})));
    }
    (StatusCode::OK, Json(json!({"success": true})))
}

async fn resend_otp(Json(body): Json<Value>) -> impl IntoResponse {
    if body.get("email").and_then(Value::as_str) == Some("ana@example.com") {
        (StatusCode::OK, Json(json!({"success": true})))
    } else {
        (StatusCode::BAD_REQUEST, Json(json!({"message": "unknown email"})))
    }
}

async fn sign_in(Json(body): Json<Value>) -> impl IntoResponse {
    if body["email"] == "new@example.com" {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"message": "ERROR_DATA_NOT_ACTIVE"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "response": {
                "accessToken": TOKEN,
                "refreshToken": "refresh-1",
                "userInfo": {"_id": "u1", "email": body["email"], "name": "Ana"}
            }
        })),
    )
}

async fn spawn_backend() -> String {
    let app = Router::new()
        .route("/api/v1/auth/sign-in", post(sign_in))
        .route("/api/v1/auth/sign-up", post(sign_up))
        .route("/api/v1/auth/active-account", post(activate))
        .route("/api/v1/auth/resend-otp", post(resend_otp))
        .route("/api/v1/bot/join-meet", post(join))
        .route("/api/v1/bot/info/:id", get(snapshot))
        .route("/api/v1/bot/stop/:id", post(slow_stop))
        .route("/api/v1/meeting/records", get(records))
        .route("/api/v1/meeting/live", get(live))
        .route("/api/v1/meeting/info/:id", get(missing_info));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api/v1", addr)
}

fn client(base_url: &str) -> BackendClient {
    BackendClient::new(base_url)
        .with_access_token(Some(TOKEN.to_string()))
        .with_timeouts(Timeouts {
            request: Duration::from_secs(2),
            join: Duration::from_secs(2),
            stop: Duration::from_millis(200),
        })
}

fn join_request() -> JoinRequest {
    let link = LinkClassifier::new()
        .unwrap()
        .parse("https://meet.google.com/abc-defg-hij")
        .unwrap();
    JoinRequest::from_link(link, "en")
}

#[tokio::test]
async fn test_join_returns_session_record() {
    let base = spawn_backend().await;
    let record = client(&base).join_meeting(&join_request()).await.unwrap();
    assert_eq!(record.id, "m1");
    assert_eq!(record.joining_status, Some(JoiningStatus::New));
    assert_eq!(record.extra.get("languageCode"), Some(&json!("en")));
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let base = spawn_backend().await;
    let anonymous = BackendClient::new(&base);
    let err = anonymous.join_meeting(&join_request()).await.unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_snapshot_decodes() {
    let base = spawn_backend().await;
    let id = MeetingSessionId::parse("m7").unwrap();
    let snapshot = client(&base).meeting_snapshot(&id).await.unwrap();

    assert!(snapshot.recording);
    assert_eq!(snapshot.participants, Some(4));
    assert_eq!(snapshot.transcripts[0].transcript, "hello");
    assert_eq!(snapshot.chat_messages[0].sender, "Ann");
    let detail = snapshot.meeting_detail.unwrap();
    assert_eq!(detail.id, "m7");
    assert_eq!(detail.joining_status, Some(JoiningStatus::WaitingForAdmit));
}

#[tokio::test]
async fn test_records_query_and_pagination() {
    let base = spawn_backend().await;
    let query = RecordQuery {
        page: 2,
        limit: 5,
        keyword: Some("standup".to_string()),
        ..RecordQuery::default()
    };
    let page = client(&base).records(&query).await.unwrap();
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].title.as_deref(), Some("standup"));
    assert_eq!(page.pagination.page, 2);
    assert_eq!(page.pagination.limit, 5);
    assert_eq!(page.pagination.page_count, 3);
    assert_eq!(page.pagination.total, 41);
}

#[tokio::test]
async fn test_stop_timeout_is_distinguished() {
    let base = spawn_backend().await;
    let id = MeetingSessionId::parse("m1").unwrap();
    let err = client(&base).stop_meeting(&id).await.unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got {:?}", err);
}

#[tokio::test]
async fn test_unsuccessful_envelope_is_rejected() {
    let base = spawn_backend().await;
    let err = client(&base).live_meetings().await.unwrap_err();
    match err {
        ApiError::Rejected(message) => assert_eq!(message, "Maintenance window"),
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_carries_message() {
    let base = spawn_backend().await;
    let id = MeetingSessionId::parse("nope").unwrap();
    let err = client(&base).meeting_info(&id).await.unwrap_err();
    match err {
        ApiError::Server { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Meeting not found");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let base = format!("http://{}/api/v1", addr);
    let err = client(&base).live_meetings().await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_sign_up_and_activate() {
    let base = spawn_backend().await;
    let anonymous = BackendClient::new(&base);

    anonymous
        .sign_up("Ana", "ana@example.com", "secret")
        .await
        .unwrap();
    anonymous.resend_otp("ana@example.com").await.unwrap();
    anonymous
        .activate_account("ana@example.com", "12345")
        .await
        .unwrap();

    let credentials = anonymous.sign_in("ana@example.com", "secret").await.unwrap();
    assert!(credentials.is_authenticated());
    assert_eq!(credentials.user_id(), Some("u1"));
}

#[tokio::test]
async fn test_sign_up_conflict_carries_message() {
    let base = spawn_backend().await;
    let err = BackendClient::new(&base)
        .sign_up("Ana", "taken@example.com", "secret")
        .await
        .unwrap_err();
    match err {
        ApiError::Server { status, message } => {
            assert_eq!(status, 409);
            assert_eq!(message, "ERROR_EMAIL_EXISTED");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_wrong_activation_code_is_rejected() {
    let base = spawn_backend().await;
    let err = BackendClient::new(&base)
        .activate_account("ana@example.com", "99999")
        .await
        .unwrap_err();
    match err {
        ApiError::Rejected(message) => assert_eq!(message, "ERROR_OTP_INVALID"),
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_inactive_account_sign_in() {
    let base = spawn_backend().await;
    let err = BackendClient::new(&base)
        .sign_in("new@example.com", "secret")
        .await
        .unwrap_err();
    assert!(err.is_inactive_account(), "got {:?}", err);
    assert!(!err.is_unauthorized());
}
