//! Integration tests for auth, document CRUD, audit logs, cleanup, CORS and uploads.

mod common;

use serde_json::{json, Value};

use common::{register_user, start_test_server};

#[tokio::test]
async fn test_health_check() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client.get(server.url("/api/health")).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["message"], json!("Server is running"));
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_resource_routes_require_token() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client.get(server.url("/api/events")).send().await.unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], json!(false));

    let resp = client
        .get(server.url("/api/events"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_register_login_and_login_logs() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();

    let (token, user_id) = register_user(&client, &server, "Ada", "Ada@Example.com").await;

    // Duplicate email (case-insensitive) is a conflict
    let resp = client
        .post(server.url("/api/auth/register"))
        .json(&json!({ "name": "Ada 2", "email": "ada@example.com", "password": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    let resp = client
        .post(server.url("/api/auth/login"))
        .json(&json!({ "email": "ada@example.com", "password": "correct horse" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["user"]["id"], json!(user_id));
    assert!(body["data"]["user"].get("password").is_none());
    assert!(body["data"]["token"].is_string());

    let resp = client
        .post(server.url("/api/auth/login"))
        .json(&json!({ "email": "ada@example.com", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .post(server.url("/api/auth/login"))
        .json(&json!({ "email": "nobody@example.com", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .get(server.url("/api/login-logs"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let logs: Value = resp.json().await.unwrap();
    let logs = logs["data"].as_array().unwrap();
    assert_eq!(logs.len(), 3);
    assert_eq!(logs.iter().filter(|l| l["success"] == json!(true)).count(), 1);
    assert!(logs
        .iter()
        .any(|l| l["email"] == json!("nobody@example.com") && l["userId"].is_null()));
    assert!(logs.iter().all(|l| l["ipAddress"] == json!("127.0.0.1")));

    // Stored users never expose their password hash
    let resp = client
        .get(server.url("/api/users"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let users: Value = resp.json().await.unwrap();
    assert_eq!(users["data"].as_array().unwrap().len(), 1);
    assert!(users["data"][0].get("password").is_none());
    assert_eq!(users["data"][0]["email"], json!("ada@example.com"));
}

#[tokio::test]
async fn test_unknown_email_still_runs_bcrypt() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();
    register_user(&client, &server, "Ada", "ada@example.com").await;
    assert!(!server.state.login_decoy.initialized());

    let resp = client
        .post(server.url("/api/auth/login"))
        .json(&json!({ "email": "nobody@example.com", "password": "guess" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], json!("Invalid email or password"));
    assert!(server.state.login_decoy.initialized());
}

#[tokio::test]
async fn test_event_crud_and_activity_log() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();
    let (token, user_id) = register_user(&client, &server, "Grace", "grace@example.com").await;

    // Missing required field
    let resp = client
        .post(server.url("/api/events"))
        .bearer_auth(&token)
        .json(&json!({ "room": "A1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(server.url("/api/events"))
        .bearer_auth(&token)
        .json(&json!({ "title": "Planning", "room": "A1", "seats": 8, "id": "forged" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let created: Value = resp.json().await.unwrap();
    let event_id = created["data"]["id"].as_str().unwrap().to_string();
    assert_ne!(event_id, "forged");
    assert_eq!(created["data"]["createdBy"], json!(user_id));

    client
        .post(server.url("/api/events"))
        .bearer_auth(&token)
        .json(&json!({ "title": "Retro", "room": "B2" }))
        .send()
        .await
        .unwrap();

    // Newest first, then filtered
    let all: Value = client
        .get(server.url("/api/events"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all["data"].as_array().unwrap().len(), 2);
    assert_eq!(all["data"][0]["title"], json!("Retro"));

    let filtered: Value = client
        .get(server.url("/api/events?room=A1&seats=8"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(filtered["data"].as_array().unwrap().len(), 1);
    assert_eq!(filtered["data"][0]["id"], json!(event_id));

    let resp = client
        .put(server.url(&format!("/api/events/{}", event_id)))
        .bearer_auth(&token)
        .json(&json!({ "room": "C3", "seats": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["data"]["title"], json!("Planning"));
    assert_eq!(updated["data"]["room"], json!("C3"));
    assert!(updated["data"].get("seats").is_none());

    let resp = client
        .delete(server.url(&format!("/api/events/{}", event_id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(server.url(&format!("/api/events/{}", event_id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client
        .put(server.url(&format!("/api/events/{}", event_id)))
        .bearer_auth(&token)
        .json(&json!({ "room": "D4" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let logs: Value = client
        .get(server.url(&format!(
            "/api/user-activity-logs?resource=events&resourceId={}",
            event_id
        )))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let actions: Vec<&str> = logs["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["delete", "update", "create"]);
}

#[tokio::test]
async fn test_update_cannot_clear_required_fields() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();
    let (token, _) = register_user(&client, &server, "Grace", "grace@example.com").await;

    let created: Value = client
        .post(server.url("/api/events"))
        .bearer_auth(&token)
        .json(&json!({ "title": "Planning", "room": "A1" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let url = server.url(&format!("/api/events/{}", created["data"]["id"].as_str().unwrap()));

    for patch in [json!({ "title": null }), json!({ "title": "   " }), json!({ "title": "" })] {
        let resp = client
            .put(&url)
            .bearer_auth(&token)
            .json(&patch)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "patch {} should be rejected", patch);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], json!(false));
    }

    let stored: Value = client
        .get(&url)
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored["data"]["title"], json!("Planning"));
    assert_eq!(stored["data"]["room"], json!("A1"));
}

#[tokio::test]
async fn test_author_fields_come_from_token() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();
    let (token, user_id) = register_user(&client, &server, "Grace", "grace@example.com").await;

    let resp = client
        .post(server.url("/api/events"))
        .bearer_auth(&token)
        .json(&json!({ "title": "Planning", "createdBy": "someone-else" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let event: Value = resp.json().await.unwrap();
    assert_eq!(event["data"]["createdBy"], json!(user_id));

    let resp = client
        .post(server.url("/api/messages"))
        .bearer_auth(&token)
        .json(&json!({ "conversationId": "c1", "content": "hi", "senderId": "someone-else" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let message: Value = resp.json().await.unwrap();
    assert_eq!(message["data"]["senderId"], json!(user_id));

    // Reassigning the author on update is ignored
    let resp = client
        .put(server.url(&format!("/api/events/{}", event["data"]["id"].as_str().unwrap())))
        .bearer_auth(&token)
        .json(&json!({ "createdBy": "someone-else", "room": "B2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["data"]["createdBy"], json!(user_id));
    assert_eq!(updated["data"]["room"], json!("B2"));
}

#[tokio::test]
async fn test_user_update_hashes_password_and_checks_email() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();
    let (token, user_id) = register_user(&client, &server, "Lin", "lin@example.com").await;
    register_user(&client, &server, "Sam", "sam@example.com").await;

    let resp = client
        .put(server.url(&format!("/api/users/{}", user_id)))
        .bearer_auth(&token)
        .json(&json!({ "email": "sam@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    let resp = client
        .put(server.url(&format!("/api/users/{}", user_id)))
        .bearer_auth(&token)
        .json(&json!({ "password": "new secret" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .post(server.url("/api/auth/login"))
        .json(&json!({ "email": "lin@example.com", "password": "new secret" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_malformed_body_is_a_validation_error() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();
    let (token, _) = register_user(&client, &server, "Kim", "kim@example.com").await;

    let resp = client
        .post(server.url("/api/departments"))
        .bearer_auth(&token)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(server.url("/api/departments"))
        .bearer_auth(&token)
        .json(&json!(["name"]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_concurrent_manual_cleanups_both_succeed() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();
    let (token, _) = register_user(&client, &server, "Ops", "ops@example.com").await;

    client
        .post(server.url("/api/notifications"))
        .bearer_auth(&token)
        .json(&json!({
            "userId": "u1",
            "message": "expired",
            "expiresAt": "2000-01-01T00:00:00.000Z",
        }))
        .send()
        .await
        .unwrap();

    let first = client
        .post(server.url("/api/cleanup-now"))
        .bearer_auth(&token)
        .send();
    let second = client
        .post(server.url("/api/cleanup-now"))
        .bearer_auth(&token)
        .send();
    let (first, second) = tokio::join!(first, second);
    let (first, second) = (first.unwrap(), second.unwrap());
    assert_eq!(first.status(), 200);
    assert_eq!(second.status(), 200);

    let a: Value = first.json().await.unwrap();
    let b: Value = second.json().await.unwrap();
    assert_eq!(a["success"], json!(true));
    assert_eq!(b["success"], json!(true));

    // Exactly one of the two passes removed the expired notification
    let removed = a["result"]["expired"].as_u64().unwrap() + b["result"]["expired"].as_u64().unwrap();
    assert_eq!(removed, 1);

    let notes: Value = client
        .get(server.url("/api/notifications"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(notes["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_cors_origin_gate() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(server.url("/api/health"))
        .header("Origin", "http://evil.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = client
        .get(server.url("/api/health"))
        .header("Origin", "http://localhost:3000")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:3000")
    );
}

#[tokio::test]
async fn test_uploads_are_served() {
    let server = start_test_server().await;
    std::fs::write(server.uploads_dir.join("agenda.txt"), "9am standup").unwrap();

    let resp = reqwest::get(server.url("/uploads/agenda.txt")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "9am standup");

    let resp = reqwest::get(server.url("/uploads/missing.txt")).await.unwrap();
    assert_eq!(resp.status(), 404);
}
