//! Shared harness: a real server on an ephemeral port backed by a temp database.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;

use eventdesk_server::config::Config;
use eventdesk_server::state::AppState;

pub struct TestServer {
    pub base_url: String,
    pub addr: SocketAddr,
    pub state: AppState,
    pub uploads_dir: PathBuf,
    _tmp_dir: tempfile::TempDir,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Start the server on a random port and return its handle.
pub async fn start_test_server() -> TestServer {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = tmp_dir.path().join("eventdesk.db");
    let uploads_dir = tmp_dir.path().join("uploads");
    std::fs::create_dir_all(&uploads_dir).expect("Failed to create uploads dir");

    let config = Config {
        database_url: Some(format!("sqlite://{}", db_path.display())),
        jwt_secret: Some("integration-test-secret".to_string()),
        uploads_dir: uploads_dir.to_string_lossy().into_owned(),
        bcrypt_cost: 4,
        ..Config::default()
    };

    let db = eventdesk_server::db::init_db(config.database_url.as_deref().unwrap())
        .expect("Failed to init DB");
    let jwt_secret =
        eventdesk_server::auth::jwt::resolve_jwt_secret(config.jwt_secret.as_deref());
    let state = AppState::new(db, jwt_secret, &config);

    let app = eventdesk_server::routes::build_router(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestServer {
        base_url: format!("http://{}", addr),
        addr,
        state,
        uploads_dir,
        _tmp_dir: tmp_dir,
    }
}

/// Register a user and return (token, user id).
pub async fn register_user(
    client: &reqwest::Client,
    server: &TestServer,
    name: &str,
    email: &str,
) -> (String, String) {
    let resp = client
        .post(server.url("/api/auth/register"))
        .json(&json!({ "name": name, "email": email, "password": "correct horse" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201, "register should succeed");

    let body: Value = resp.json().await.unwrap();
    let token = body["data"]["token"].as_str().unwrap().to_string();
    let user_id = body["data"]["user"]["id"].as_str().unwrap().to_string();
    (token, user_id)
}
