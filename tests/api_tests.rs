//! HTTP surface tests against the real router.
//!
//! Each test binds the app (and, where needed, a stand-in for the upstream
//! exam service) on an ephemeral port and drives it with a plain HTTP client.

use std::sync::Arc;

use axum::{routing::post, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use tempfile::TempDir;

use exam_practice::api::create_router;
use exam_practice::config::{Config, CrawlConfig, ExamConfig, ServerConfig, TokenConfig};
use exam_practice::crawl::UpstreamClient;
use exam_practice::crypto;
use exam_practice::storage::models::{Answer, Question, QuestionType, TokenPair};
use exam_practice::storage::Database;
use exam_practice::tokens;
use exam_practice::users;
use exam_practice::AppState;

const KNOWN_ID: &str = "110101199003074258";

fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::open(temp_dir.path()).unwrap();
    (db, temp_dir)
}

fn make_question(pid: &str, course: i32, subject: i32) -> Question {
    let now_ms = Utc::now().timestamp_millis();
    Question {
        answer: Answer::Flat(vec!["1".to_string()]),
        content: format!("question {pid}"),
        course,
        crawl_count: 1,
        crawl_time: now_ms,
        created_time: now_ms,
        done_count: 0,
        incorrect_count: 0,
        options: None,
        pid: pid.to_string(),
        qtype: QuestionType::SingleChoice,
        status: true,
        sub_options: None,
        subject,
        unique_code: crypto::generate_unique_code(),
        updated_time: now_ms,
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Serve the full application router around the given database.
async fn serve_app(db: Database, upstream_base: &str) -> String {
    let config = Config {
        crawl: CrawlConfig {
            base_url: upstream_base.to_string(),
            times_per_round: 1,
        },
        exam: ExamConfig {
            exam_time: "2027-05-15".to_string(),
            exam_trust: false,
        },
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: "/tmp/test".to_string(),
        },
        tokens: TokenConfig::default(),
    };
    let state = Arc::new(AppState {
        config,
        db,
        upstream: UpstreamClient::new(upstream_base),
    });
    serve(create_router(state)).await
}

/// Stand-in for the upstream verify endpoint: recognizes exactly one
/// credential and rejects everything else.
async fn spawn_upstream_stub() -> String {
    async fn verify(Json(body): Json<Value>) -> Json<Value> {
        let sfz = body["sfz"].as_str().unwrap_or_default();
        if sfz == KNOWN_ID {
            Json(json!({
                "data": { "outmap": {
                    "err": "success",
                    "xs": { "xm": "张三", "xx": "一中", "zy": "美术" }
                } }
            }))
        } else {
            Json(json!({ "data": { "outmap": { "err": "身份证错误！" } } }))
        }
    }
    serve(Router::new().route("/test32UserLogin", post(verify))).await
}

/// Fetch the login public key (creating the key pair), then encrypt a
/// credential under the same rotation window the server will decrypt with.
async fn encrypt_credential(http: &reqwest::Client, base: &str, db: &Database, text: &str) -> String {
    let _: Value = http
        .get(format!("{base}/auth/login"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ttl = TokenConfig::default().login_key_ttl_seconds;
    crypto::encrypt(db, ttl, text).unwrap()
}

#[tokio::test]
async fn test_stale_cursor_page_keeps_sequence() {
    let (db, _temp) = setup_db();
    for i in 1..=12 {
        db.put_question(&make_question(&format!("q{i:02}"), 1, 2)).unwrap();
    }
    let base = serve_app(db, "http://127.0.0.1:1").await;

    let body: Value = client()
        .get(format!(
            "{base}/question/practice?course=1&subject=2&next_pid=gone"
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["code"], 200);
    let data = &body["data"];
    // The page is empty but the full sequence still ships, so a client can
    // recover by jumping to an index
    assert_eq!(data["questions"].as_array().unwrap().len(), 0);
    assert_eq!(data["sequence"].as_array().unwrap().len(), 12);
    assert_eq!(data["stat"]["total_questions"], 12);
    assert!(data["next_pid"].is_null());
    assert!(data["prev_pid"].is_null());
}

#[tokio::test]
async fn test_first_login_registers_then_reuses_account() {
    let (db, _temp) = setup_db();
    let db_handle = db.clone();
    let upstream = spawn_upstream_stub().await;
    let base = serve_app(db, &upstream).await;
    let http = client();

    let id_enc = encrypt_credential(&http, &base, &db_handle, KNOWN_ID).await;
    let pw_enc = encrypt_credential(&http, &base, &db_handle, "123456").await;

    let first: Value = http
        .post(format!("{base}/auth/login"))
        .json(&json!({ "id_number": id_enc, "password": pw_enc }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first["code"], 200);
    assert_eq!(first["data"]["type"], "register");
    assert!(!first["data"]["access_token"].as_str().unwrap().is_empty());
    assert_eq!(db_handle.count_users().unwrap(), 1);

    let second: Value = http
        .post(format!("{base}/auth/login"))
        .json(&json!({
            "id_number": encrypt_credential(&http, &base, &db_handle, KNOWN_ID).await,
            "password": encrypt_credential(&http, &base, &db_handle, "123456").await,
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["data"]["type"], "login");
    assert_eq!(db_handle.count_users().unwrap(), 1);
}

#[tokio::test]
async fn test_login_rejects_non_numeric_password() {
    let (db, _temp) = setup_db();
    let db_handle = db.clone();
    let base = serve_app(db, "http://127.0.0.1:1").await;
    let http = client();

    let resp = http
        .post(format!("{base}/auth/login"))
        .json(&json!({
            "id_number": encrypt_credential(&http, &base, &db_handle, KNOWN_ID).await,
            "password": encrypt_credential(&http, &base, &db_handle, "12345a").await,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], 400);
    assert_eq!(body["data"]["type"], "password_illegal");
}

#[tokio::test]
async fn test_login_unknown_credential_is_rejected() {
    let (db, _temp) = setup_db();
    let db_handle = db.clone();
    let upstream = spawn_upstream_stub().await;
    let base = serve_app(db, &upstream).await;
    let http = client();

    let resp = http
        .post(format!("{base}/auth/login"))
        .json(&json!({
            "id_number": encrypt_credential(&http, &base, &db_handle, "999999199001011234").await,
            "password": encrypt_credential(&http, &base, &db_handle, "123456").await,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["type"], "no_detected");
    assert_eq!(db_handle.count_users().unwrap(), 0);
}

#[tokio::test]
async fn test_admin_manages_crawl_credentials() {
    let (db, _temp) = setup_db();
    let admin = users::create_user(&db, KNOWN_ID, "张三", "123456", "一中", "美术", None).unwrap();
    users::update_permission(&db, &admin.uuid, 10).unwrap();
    let issued = tokens::generate_tokens(&db, &TokenConfig::default(), &admin.uuid).unwrap();

    let base = serve_app(db, "http://127.0.0.1:1").await;
    let http = client();

    let saved: Value = http
        .post(format!("{base}/admin/request"))
        .header("Authorization", format!("Bearer {}", issued.access_token))
        .json(&json!({
            "op": "add", "course": 2, "subject": 7,
            "id_number": KNOWN_ID, "profession_name": "美术"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(saved["data"]["saved"], true);

    let removed: Value = http
        .post(format!("{base}/admin/request"))
        .header("Authorization", format!("Bearer {}", issued.access_token))
        .json(&json!({ "op": "delete", "course": 2, "subject": 7 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(removed["data"]["removed"], true);

    // Deleting a row that is already gone reports false, not an error
    let again: Value = http
        .post(format!("{base}/admin/request"))
        .header("Authorization", format!("Bearer {}", issued.access_token))
        .json(&json!({ "op": "delete", "course": 2, "subject": 7 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(again["data"]["removed"], false);
}

#[tokio::test]
async fn test_guard_missing_token_is_soft_error() {
    let (db, _temp) = setup_db();
    let base = serve_app(db, "http://127.0.0.1:1").await;

    let resp = client()
        .get(format!("{base}/user/profile"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], 401);
    assert_eq!(body["data"]["type"], "lack_token");
}

#[tokio::test]
async fn test_guard_undecodable_recorded_token_is_unexpected_error() {
    let (db, _temp) = setup_db();
    let now_ms = Utc::now().timestamp_millis();
    // A pair on record whose access half is not a decodable token
    db.put_token_pair(&TokenPair {
        access_token: "not-a-jwt".to_string(),
        access_token_expiry: now_ms + 60_000,
        refresh_token: "r-1".to_string(),
        refresh_token_expiry: now_ms + 60_000,
        uuid: "u-1".to_string(),
    })
    .unwrap();
    let base = serve_app(db, "http://127.0.0.1:1").await;

    let resp = client()
        .get(format!("{base}/user/profile"))
        .header("Authorization", "Bearer not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], 500);
    assert_eq!(body["data"]["type"], "unexpected_error");
}
