use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use daily_poster::{
    feishu::{FeishuClient, FeishuError},
    pipeline::FeishuMessenger,
    Config, Describer, Poster, RunOutcome,
};
use series_scraper::AiError;
use serde_json::{json, Value};
use tokio::net::TcpListener;

const TOKEN: &str = "t-abc";
const PNG: &[u8] = b"\x89PNG fake image bytes";

#[derive(Clone, Default)]
struct Seen {
    uploads: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    messages: Arc<Mutex<Vec<(HashMap<String, String>, Value)>>>,
}

async fn token(Json(body): Json<Value>) -> Json<Value> {
    if body["app_id"] == "cli_app" && body["app_secret"] == "good" {
        Json(json!({ "code": 0, "msg": "ok", "tenant_access_token": TOKEN, "expire": 7200 }))
    } else {
        Json(json!({ "code": 10014, "msg": "app secret invalid" }))
    }
}

async fn image_file() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/png")], PNG)
}

async fn upload(State(seen): State<Seen>, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    seen.uploads.lock().unwrap().push((auth, body.to_vec()));
    Json(json!({ "code": 0, "msg": "success", "data": { "image_key": "img_v3_key" } }))
}

async fn message(
    State(seen): State<Seen>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let rejected = body["receive_id"] == "oc_not_member";
    seen.messages.lock().unwrap().push((query, body));
    if rejected {
        Json(json!({ "code": 230002, "msg": "bot is not in the chat" }))
    } else {
        Json(json!({ "code": 0, "msg": "success", "data": {} }))
    }
}

async fn spawn_backend() -> (String, Seen) {
    let seen = Seen::default();
    let app = Router::new()
        .route(
            "/open-apis/auth/v3/tenant_access_token/internal",
            post(token),
        )
        .route("/open-apis/im/v1/images", post(upload))
        .route("/open-apis/im/v1/messages", post(message))
        .route("/img/car~1200x0.png", get(image_file))
        .route(
            "/img/gone.png",
            get(|| async { StatusCode::NOT_FOUND }),
        )
        .with_state(seen.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), seen)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[tokio::test]
async fn token_requires_code_zero() {
    let (base, _) = spawn_backend().await;
    let client = FeishuClient::new(reqwest::Client::new(), &base);

    assert_eq!(
        client.tenant_access_token("cli_app", "good").await.unwrap(),
        TOKEN
    );

    let err = client
        .tenant_access_token("cli_app", "wrong")
        .await
        .unwrap_err();
    assert!(matches!(err, FeishuError::Api { code: 10014, .. }));
}

#[tokio::test]
async fn image_is_downloaded_then_uploaded_as_multipart() {
    let (base, seen) = spawn_backend().await;
    let client = FeishuClient::new(reqwest::Client::new(), format!("{base}/"));

    let key = client
        .upload_image_from_url(TOKEN, &format!("{base}/img/car~1200x0.png"))
        .await
        .unwrap();
    assert_eq!(key, "img_v3_key");

    let uploads = seen.uploads.lock().unwrap();
    let (auth, body) = &uploads[0];
    assert_eq!(auth, &format!("Bearer {TOKEN}"));
    assert!(contains(body, b"name=\"image_type\""));
    assert!(contains(body, b"message"));
    assert!(contains(body, b"filename=\"image.png\""));
    assert!(contains(body, PNG));
}

#[tokio::test]
async fn broken_image_link_never_reaches_upload() {
    let (base, seen) = spawn_backend().await;
    let client = FeishuClient::new(reqwest::Client::new(), &base);

    let err = client
        .upload_image_from_url(TOKEN, &format!("{base}/img/gone.png"))
        .await
        .unwrap_err();
    assert!(matches!(err, FeishuError::Http(_)));
    assert!(seen.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn card_is_sent_as_interactive_json_string() {
    let (base, seen) = spawn_backend().await;
    let client = FeishuClient::new(reqwest::Client::new(), &base);
    let card = json!({ "header": { "title": { "content": "每日车系介绍：海豹" } } });

    client.send_card(TOKEN, "oc_group", &card).await.unwrap();

    let messages = seen.messages.lock().unwrap();
    let (query, body) = &messages[0];
    assert_eq!(query.get("receive_id_type").map(String::as_str), Some("chat_id"));
    assert_eq!(body["receive_id"], "oc_group");
    assert_eq!(body["msg_type"], "interactive");
    let content: Value = serde_json::from_str(body["content"].as_str().unwrap()).unwrap();
    assert_eq!(content, card);
}

#[tokio::test]
async fn business_error_on_send_is_reported() {
    let (base, _) = spawn_backend().await;
    let client = FeishuClient::new(reqwest::Client::new(), &base);

    let err = client
        .send_card(TOKEN, "oc_not_member", &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, FeishuError::Api { code: 230002, .. }));
}

struct CannedDescriber;

#[async_trait]
impl Describer for CannedDescriber {
    async fn describe(&self, _series_name: &str) -> Result<String, AiError> {
        Ok("#外观\n-大气".into())
    }
}

fn config(base: &str, chat_id: &str) -> Config {
    let vars: HashMap<&str, String> = HashMap::from([
        ("FEISHU_APP_ID", "cli_app".to_string()),
        ("FEISHU_APP_SECRET", "good".to_string()),
        ("FEISHU_CHAT_ID", chat_id.to_string()),
        ("GEMINI_API_KEY", "unused".to_string()),
        ("FEISHU_BASE_URL", base.to_string()),
    ]);
    Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

#[tokio::test]
async fn full_run_against_backend() {
    let (base, seen) = spawn_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let table = dir.path().join("series_url.csv");
    let sent_log = dir.path().join("sent.txt");
    fs::write(
        &table,
        format!("\u{feff}id,outter_name,image_url\n4363,海豹,{base}/img/car~1200x0.png\n"),
    )
    .unwrap();

    let config = config(&base, "oc_group");
    let messenger = FeishuMessenger::new(
        FeishuClient::new(reqwest::Client::new(), &config.feishu_base_url),
        &config,
    );
    let poster = Poster::new(&CannedDescriber, &messenger, &config.series_base_url);

    let outcome = poster
        .run(&table, &sent_log, &mut rand::rng())
        .await
        .unwrap();
    assert_eq!(outcome, RunOutcome::Posted { id: "4363".into() });
    assert_eq!(fs::read_to_string(&sent_log).unwrap(), "4363\n");

    let messages = seen.messages.lock().unwrap();
    let card: Value = serde_json::from_str(messages[0].1["content"].as_str().unwrap()).unwrap();
    assert_eq!(card["elements"][0]["img_key"], "img_v3_key");
    assert_eq!(
        card["elements"][3]["actions"][0]["url"],
        "https://www.dongchedi.com/auto/series/4363"
    );
    assert_eq!(card["elements"][4]["content"], "# 外观\n- 大气");
}

#[tokio::test]
async fn rejected_send_keeps_series_eligible() {
    let (base, _) = spawn_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let table = dir.path().join("series_url.csv");
    let sent_log = dir.path().join("sent.txt");
    fs::write(
        &table,
        format!("id,outter_name,image_url\n4363,海豹,{base}/img/car~1200x0.png\n"),
    )
    .unwrap();

    let config = config(&base, "oc_not_member");
    let messenger = FeishuMessenger::new(
        FeishuClient::new(reqwest::Client::new(), &config.feishu_base_url),
        &config,
    );
    let poster = Poster::new(&CannedDescriber, &messenger, &config.series_base_url);

    assert!(poster
        .run(&table, &sent_log, &mut rand::rng())
        .await
        .is_err());
    assert!(!sent_log.exists());
}
