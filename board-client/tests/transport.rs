use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use board_client::{
    BoardClient, BoardClientError, ClientConfig, CommentDraft, DeleteOutcome, ListStatus,
    QueryState, Session, SessionStore, SyncOutcome, UserIdentity,
};

#[derive(Clone, Default)]
struct Stub {
    auth_headers: Arc<Mutex<Vec<Option<String>>>>,
    keywords: Arc<Mutex<Vec<String>>>,
}

impl Stub {
    fn auth_headers(&self) -> Vec<Option<String>> {
        self.auth_headers
            .lock()
            .expect("auth_headers mutex poisoned")
            .clone()
    }

    fn record(&self, headers: &HeaderMap) {
        let header = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        self.auth_headers
            .lock()
            .expect("auth_headers mutex poisoned")
            .push(header);
    }
}

fn user_json() -> Value {
    json!({
        "id": 1,
        "userId": "kim01",
        "nickname": "kim",
        "email": "kim@example.com",
        "profileImageUrl": null,
        "role": "USER",
        "createdAt": null
    })
}

fn page_json(titles: &[&str]) -> Value {
    let content: Vec<Value> = titles
        .iter()
        .enumerate()
        .map(|(idx, title)| {
            json!({
                "boardId": idx as i64 + 1,
                "title": title,
                "authorNickname": "kim",
                "viewCount": 0,
                "likeCount": 0,
                "commentCount": 0,
                "thumbnailUrl": null,
                "createdAt": "2026-01-01T10:00:00"
            })
        })
        .collect();

    json!({
        "content": content,
        "totalPages": 1,
        "totalElements": titles.len(),
        "size": 10,
        "number": 0,
        "first": true,
        "last": true,
        "empty": titles.is_empty()
    })
}

fn detail_json(id: i64) -> Value {
    json!({
        "boardId": id,
        "title": "hello",
        "content": "body",
        "authorNickname": "kim",
        "viewCount": 1,
        "likeCount": 4,
        "liked": false,
        "images": [],
        "commentCount": 1,
        "createdAt": "2026-01-01T10:00:00",
        "updatedAt": "2026-01-01T10:00:00"
    })
}

fn comment_json(id: i64) -> Value {
    json!({
        "commentId": id,
        "content": "first!",
        "authorNickname": "kim",
        "authorProfileImageUrl": null,
        "images": [],
        "createdAt": "2026-01-01T10:00:00",
        "updatedAt": "2026-01-01T10:00:00"
    })
}

async fn login() -> Json<Value> {
    Json(json!({ "token": "tok-1", "user": user_json() }))
}

async fn me() -> StatusCode {
    StatusCode::UNAUTHORIZED
}

async fn list_boards(State(stub): State<Stub>, headers: HeaderMap) -> Json<Value> {
    stub.record(&headers);
    Json(page_json(&["first", "second"]))
}

async fn search_boards(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    stub.record(&headers);
    let keyword = params.get("keyword").cloned().unwrap_or_default();
    stub.keywords
        .lock()
        .expect("keywords mutex poisoned")
        .push(keyword.clone());
    Json(page_json(&[keyword.as_str()]))
}

async fn get_board(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    stub.record(&headers);
    match id {
        401 => StatusCode::UNAUTHORIZED.into_response(),
        404 => (StatusCode::NOT_FOUND, Json(json!({ "message": "gone" }))).into_response(),
        _ => Json(detail_json(id)).into_response(),
    }
}

async fn toggle_like(State(stub): State<Stub>, headers: HeaderMap) -> Json<bool> {
    stub.record(&headers);
    Json(true)
}

async fn list_comments() -> Json<Value> {
    Json(json!([comment_json(10)]))
}

async fn delete_comment() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn spawn_stub() -> (String, Stub) {
    let stub = Stub::default();
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/boards", get(list_boards))
        .route("/api/boards/search", get(search_boards))
        .route("/api/boards/{id}", get(get_board))
        .route("/api/boards/{id}/like", post(toggle_like))
        .route("/api/boards/{id}/comments", get(list_comments))
        .route(
            "/api/boards/{id}/comments/{comment_id}",
            delete(delete_comment),
        )
        .with_state(stub.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("stub must bind");
    let addr = listener.local_addr().expect("stub must have address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub must serve");
    });

    (format!("http://{addr}/api"), stub)
}

fn client(base_url: String) -> BoardClient {
    BoardClient::new(ClientConfig::new(base_url), SessionStore::in_memory())
        .expect("client must build")
}

fn sample_user() -> UserIdentity {
    serde_json::from_value(user_json()).expect("user must parse")
}

#[tokio::test]
async fn login_stores_session_and_attaches_token() {
    let (base_url, stub) = spawn_stub().await;
    let client = client(base_url);

    let sync = client.list_synchronizer();
    sync.refresh(&QueryState::all())
        .await
        .expect("anonymous list must succeed");

    let auth = client
        .login("kim01", "password123")
        .await
        .expect("login must succeed");
    assert_eq!(auth.token, "tok-1");
    assert_eq!(client.session().token().as_deref(), Some("tok-1"));
    assert_eq!(client.session().user().map(|u| u.id), Some(1));

    sync.refresh(&QueryState::all())
        .await
        .expect("authenticated list must succeed");

    assert_eq!(
        stub.auth_headers(),
        vec![None, Some("Bearer tok-1".to_string())]
    );
}

#[tokio::test]
async fn unauthorized_clears_session_from_any_endpoint() {
    let (base_url, stub) = spawn_stub().await;
    let client = client(base_url);
    client
        .session()
        .set(Session::authenticated("stale", sample_user()));
    let mut rx = client.session().subscribe();
    rx.borrow_and_update();

    let err = client
        .api()
        .transport()
        .get::<Value>("/boards/401")
        .await
        .expect_err("401 must fail");
    assert!(matches!(err, BoardClientError::SessionExpired));
    assert!(err.is_handled_globally());

    assert!(!client.session().is_logged_in());
    assert!(rx.has_changed().expect("store alive"));
    assert!(!rx.borrow_and_update().is_authenticated());

    client
        .list_synchronizer()
        .refresh(&QueryState::all())
        .await
        .expect("list must succeed");
    assert_eq!(
        stub.auth_headers(),
        vec![Some("Bearer stale".to_string()), None]
    );
}

#[tokio::test]
async fn profile_expiry_logs_out() {
    let (base_url, _stub) = spawn_stub().await;
    let client = client(base_url);
    client
        .session()
        .set(Session::authenticated("stale", sample_user()));

    let err = client.me().await.expect_err("me must fail");
    assert!(matches!(err, BoardClientError::SessionExpired));
    assert!(!client.session().is_logged_in());
}

#[tokio::test]
async fn not_found_keeps_session() {
    let (base_url, _stub) = spawn_stub().await;
    let client = client(base_url);
    client
        .session()
        .set(Session::authenticated("tok-1", sample_user()));

    let result = client.open_post(404).await;
    assert!(matches!(result, Err(BoardClientError::NotFound)));
    assert!(client.session().is_logged_in());
}

#[tokio::test]
async fn search_keyword_is_url_encoded() {
    let (base_url, stub) = spawn_stub().await;
    let client = client(base_url);
    let mut controller = client.query_controller("");
    let query = controller
        .submit_keyword("  a&b=c 100%  ")
        .expect("search must change url");

    let sync = client.list_synchronizer();
    let outcome = sync.refresh(&query).await.expect("search must succeed");
    assert_eq!(outcome, SyncOutcome::Applied);

    let keywords = stub
        .keywords
        .lock()
        .expect("keywords mutex poisoned")
        .clone();
    assert_eq!(keywords, vec!["a&b=c 100%".to_string()]);

    let view = sync.snapshot();
    assert_eq!(view.status, ListStatus::Loaded);
    assert_eq!(
        view.page.expect("page must be loaded").items[0].title,
        "a&b=c 100%"
    );
}

#[tokio::test]
async fn detail_like_and_comment_delete_over_http() {
    let (base_url, _stub) = spawn_stub().await;
    let client = client(base_url);
    client
        .session()
        .set(Session::authenticated("tok-1", sample_user()));

    let detail = client.open_post(1).await.expect("detail must load");
    let view = detail.snapshot();
    assert_eq!(view.post.like_count, 4);
    assert_eq!(view.comments.len(), 1);
    assert!(view.comments[0].author_id.is_none());
    assert!(detail.can_edit(&view.comments[0]));

    assert!(detail.toggle_like().await.expect("like must succeed"));
    let view = detail.snapshot();
    assert!(view.post.is_liked);
    assert_eq!(view.post.like_count, 5);

    let outcome = detail
        .delete_comment(10, |_| true)
        .await
        .expect("delete must succeed");
    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert_eq!(detail.snapshot().post.comment_count, 0);

    let err = detail
        .create_comment(CommentDraft::text(""))
        .await
        .expect_err("blank comment must fail");
    assert!(matches!(err, BoardClientError::Validation(_)));
}
