use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::oneshot;

use crate::api::BoardApi;
use crate::error::{BoardClientError, BoardClientResult};
use crate::models::{Comment, CommentDraft, Page, PostDetail, PostSummary, UserIdentity};

pub(crate) fn sample_user(id: i64) -> UserIdentity {
    UserIdentity {
        id,
        login_id: format!("user{id}"),
        nickname: format!("nick{id}"),
        email: format!("user{id}@example.com"),
        profile_image_url: None,
        role: "USER".to_string(),
        created_at: None,
    }
}

fn sample_time() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 1, 1)
        .and_then(|date| date.and_hms_opt(12, 0, 0))
        .expect("valid timestamp")
}

pub(crate) fn sample_summary(id: i64) -> PostSummary {
    PostSummary {
        id,
        title: format!("post {id}"),
        author_nickname: "nick1".to_string(),
        view_count: 0,
        like_count: 0,
        comment_count: 0,
        thumbnail_url: None,
        category_name: None,
        created_at: sample_time(),
    }
}

pub(crate) fn sample_page(ids: &[i64], page_index: u32, total_pages: u32) -> Page<PostSummary> {
    Page {
        items: ids.iter().copied().map(sample_summary).collect(),
        page_index,
        total_pages,
        total_elements: ids.len() as u64,
        is_first: page_index == 0,
        is_last: page_index + 1 >= total_pages,
    }
}

pub(crate) fn sample_detail(
    id: i64,
    like_count: u64,
    is_liked: bool,
    comment_count: u64,
) -> PostDetail {
    PostDetail {
        id,
        title: format!("post {id}"),
        content: "body".to_string(),
        author_id: Some(1),
        author_nickname: "nick1".to_string(),
        author_profile_image_url: None,
        view_count: 0,
        like_count,
        is_liked,
        images: Vec::new(),
        comment_count,
        category_name: None,
        created_at: sample_time(),
        updated_at: None,
    }
}

pub(crate) fn sample_comment(id: i64, author_id: i64) -> Comment {
    Comment {
        id,
        content: format!("comment {id}"),
        author_id: Some(author_id),
        author_nickname: format!("nick{author_id}"),
        author_profile_image_url: None,
        images: Vec::new(),
        created_at: sample_time(),
        updated_at: None,
    }
}

fn server_error() -> BoardClientError {
    BoardClientError::Server {
        status: 500,
        message: "boom".to_string(),
    }
}

/// Фейковый API со сценариями, задаваемыми из теста.
#[derive(Clone, Default)]
pub(crate) struct FakeBoardApi {
    calls: Arc<Mutex<Vec<String>>>,
    pages: Arc<Mutex<HashMap<String, Page<PostSummary>>>>,
    gates: Arc<Mutex<HashMap<String, oneshot::Receiver<()>>>>,
    fail_lists: Arc<Mutex<bool>>,
    detail: Arc<Mutex<Option<PostDetail>>>,
    comments: Arc<Mutex<Vec<Comment>>>,
    fail_comments: Arc<Mutex<bool>>,
    like_result: Arc<Mutex<Option<bool>>>,
    like_gate: Arc<Mutex<Option<oneshot::Receiver<()>>>>,
    fail_mutations: Arc<Mutex<bool>>,
}

impl FakeBoardApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    pub(crate) fn set_page(&self, key: &str, page: Page<PostSummary>) {
        self.pages
            .lock()
            .expect("pages mutex poisoned")
            .insert(key.to_string(), page);
    }

    /// Запрос с ключом `key` будет ждать, пока не отпустят `gate`.
    pub(crate) fn gate(&self, key: &str, gate: oneshot::Receiver<()>) {
        self.gates
            .lock()
            .expect("gates mutex poisoned")
            .insert(key.to_string(), gate);
    }

    pub(crate) fn fail_lists(&self, fail: bool) {
        *self.fail_lists.lock().expect("fail_lists mutex poisoned") = fail;
    }

    pub(crate) fn set_detail(&self, detail: PostDetail) {
        *self.detail.lock().expect("detail mutex poisoned") = Some(detail);
    }

    pub(crate) fn set_comments(&self, comments: Vec<Comment>) {
        *self.comments.lock().expect("comments mutex poisoned") = comments;
    }

    pub(crate) fn fail_comments(&self, fail: bool) {
        *self.fail_comments
            .lock()
            .expect("fail_comments mutex poisoned") = fail;
    }

    pub(crate) fn set_like_result(&self, result: Result<bool, ()>) {
        *self.like_result.lock().expect("like_result mutex poisoned") = result.ok();
    }

    /// Следующий запрос лайка будет ждать, пока не отпустят `gate`.
    pub(crate) fn gate_like(&self, gate: oneshot::Receiver<()>) {
        *self.like_gate.lock().expect("like_gate mutex poisoned") = Some(gate);
    }

    pub(crate) fn fail_mutations(&self, fail: bool) {
        *self.fail_mutations
            .lock()
            .expect("fail_mutations mutex poisoned") = fail;
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("calls mutex poisoned").push(call);
    }

    fn mutations_fail(&self) -> bool {
        *self.fail_mutations
            .lock()
            .expect("fail_mutations mutex poisoned")
    }

    async fn page(&self, key: String, page_index: u32) -> BoardClientResult<Page<PostSummary>> {
        self.record(key.clone());

        let gate = self.gates
            .lock()
            .expect("gates mutex poisoned")
            .remove(&key);
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        if *self.fail_lists.lock().expect("fail_lists mutex poisoned") {
            return Err(server_error());
        }

        let page = self.pages
            .lock()
            .expect("pages mutex poisoned")
            .get(&key)
            .cloned();
        Ok(page.unwrap_or(Page {
            items: Vec::new(),
            page_index,
            total_pages: 0,
            total_elements: 0,
            is_first: true,
            is_last: true,
        }))
    }
}

#[async_trait]
impl BoardApi for FakeBoardApi {
    async fn list_posts(&self, page: u32, size: u32) -> BoardClientResult<Page<PostSummary>> {
        self.page(format!("all:{page}:{size}"), page).await
    }

    async fn posts_by_category(
        &self,
        category_id: i64,
        page: u32,
        size: u32,
    ) -> BoardClientResult<Page<PostSummary>> {
        self.page(format!("category:{category_id}:{page}:{size}"), page)
            .await
    }

    async fn search_posts(
        &self,
        keyword: &str,
        page: u32,
        size: u32,
    ) -> BoardClientResult<Page<PostSummary>> {
        self.page(format!("search:{keyword}:{page}:{size}"), page)
            .await
    }

    async fn get_post(&self, post_id: i64) -> BoardClientResult<PostDetail> {
        self.record(format!("detail:{post_id}"));
        self.detail
            .lock()
            .expect("detail mutex poisoned")
            .clone()
            .filter(|detail| detail.id == post_id)
            .ok_or(BoardClientError::NotFound)
    }

    async fn toggle_like(&self, post_id: i64) -> BoardClientResult<bool> {
        self.record(format!("like:{post_id}"));
        let gate = self.like_gate
            .lock()
            .expect("like_gate mutex poisoned")
            .take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.like_result
            .lock()
            .expect("like_result mutex poisoned")
            .ok_or_else(server_error)
    }

    async fn list_comments(&self, post_id: i64) -> BoardClientResult<Vec<Comment>> {
        self.record(format!("comments:{post_id}"));
        if *self.fail_comments
            .lock()
            .expect("fail_comments mutex poisoned")
        {
            return Err(server_error());
        }
        Ok(self.comments
            .lock()
            .expect("comments mutex poisoned")
            .clone())
    }

    async fn create_comment(
        &self,
        post_id: i64,
        draft: &CommentDraft,
    ) -> BoardClientResult<Comment> {
        self.record(format!("create_comment:{post_id}"));
        if self.mutations_fail() {
            return Err(server_error());
        }

        let mut comments = self.comments.lock().expect("comments mutex poisoned");
        let next_id = comments.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        let mut created = sample_comment(next_id, 1);
        created.content = draft.content.clone();
        comments.push(created.clone());
        Ok(created)
    }

    async fn update_comment(
        &self,
        post_id: i64,
        comment_id: i64,
        draft: &CommentDraft,
    ) -> BoardClientResult<Comment> {
        self.record(format!("update_comment:{post_id}:{comment_id}"));
        if self.mutations_fail() {
            return Err(server_error());
        }

        let mut comments = self.comments.lock().expect("comments mutex poisoned");
        let comment = comments
            .iter_mut()
            .find(|c| c.id == comment_id)
            .ok_or(BoardClientError::NotFound)?;
        comment.content = draft.content.clone();
        Ok(comment.clone())
    }

    async fn delete_comment(&self, post_id: i64, comment_id: i64) -> BoardClientResult<()> {
        self.record(format!("delete_comment:{post_id}:{comment_id}"));
        if self.mutations_fail() {
            return Err(server_error());
        }

        self.comments
            .lock()
            .expect("comments mutex poisoned")
            .retain(|c| c.id != comment_id);
        Ok(())
    }
}
