//! Карточка поста: сам пост, его комментарии и социальные счётчики.
//!
//! Лайк меняется оптимистично и откатывается при ошибке. Счётчик
//! комментариев меняется только после подтверждения сервером, вместе со
//! списком комментариев, под одной блокировкой.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::api::BoardApi;
use crate::error::{BoardClientError, BoardClientResult};
use crate::models::{Comment, CommentDraft, PostDetail};
use crate::session::SessionStore;

#[derive(Debug, Clone)]
/// То, что сейчас показывает карточка поста.
pub struct DetailView {
    /// Пост со счётчиками.
    pub post: PostDetail,
    /// Комментарии в порядке сервера.
    pub comments: Vec<Comment>,
    /// Ошибка последней загрузки комментариев.
    pub comments_error: Option<String>,
    /// Запрос лайка в полёте.
    pub like_pending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Итог удаления комментария.
pub enum DeleteOutcome {
    /// Комментарий удалён.
    Deleted,
    /// Пользователь не подтвердил удаление, запрос не отправлялся.
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
struct LikeSnapshot {
    is_liked: bool,
    like_count: u64,
}

fn adjust_like_count(count: u64, before: bool, after: bool) -> u64 {
    match (before, after) {
        (false, true) => count.saturating_add(1),
        (true, false) => count.saturating_sub(1),
        _ => count,
    }
}

fn normalized_draft(draft: CommentDraft) -> BoardClientResult<CommentDraft> {
    let content = draft.content.trim();
    if content.is_empty() {
        return Err(BoardClientError::Validation(
            "comment content must not be empty".to_string(),
        ));
    }
    Ok(CommentDraft {
        content: content.to_string(),
        image_urls: draft.image_urls,
    })
}

/// Агрегат «пост + комментарии».
pub struct DetailAggregate<A: BoardApi> {
    api: Arc<A>,
    session: Arc<SessionStore>,
    post_id: i64,
    view: Mutex<DetailView>,
}

impl<A: BoardApi> DetailAggregate<A> {
    /// Загружает пост и комментарии параллельно.
    ///
    /// Ошибка загрузки поста возвращается (экран закрывается), ошибка
    /// комментариев даёт пустой список и `comments_error`.
    pub async fn load(
        api: Arc<A>,
        session: Arc<SessionStore>,
        post_id: i64,
    ) -> BoardClientResult<Self> {
        let (post, comments) = tokio::join!(api.get_post(post_id), api.list_comments(post_id));

        let mut post = post?;
        if !session.is_logged_in() {
            post.is_liked = false;
        }

        let (comments, comments_error) = match comments {
            Ok(comments) => (comments, None),
            Err(err) => {
                warn!(post_id, error = %err, "failed to load comments, showing empty list");
                (Vec::new(), Some(err.to_string()))
            }
        };

        Ok(Self {
            api,
            session,
            post_id,
            view: Mutex::new(DetailView {
                post,
                comments,
                comments_error,
                like_pending: false,
            }),
        })
    }

    /// Идентификатор поста.
    pub fn post_id(&self) -> i64 {
        self.post_id
    }

    /// Снимок текущего состояния.
    pub fn snapshot(&self) -> DetailView {
        self.lock().clone()
    }

    /// Может ли текущий пользователь править и удалять комментарий.
    ///
    /// Если сервер прислал `author_id`, сравниваются идентификаторы. Иначе
    /// сравнивается никнейм: сервер держит никнеймы уникальными, а
    /// окончательную проверку прав всё равно делает сам (403 → `Forbidden`).
    pub fn can_edit(&self, comment: &Comment) -> bool {
        let Some(user) = self.session.user() else {
            return false;
        };
        match comment.author_id {
            Some(author_id) => user.id == author_id,
            None => {
                debug!(
                    comment_id = comment.id,
                    "comment has no author id, matching by nickname"
                );
                !user.nickname.is_empty() && user.nickname == comment.author_nickname
            }
        }
    }

    /// Переключает лайк.
    ///
    /// Счётчик и иконка меняются сразу; ответ сервера задаёт итоговое
    /// состояние, ошибка возвращает оба поля к значениям до нажатия.
    pub async fn toggle_like(&self) -> BoardClientResult<bool> {
        if !self.session.is_logged_in() {
            return Err(BoardClientError::LoginRequired);
        }

        let previous = {
            let mut view = self.lock();
            if view.like_pending {
                return Err(BoardClientError::Busy("like toggle already in progress"));
            }
            let previous = LikeSnapshot {
                is_liked: view.post.is_liked,
                like_count: view.post.like_count,
            };
            view.like_pending = true;
            view.post.is_liked = !previous.is_liked;
            view.post.like_count =
                adjust_like_count(previous.like_count, previous.is_liked, !previous.is_liked);
            previous
        };

        let result = self.api.toggle_like(self.post_id).await;

        let mut view = self.lock();
        view.like_pending = false;
        match result {
            Ok(liked) => {
                view.post.is_liked = liked;
                view.post.like_count =
                    adjust_like_count(previous.like_count, previous.is_liked, liked);
                Ok(liked)
            }
            Err(err) => {
                warn!(post_id = self.post_id, error = %err, "like toggle failed, rolling back");
                view.post.is_liked = previous.is_liked;
                view.post.like_count = previous.like_count;
                Err(err)
            }
        }
    }

    /// Создаёт комментарий; счётчик растёт только после ответа сервера.
    pub async fn create_comment(&self, draft: CommentDraft) -> BoardClientResult<Comment> {
        self.require_session()?;
        let draft = normalized_draft(draft)?;

        let created = self.api.create_comment(self.post_id, &draft).await?;
        let refreshed = self.api.list_comments(self.post_id).await;

        let mut view = self.lock();
        match refreshed {
            Ok(comments) => {
                view.comments = comments;
                view.comments_error = None;
            }
            Err(err) => {
                warn!(
                    post_id = self.post_id,
                    error = %err,
                    "comment reload failed, inserting locally"
                );
                if !view.comments.iter().any(|comment| comment.id == created.id) {
                    view.comments.push(created.clone());
                }
            }
        }
        view.post.comment_count = view.post.comment_count.saturating_add(1);
        debug!(post_id = self.post_id, comment_id = created.id, "comment created");
        Ok(created)
    }

    /// Изменяет свой комментарий и перезагружает список.
    pub async fn update_comment(
        &self,
        comment_id: i64,
        draft: CommentDraft,
    ) -> BoardClientResult<Comment> {
        self.require_session()?;
        self.find_own_comment(comment_id)?;
        let draft = normalized_draft(draft)?;

        let updated = self
            .api
            .update_comment(self.post_id, comment_id, &draft)
            .await?;
        let refreshed = self.api.list_comments(self.post_id).await;

        let mut view = self.lock();
        match refreshed {
            Ok(comments) => {
                view.comments = comments;
                view.comments_error = None;
            }
            Err(err) => {
                warn!(
                    post_id = self.post_id,
                    error = %err,
                    "comment reload failed, patching locally"
                );
                if let Some(slot) = view.comments.iter_mut().find(|c| c.id == comment_id) {
                    *slot = updated.clone();
                }
            }
        }
        Ok(updated)
    }

    /// Удаляет свой комментарий после подтверждения `confirm`.
    pub async fn delete_comment(
        &self,
        comment_id: i64,
        confirm: impl FnOnce(&Comment) -> bool,
    ) -> BoardClientResult<DeleteOutcome> {
        self.require_session()?;
        let comment = self.find_own_comment(comment_id)?;
        if !confirm(&comment) {
            return Ok(DeleteOutcome::Cancelled);
        }

        self.api.delete_comment(self.post_id, comment_id).await?;
        let refreshed = self.api.list_comments(self.post_id).await;

        let mut view = self.lock();
        match refreshed {
            Ok(comments) => {
                view.comments = comments;
                view.comments_error = None;
            }
            Err(err) => {
                warn!(
                    post_id = self.post_id,
                    error = %err,
                    "comment reload failed, removing locally"
                );
                view.comments.retain(|c| c.id != comment_id);
            }
        }
        view.post.comment_count = view.post.comment_count.saturating_sub(1);
        debug!(post_id = self.post_id, comment_id, "comment deleted");
        Ok(DeleteOutcome::Deleted)
    }

    /// Перезагружает комментарии. При ошибке список остаётся прежним.
    pub async fn reload_comments(&self) -> BoardClientResult<()> {
        let result = self.api.list_comments(self.post_id).await;
        let mut view = self.lock();
        match result {
            Ok(comments) => {
                view.comments = comments;
                view.comments_error = None;
                Ok(())
            }
            Err(err) => {
                view.comments_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn require_session(&self) -> BoardClientResult<()> {
        if self.session.is_logged_in() {
            Ok(())
        } else {
            Err(BoardClientError::LoginRequired)
        }
    }

    fn find_own_comment(&self, comment_id: i64) -> BoardClientResult<Comment> {
        let comment = self
            .lock()
            .comments
            .iter()
            .find(|c| c.id == comment_id)
            .cloned()
            .ok_or(BoardClientError::NotFound)?;

        if !self.can_edit(&comment) {
            return Err(BoardClientError::Forbidden);
        }
        Ok(comment)
    }

    fn lock(&self) -> MutexGuard<'_, DetailView> {
        self.view
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
