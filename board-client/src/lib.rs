//! Клиентская библиотека доски объявлений поверх REST API.
//!
//! Держит на клиенте согласованное с сервером состояние:
//! - `SessionStore`: токен и пользователь, общий для всех компонентов;
//! - `Transport`: HTTP (`reqwest`), токен в каждом запросе, сброс сессии на 401;
//! - `QueryStateController`: страница/поиск/категория как query-строка адреса;
//! - `ListSynchronizer`: страница постов, устаревшие ответы выбрасываются;
//! - `DetailAggregate`: пост + комментарии, лайк и счётчики.
//!
//! `BoardClient` собирает всё это вместе и добавляет операции профиля.
#![warn(missing_docs)]

mod api;
mod config;
mod detail;
mod error;
mod list;
mod models;
mod query;
mod session;
mod transport;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

pub use api::{BoardApi, HttpBoardApi};
pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE};
pub use detail::{DeleteOutcome, DetailAggregate, DetailView};
pub use error::{BoardClientError, BoardClientResult};
pub use list::{
    FetchTicket, ListStatus, ListSynchronizer, ListView, PAGE_WINDOW_SIZE, PageWindow, SyncOutcome,
};
pub use models::{
    AuthResponse, Category, Comment, CommentDraft, ImageInfo, LoginRequest, Page, PasswordChange,
    PostDetail, PostDraft, PostSummary, ProfilePatch, SignUpRequest, UploadFile, UploadedFile,
    UserIdentity,
};
pub use query::{
    CATEGORY_PARAM, FetchStrategy, History, KEYWORD_PARAM, PAGE_PARAM, QueryState,
    QueryStateController,
};
pub use session::{
    FileSessionStorage, MemorySessionStorage, Session, SessionStorage, SessionStore,
    StoredSession, TOKEN_KEY, USER_KEY,
};
pub use transport::Transport;

#[derive(Debug, Clone)]
/// Клиент доски: сессия, транспорт и фабрики для списка и карточки поста.
pub struct BoardClient {
    config: ClientConfig,
    session: Arc<SessionStore>,
    api: Arc<HttpBoardApi>,
}

impl BoardClient {
    /// Создаёт клиент с указанным хранилищем сессии.
    pub fn new(config: ClientConfig, session: SessionStore) -> BoardClientResult<Self> {
        Self::with_session(config, Arc::new(session))
    }

    /// Создаёт клиент поверх уже разделяемого хранилища сессии.
    pub fn with_session(
        config: ClientConfig,
        session: Arc<SessionStore>,
    ) -> BoardClientResult<Self> {
        let transport = Transport::new(config.clone(), session.clone())?;
        Ok(Self {
            config,
            session,
            api: Arc::new(HttpBoardApi::new(transport)),
        })
    }

    /// Настройки клиента.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Хранилище сессии.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// REST API.
    pub fn api(&self) -> &HttpBoardApi {
        &self.api
    }

    /// Выполняет вход и сохраняет сессию.
    pub async fn login(&self, login_id: &str, password: &str) -> BoardClientResult<AuthResponse> {
        let request = LoginRequest {
            login_id: login_id.to_string(),
            password: password.to_string(),
        };
        let auth = self.api.login(&request).await?;
        self.session
            .set(Session::authenticated(auth.token.clone(), auth.user.clone()));
        Ok(auth)
    }

    /// Регистрирует пользователя и сразу входит под ним.
    pub async fn signup(&self, request: SignUpRequest) -> BoardClientResult<AuthResponse> {
        self.api.signup(&request).await?;
        self.login(&request.login_id, &request.password).await
    }

    /// Выход: только локальный сброс сессии.
    pub fn logout(&self) {
        self.session.clear();
    }

    /// Загружает профиль и обновляет сохранённого пользователя.
    pub async fn me(&self) -> BoardClientResult<UserIdentity> {
        self.require_session()?;
        let user = self.api.me().await?;
        self.session.update_user(user.clone());
        Ok(user)
    }

    /// Обновляет профиль и сохранённого пользователя.
    pub async fn update_profile(&self, patch: ProfilePatch) -> BoardClientResult<UserIdentity> {
        self.require_session()?;
        let user = self.api.update_profile(&patch).await?;
        self.session.update_user(user.clone());
        Ok(user)
    }

    /// Меняет пароль.
    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> BoardClientResult<()> {
        self.require_session()?;
        if new_password.trim().is_empty() {
            return Err(BoardClientError::Validation(
                "new password must not be empty".to_string(),
            ));
        }
        let change = PasswordChange {
            current_password: current_password.to_string(),
            new_password: new_password.to_string(),
        };
        self.api.change_password(&change).await
    }

    /// Загружает аватар.
    pub async fn upload_profile_image(&self, file: UploadFile) -> BoardClientResult<UploadedFile> {
        self.require_session()?;
        self.api.upload_profile_image(file).await
    }

    /// Удаляет аккаунт и сбрасывает сессию.
    pub async fn delete_account(&self, password: &str) -> BoardClientResult<()> {
        self.require_session()?;
        self.api.delete_account(password).await?;
        self.session.clear();
        Ok(())
    }

    /// Список категорий.
    pub async fn categories(&self) -> BoardClientResult<Vec<Category>> {
        self.api.categories().await
    }

    /// Создаёт пост.
    pub async fn create_post(&self, draft: PostDraft) -> BoardClientResult<PostDetail> {
        self.require_session()?;
        let draft = normalized_post_draft(draft)?;
        self.api.create_post(&draft).await
    }

    /// Обновляет пост.
    pub async fn update_post(
        &self,
        post_id: i64,
        draft: PostDraft,
    ) -> BoardClientResult<PostDetail> {
        self.require_session()?;
        let draft = normalized_post_draft(draft)?;
        self.api.update_post(post_id, &draft).await
    }

    /// Удаляет пост.
    pub async fn delete_post(&self, post_id: i64) -> BoardClientResult<()> {
        self.require_session()?;
        self.api.delete_post(post_id).await
    }

    /// Загружает изображения; один файл идёт в `/upload/image`.
    pub async fn upload_images(
        &self,
        files: Vec<UploadFile>,
    ) -> BoardClientResult<Vec<UploadedFile>> {
        self.require_session()?;
        match <[UploadFile; 1]>::try_from(files) {
            Ok([file]) => Ok(vec![self.api.upload_image(file).await?]),
            Err(files) => self.api.upload_images(&files).await,
        }
    }

    /// Синхронизатор списка постов.
    pub fn list_synchronizer(&self) -> ListSynchronizer<HttpBoardApi> {
        ListSynchronizer::new(self.api.clone(), self.config.page_size)
    }

    /// Контроллер фильтров, стартующий с query-строки `url_query`.
    pub fn query_controller(&self, url_query: &str) -> QueryStateController {
        QueryStateController::new(url_query)
    }

    /// Загружает карточку поста.
    pub async fn open_post(
        &self,
        post_id: i64,
    ) -> BoardClientResult<DetailAggregate<HttpBoardApi>> {
        DetailAggregate::load(self.api.clone(), self.session.clone(), post_id).await
    }

    fn require_session(&self) -> BoardClientResult<()> {
        if self.session.is_logged_in() {
            Ok(())
        } else {
            Err(BoardClientError::LoginRequired)
        }
    }
}

fn normalized_post_draft(draft: PostDraft) -> BoardClientResult<PostDraft> {
    let title = draft.title.trim();
    let content = draft.content.trim();
    if title.is_empty() || content.is_empty() {
        return Err(BoardClientError::Validation(
            "title and content must not be empty".to_string(),
        ));
    }
    Ok(PostDraft {
        title: title.to_string(),
        content: content.to_string(),
        category_id: draft.category_id,
        image_urls: draft.image_urls,
    })
}
