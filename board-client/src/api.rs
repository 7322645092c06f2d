use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::error::BoardClientResult;
use crate::models::{
    AuthResponse, Category, Comment, CommentDraft, LoginRequest, Page, PasswordChange, PostDetail,
    PostDraft, PostSummary, ProfilePatch, SignUpRequest, UploadFile, UploadedFile, UserIdentity,
};
use crate::transport::Transport;

/// Эндпоинты постов и комментариев, на которых держатся список и
/// карточка поста.
#[async_trait]
pub trait BoardApi: Send + Sync {
    /// `GET /boards?page&size`
    async fn list_posts(&self, page: u32, size: u32) -> BoardClientResult<Page<PostSummary>>;
    /// `GET /boards/category/{id}?page&size`
    async fn posts_by_category(
        &self,
        category_id: i64,
        page: u32,
        size: u32,
    ) -> BoardClientResult<Page<PostSummary>>;
    /// `GET /boards/search?keyword&page&size`
    async fn search_posts(
        &self,
        keyword: &str,
        page: u32,
        size: u32,
    ) -> BoardClientResult<Page<PostSummary>>;
    /// `GET /boards/{id}`
    async fn get_post(&self, post_id: i64) -> BoardClientResult<PostDetail>;
    /// `POST /boards/{id}/like`, возвращает итоговое состояние лайка.
    async fn toggle_like(&self, post_id: i64) -> BoardClientResult<bool>;
    /// `GET /boards/{id}/comments`
    async fn list_comments(&self, post_id: i64) -> BoardClientResult<Vec<Comment>>;
    /// `POST /boards/{id}/comments`
    async fn create_comment(&self, post_id: i64, draft: &CommentDraft)
    -> BoardClientResult<Comment>;
    /// `PUT /boards/{id}/comments/{commentId}`
    async fn update_comment(
        &self,
        post_id: i64,
        comment_id: i64,
        draft: &CommentDraft,
    ) -> BoardClientResult<Comment>;
    /// `DELETE /boards/{id}/comments/{commentId}`
    async fn delete_comment(&self, post_id: i64, comment_id: i64) -> BoardClientResult<()>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageDto<T> {
    content: Vec<T>,
    #[serde(default)]
    total_pages: i64,
    #[serde(default)]
    total_elements: i64,
    #[serde(default)]
    number: i64,
    #[serde(default)]
    first: bool,
    #[serde(default)]
    last: bool,
}

#[derive(Debug, Deserialize)]
struct AuthResponseDto {
    token: String,
    user: UserIdentity,
}

#[derive(Serialize)]
struct PageQuery {
    page: u32,
    size: u32,
}

#[derive(Serialize)]
struct SearchQuery<'a> {
    keyword: &'a str,
    page: u32,
    size: u32,
}

#[derive(Serialize)]
struct PasswordQuery<'a> {
    password: &'a str,
}

fn clamp_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

impl<T> From<PageDto<T>> for Page<T> {
    fn from(value: PageDto<T>) -> Self {
        Self {
            items: value.content,
            page_index: clamp_u32(value.number),
            total_pages: clamp_u32(value.total_pages),
            total_elements: value.total_elements.max(0) as u64,
            is_first: value.first,
            is_last: value.last,
        }
    }
}

impl From<AuthResponseDto> for AuthResponse {
    fn from(value: AuthResponseDto) -> Self {
        Self {
            token: value.token,
            user: value.user,
        }
    }
}

#[derive(Debug, Clone)]
/// Реализация `BoardApi` и остальных эндпоинтов поверх `Transport`.
pub struct HttpBoardApi {
    transport: Transport,
}

impl HttpBoardApi {
    /// Создаёт API поверх транспорта.
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Транспорт, через который идут запросы.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    async fn fetch_page<Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> BoardClientResult<Page<PostSummary>> {
        let dto: PageDto<PostSummary> = self.transport.get_with_query(path, query).await?;
        Ok(dto.into())
    }

    /// Регистрирует пользователя. Сервер не выдаёт токен при регистрации.
    pub async fn signup(&self, request: &SignUpRequest) -> BoardClientResult<UserIdentity> {
        self.transport
            .send_json(Method::POST, "/auth/signup", request)
            .await
    }

    /// Вход; возвращает токен и пользователя.
    pub async fn login(&self, request: &LoginRequest) -> BoardClientResult<AuthResponse> {
        let dto: AuthResponseDto = self
            .transport
            .send_json(Method::POST, "/auth/login", request)
            .await?;
        Ok(dto.into())
    }

    /// Профиль текущего пользователя.
    pub async fn me(&self) -> BoardClientResult<UserIdentity> {
        self.transport.get("/auth/me").await
    }

    /// Обновляет профиль текущего пользователя.
    pub async fn update_profile(&self, patch: &ProfilePatch) -> BoardClientResult<UserIdentity> {
        self.transport
            .send_json(Method::PUT, "/auth/me", patch)
            .await
    }

    /// Меняет пароль.
    pub async fn change_password(&self, change: &PasswordChange) -> BoardClientResult<()> {
        self.transport
            .send_json_empty(Method::PUT, "/auth/me/password", change)
            .await
    }

    /// Загружает аватар.
    pub async fn upload_profile_image(&self, file: UploadFile) -> BoardClientResult<UploadedFile> {
        self.transport
            .upload("/auth/me/profile-image", &[file])
            .await
    }

    /// Удаляет аккаунт; сервер требует пароль.
    pub async fn delete_account(&self, password: &str) -> BoardClientResult<()> {
        self.transport
            .send_empty_with_query(Method::DELETE, "/auth/me", &PasswordQuery { password })
            .await
    }

    /// Список категорий.
    pub async fn categories(&self) -> BoardClientResult<Vec<Category>> {
        self.transport.get("/categories").await
    }

    /// Создаёт пост.
    pub async fn create_post(&self, draft: &PostDraft) -> BoardClientResult<PostDetail> {
        self.transport
            .send_json(Method::POST, "/boards", draft)
            .await
    }

    /// Обновляет пост.
    pub async fn update_post(
        &self,
        post_id: i64,
        draft: &PostDraft,
    ) -> BoardClientResult<PostDetail> {
        self.transport
            .send_json(Method::PUT, &format!("/boards/{post_id}"), draft)
            .await
    }

    /// Удаляет пост.
    pub async fn delete_post(&self, post_id: i64) -> BoardClientResult<()> {
        self.transport
            .send_empty(Method::DELETE, &format!("/boards/{post_id}"))
            .await
    }

    /// Загружает одно изображение.
    pub async fn upload_image(&self, file: UploadFile) -> BoardClientResult<UploadedFile> {
        self.transport.upload("/upload/image", &[file]).await
    }

    /// Загружает несколько изображений за один запрос.
    pub async fn upload_images(
        &self,
        files: &[UploadFile],
    ) -> BoardClientResult<Vec<UploadedFile>> {
        self.transport.upload("/upload/images", files).await
    }
}

#[async_trait]
impl BoardApi for HttpBoardApi {
    async fn list_posts(&self, page: u32, size: u32) -> BoardClientResult<Page<PostSummary>> {
        self.fetch_page("/boards", &PageQuery { page, size }).await
    }

    async fn posts_by_category(
        &self,
        category_id: i64,
        page: u32,
        size: u32,
    ) -> BoardClientResult<Page<PostSummary>> {
        self.fetch_page(
            &format!("/boards/category/{category_id}"),
            &PageQuery { page, size },
        )
        .await
    }

    async fn search_posts(
        &self,
        keyword: &str,
        page: u32,
        size: u32,
    ) -> BoardClientResult<Page<PostSummary>> {
        self.fetch_page(
            "/boards/search",
            &SearchQuery {
                keyword,
                page,
                size,
            },
        )
        .await
    }

    async fn get_post(&self, post_id: i64) -> BoardClientResult<PostDetail> {
        self.transport.get(&format!("/boards/{post_id}")).await
    }

    async fn toggle_like(&self, post_id: i64) -> BoardClientResult<bool> {
        self.transport
            .send(Method::POST, &format!("/boards/{post_id}/like"))
            .await
    }

    async fn list_comments(&self, post_id: i64) -> BoardClientResult<Vec<Comment>> {
        self.transport
            .get(&format!("/boards/{post_id}/comments"))
            .await
    }

    async fn create_comment(
        &self,
        post_id: i64,
        draft: &CommentDraft,
    ) -> BoardClientResult<Comment> {
        self.transport
            .send_json(Method::POST, &format!("/boards/{post_id}/comments"), draft)
            .await
    }

    async fn update_comment(
        &self,
        post_id: i64,
        comment_id: i64,
        draft: &CommentDraft,
    ) -> BoardClientResult<Comment> {
        self.transport
            .send_json(
                Method::PUT,
                &format!("/boards/{post_id}/comments/{comment_id}"),
                draft,
            )
            .await
    }

    async fn delete_comment(&self, post_id: i64, comment_id: i64) -> BoardClientResult<()> {
        self.transport
            .send_empty(
                Method::DELETE,
                &format!("/boards/{post_id}/comments/{comment_id}"),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_dto_maps_spring_envelope() {
        let raw = r#"{
            "content": [{
                "boardId": 1,
                "title": "hello",
                "authorNickname": "kim",
                "viewCount": 3,
                "likeCount": 1,
                "commentCount": 0,
                "thumbnailUrl": null,
                "createdAt": "2026-01-01T10:00:00"
            }],
            "totalPages": 3,
            "totalElements": 21,
            "size": 10,
            "number": 2,
            "first": false,
            "last": true,
            "empty": false
        }"#;

        let dto: PageDto<PostSummary> = serde_json::from_str(raw).expect("page should parse");
        let page = Page::from(dto);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, 1);
        assert_eq!(page.page_index, 2);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_elements, 21);
        assert!(page.is_last);
        assert!(!page.is_first);
    }

    #[test]
    fn page_dto_clamps_negative_counters() {
        let dto = PageDto::<PostSummary> {
            content: Vec::new(),
            total_pages: -1,
            total_elements: -7,
            number: -3,
            first: true,
            last: true,
        };

        let page = Page::from(dto);
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.total_elements, 0);
        assert_eq!(page.page_index, 0);
        assert!(page.is_empty());
    }
}
