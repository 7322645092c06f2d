use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Публичная модель пользователя (без пароля).
pub struct UserIdentity {
    /// Стабильный идентификатор пользователя.
    pub id: i64,
    /// Логин.
    #[serde(rename = "userId")]
    pub login_id: String,
    /// Отображаемое имя.
    pub nickname: String,
    /// Email.
    pub email: String,
    /// Путь к аватару, если загружен.
    #[serde(default)]
    pub profile_image_url: Option<String>,
    /// Роль (`USER`, `ADMIN`).
    #[serde(default)]
    pub role: String,
    /// Дата регистрации; сервер не всегда её присылает.
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Категория постов.
pub struct Category {
    /// Идентификатор категории.
    #[serde(alias = "categoryId")]
    pub id: i64,
    /// Название.
    pub name: String,
    /// Описание.
    #[serde(default)]
    pub description: Option<String>,
    /// Порядок отображения.
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Изображение, прикреплённое к посту или комментарию.
pub struct ImageInfo {
    /// Идентификатор изображения.
    pub id: i64,
    /// Путь или абсолютный URL.
    pub image_url: String,
    /// Исходное имя файла.
    #[serde(default)]
    pub original_file_name: Option<String>,
    /// Позиция в галерее.
    #[serde(default)]
    pub order_index: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Элемент списка постов.
pub struct PostSummary {
    /// Идентификатор поста.
    #[serde(alias = "boardId")]
    pub id: i64,
    /// Заголовок.
    pub title: String,
    /// Имя автора.
    pub author_nickname: String,
    /// Просмотры.
    #[serde(default)]
    pub view_count: u64,
    /// Лайки.
    #[serde(default)]
    pub like_count: u64,
    /// Комментарии.
    #[serde(default)]
    pub comment_count: u64,
    /// Превью.
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Категория.
    #[serde(default)]
    pub category_name: Option<String>,
    /// Дата создания.
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Полная модель поста.
pub struct PostDetail {
    /// Идентификатор поста.
    #[serde(alias = "boardId")]
    pub id: i64,
    /// Заголовок.
    pub title: String,
    /// Текст поста.
    pub content: String,
    /// Идентификатор автора, если сервер его отдаёт.
    #[serde(default)]
    pub author_id: Option<i64>,
    /// Имя автора.
    pub author_nickname: String,
    /// Аватар автора.
    #[serde(default)]
    pub author_profile_image_url: Option<String>,
    /// Просмотры.
    #[serde(default)]
    pub view_count: u64,
    /// Лайки.
    #[serde(default)]
    pub like_count: u64,
    /// Лайкнул ли пост текущий пользователь.
    #[serde(default, alias = "liked")]
    pub is_liked: bool,
    /// Изображения.
    #[serde(default)]
    pub images: Vec<ImageInfo>,
    /// Комментарии.
    #[serde(default)]
    pub comment_count: u64,
    /// Категория.
    #[serde(default)]
    pub category_name: Option<String>,
    /// Дата создания.
    pub created_at: NaiveDateTime,
    /// Дата последнего изменения.
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Комментарий к посту.
pub struct Comment {
    /// Идентификатор комментария.
    #[serde(alias = "commentId")]
    pub id: i64,
    /// Текст.
    pub content: String,
    /// Идентификатор автора, если сервер его отдаёт.
    #[serde(default)]
    pub author_id: Option<i64>,
    /// Имя автора.
    pub author_nickname: String,
    /// Аватар автора.
    #[serde(default)]
    pub author_profile_image_url: Option<String>,
    /// Изображения.
    #[serde(default)]
    pub images: Vec<ImageInfo>,
    /// Дата создания.
    pub created_at: NaiveDateTime,
    /// Дата последнего изменения.
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
/// Страница результатов (нумерация с нуля).
pub struct Page<T> {
    /// Элементы страницы в порядке сервера.
    pub items: Vec<T>,
    /// Номер страницы.
    pub page_index: u32,
    /// Всего страниц; `0` означает пустую выборку.
    pub total_pages: u32,
    /// Всего элементов во всей выборке.
    pub total_elements: u64,
    /// Первая ли это страница.
    pub is_first: bool,
    /// Последняя ли это страница.
    pub is_last: bool,
}

impl<T> Page<T> {
    /// `true`, если выборка пуста.
    pub fn is_empty(&self) -> bool {
        self.total_pages == 0 || self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Описание сохранённого на сервере файла.
pub struct UploadedFile {
    /// Путь или URL сохранённого файла.
    pub image_url: String,
    /// Исходное имя файла.
    #[serde(default)]
    pub original_file_name: Option<String>,
}

#[derive(Debug, Clone)]
/// Файл для multipart-загрузки.
pub struct UploadFile {
    /// Имя файла.
    pub file_name: String,
    /// Содержимое.
    pub bytes: Vec<u8>,
    /// MIME-тип, например `image/png`.
    pub mime: Option<String>,
}

#[derive(Debug, Clone)]
/// Ответ после успешного входа.
pub struct AuthResponse {
    /// Токен доступа.
    pub token: String,
    /// Данные пользователя.
    pub user: UserIdentity,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
/// Данные регистрации.
pub struct SignUpRequest {
    /// Логин.
    #[serde(rename = "userId")]
    pub login_id: String,
    /// Пароль.
    pub password: String,
    /// Отображаемое имя.
    pub nickname: String,
    /// Email.
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
/// Данные входа.
pub struct LoginRequest {
    /// Логин.
    #[serde(rename = "userId")]
    pub login_id: String,
    /// Пароль.
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
/// Черновик поста для создания и обновления.
pub struct PostDraft {
    /// Заголовок.
    pub title: String,
    /// Текст.
    pub content: String,
    /// Категория.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    /// Уже загруженные изображения.
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
/// Черновик комментария.
pub struct CommentDraft {
    /// Текст.
    pub content: String,
    /// Уже загруженные изображения.
    pub image_urls: Vec<String>,
}

impl CommentDraft {
    /// Текстовый комментарий без изображений.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            image_urls: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
/// Частичное обновление профиля.
pub struct ProfilePatch {
    /// Новое имя.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    /// Новый email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Новый путь к аватару.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
/// Смена пароля.
pub struct PasswordChange {
    /// Текущий пароль.
    pub current_password: String,
    /// Новый пароль.
    pub new_password: String,
}
