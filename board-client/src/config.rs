use std::time::Duration;

/// Базовый URL REST API по умолчанию.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
/// Размер страницы списка постов по умолчанию.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone)]
/// Настройки клиента.
pub struct ClientConfig {
    /// Базовый URL API, например `http://localhost:8080/api`.
    pub base_url: String,
    /// Таймаут установки соединения.
    pub connect_timeout: Duration,
    /// Таймаут одного запроса целиком.
    pub request_timeout: Duration,
    /// Сколько постов запрашивать на страницу.
    pub page_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ClientConfig {
    /// Конфигурация с указанным базовым URL и остальными значениями по умолчанию.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Задаёт таймаут запроса.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Задаёт таймаут соединения.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Задаёт размер страницы; `0` заменяется на `1`.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Превращает сохранённый путь изображения в URL для отображения.
    ///
    /// Абсолютные `http(s)://` адреса возвращаются как есть, относительные
    /// пути дополняются origin сервера (без суффикса `/api`).
    pub fn resolve_image_url(&self, image_path: &str) -> Option<String> {
        if image_path.is_empty() {
            return None;
        }
        if image_path.starts_with("http://") || image_path.starts_with("https://") {
            return Some(image_path.to_string());
        }

        let base = self.base_url.trim_end_matches('/');
        let origin = base.strip_suffix("/api").unwrap_or(base);
        Some(format!("{}/{}", origin, image_path.trim_start_matches('/')))
    }
}
