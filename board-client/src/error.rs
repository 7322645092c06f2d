use thiserror::Error;

#[derive(Debug, Error)]
/// Ошибки клиентской библиотеки `board-client`.
pub enum BoardClientError {
    /// Сервер ответил 401: сессия уже очищена транспортом.
    #[error("session expired")]
    SessionExpired,

    /// Операция требует входа, а сессии нет. Запрос не отправлялся.
    #[error("login required")]
    LoginRequired,

    /// Ввод отклонён (клиентом или сервером), состояние не изменено.
    #[error("validation rejected: {0}")]
    Validation(String),

    /// Недостаточно прав для операции.
    #[error("forbidden")]
    Forbidden,

    /// Запрошенный ресурс не найден.
    #[error("not found")]
    NotFound,

    /// Прочие не-2xx ответы сервера.
    #[error("server error {status}: {message}")]
    Server {
        /// HTTP-статус ответа.
        status: u16,
        /// Сообщение из тела ответа или статус.
        message: String,
    },

    /// Сетевая ошибка или таймаут (`reqwest`).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Тело успешного ответа не совпало с ожидаемым форматом.
    #[error("decode error: {0}")]
    Decode(String),

    /// Ошибка долговременного хранилища сессии.
    #[error("storage error: {0}")]
    Storage(String),

    /// Такое же действие уже выполняется.
    #[error("busy: {0}")]
    Busy(&'static str),
}

/// Результат операций `board-client`.
pub type BoardClientResult<T> = Result<T, BoardClientError>;

impl BoardClientError {
    /// 401 из транспорта сюда не попадает: он превращается в `SessionExpired`
    /// до вызова этой функции.
    pub(crate) fn from_http_status(status: reqwest::StatusCode, message: Option<String>) -> Self {
        match status {
            reqwest::StatusCode::UNAUTHORIZED => Self::SessionExpired,
            reqwest::StatusCode::FORBIDDEN => Self::Forbidden,
            reqwest::StatusCode::NOT_FOUND => Self::NotFound,
            reqwest::StatusCode::BAD_REQUEST
            | reqwest::StatusCode::CONFLICT
            | reqwest::StatusCode::UNPROCESSABLE_ENTITY => {
                Self::Validation(message.unwrap_or_else(|| format!("http status {status}")))
            }
            _ => Self::Server {
                status: status.as_u16(),
                message: message.unwrap_or_else(|| format!("http status {status}")),
            },
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Decode(err.to_string());
        }
        if let Some(status) = err.status() {
            return Self::from_http_status(status, None);
        }
        Self::Http(err)
    }

    /// Ошибка, о которой пользователю сообщать не нужно: сессия уже сброшена
    /// глобально, UI просто перерисуется как для гостя.
    pub fn is_handled_globally(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }
}
