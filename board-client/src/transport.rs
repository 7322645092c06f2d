use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{BoardClientError, BoardClientResult};
use crate::models::UploadFile;
use crate::session::SessionStore;

#[derive(Debug, Deserialize)]
struct ErrorResponseDto {
    message: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone)]
/// HTTP-транспорт к REST API доски.
///
/// Подставляет токен из `SessionStore` в каждый запрос. Ответ 401 от любого
/// эндпоинта очищает сессию и превращается в `BoardClientError::SessionExpired`.
/// Повторов нет.
pub struct Transport {
    config: ClientConfig,
    client: Client,
    session: Arc<SessionStore>,
}

impl Transport {
    /// Создаёт транспорт с таймаутами из `config`.
    pub fn new(config: ClientConfig, session: Arc<SessionStore>) -> BoardClientResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(BoardClientError::Http)?;

        Ok(Self {
            config,
            client,
            session,
        })
    }

    /// Хранилище сессии, из которого берётся токен.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Настройки клиента.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GET с разбором JSON-ответа.
    pub async fn get<TRes>(&self, path: &str) -> BoardClientResult<TRes>
    where
        TRes: DeserializeOwned,
    {
        let response = self.execute(self.builder(Method::GET, path)).await?;
        Self::decode(response).await
    }

    /// GET с query-параметрами.
    pub async fn get_with_query<TQuery, TRes>(
        &self,
        path: &str,
        query: &TQuery,
    ) -> BoardClientResult<TRes>
    where
        TQuery: Serialize + ?Sized,
        TRes: DeserializeOwned,
    {
        let request = self.builder(Method::GET, path).query(query);
        let response = self.execute(request).await?;
        Self::decode(response).await
    }

    /// Запрос с JSON-телом и JSON-ответом.
    pub async fn send_json<TReq, TRes>(
        &self,
        method: Method,
        path: &str,
        body: &TReq,
    ) -> BoardClientResult<TRes>
    where
        TReq: Serialize + ?Sized,
        TRes: DeserializeOwned,
    {
        let request = self.builder(method, path).json(body);
        let response = self.execute(request).await?;
        Self::decode(response).await
    }

    /// Запрос с JSON-телом, тело ответа игнорируется.
    pub async fn send_json_empty<TReq>(
        &self,
        method: Method,
        path: &str,
        body: &TReq,
    ) -> BoardClientResult<()>
    where
        TReq: Serialize + ?Sized,
    {
        let request = self.builder(method, path).json(body);
        self.execute(request).await?;
        Ok(())
    }

    /// Запрос без тела с JSON-ответом (например, `POST /boards/{id}/like`).
    pub async fn send<TRes>(&self, method: Method, path: &str) -> BoardClientResult<TRes>
    where
        TRes: DeserializeOwned,
    {
        let response = self.execute(self.builder(method, path)).await?;
        Self::decode(response).await
    }

    /// Запрос без тела, тело ответа игнорируется (например, DELETE).
    pub async fn send_empty(&self, method: Method, path: &str) -> BoardClientResult<()> {
        self.execute(self.builder(method, path)).await?;
        Ok(())
    }

    /// Запрос без тела с query-параметрами, тело ответа игнорируется.
    pub async fn send_empty_with_query<TQuery>(
        &self,
        method: Method,
        path: &str,
        query: &TQuery,
    ) -> BoardClientResult<()>
    where
        TQuery: Serialize + ?Sized,
    {
        self.execute(self.builder(method, path).query(query)).await?;
        Ok(())
    }

    /// Multipart-загрузка файлов под именем поля `file`.
    pub async fn upload<TRes>(&self, path: &str, files: &[UploadFile]) -> BoardClientResult<TRes>
    where
        TRes: DeserializeOwned,
    {
        if files.is_empty() {
            return Err(BoardClientError::Validation(
                "at least one file is required".to_string(),
            ));
        }

        let mut form = Form::new();
        for file in files {
            let mut part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
            if let Some(mime) = &file.mime {
                part = part.mime_str(mime).map_err(BoardClientError::Http)?;
            }
            form = form.part("file", part);
        }

        let request = self.builder(Method::POST, path).multipart(form);
        let response = self.execute(request).await?;
        Self::decode(response).await
    }

    fn builder(&self, method: Method, path: &str) -> RequestBuilder {
        debug!(%method, path, "request");
        let mut request = self.client.request(method, self.config.endpoint(path));
        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token);
        }
        request
    }

    async fn execute(&self, request: RequestBuilder) -> BoardClientResult<Response> {
        let response = request
            .send()
            .await
            .map_err(BoardClientError::from_reqwest)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            if self.session.is_logged_in() {
                warn!(url = %response.url(), "server rejected session token, logging out");
            }
            self.session.clear();
            return Err(BoardClientError::SessionExpired);
        }

        debug!(%status, url = %response.url(), "request failed");
        Err(Self::decode_error(response).await)
    }

    async fn decode<TRes>(response: Response) -> BoardClientResult<TRes>
    where
        TRes: DeserializeOwned,
    {
        let bytes = response
            .bytes()
            .await
            .map_err(BoardClientError::from_reqwest)?;
        serde_json::from_slice::<TRes>(&bytes)
            .map_err(|err| BoardClientError::Decode(err.to_string()))
    }

    async fn decode_error(response: Response) -> BoardClientError {
        let status = response.status();
        let message = match response.json::<ErrorResponseDto>().await {
            Ok(body) => body.message.or(body.error),
            Err(_) => None,
        };
        BoardClientError::from_http_status(status, message)
    }
}
