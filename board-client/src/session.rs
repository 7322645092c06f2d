//! Хранилище сессии: единственный источник правды о том, выполнен ли вход.
//!
//! Токен и пользователь живут только парой. Запись идёт через `set`/`clear`,
//! чтение через `get` или подписку `subscribe`. Долговременное хранилище
//! (`SessionStorage`) подключается опционально; его сбои не фатальны,
//! сессия просто остаётся в памяти до конца процесса.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{BoardClientError, BoardClientResult};
use crate::models::UserIdentity;

/// Ключ токена в сохранённой записи.
pub const TOKEN_KEY: &str = "token";
/// Ключ пользователя в сохранённой записи.
pub const USER_KEY: &str = "user";

#[derive(Debug, Clone, Default, PartialEq)]
/// Текущая сессия клиента.
pub enum Session {
    /// Вход не выполнен.
    #[default]
    Anonymous,
    /// Есть токен и пользователь.
    Authenticated {
        /// Токен доступа.
        token: String,
        /// Пользователь, которому выдан токен.
        user: UserIdentity,
    },
}

impl Session {
    /// Создаёт авторизованную сессию; пустой токен даёт `Anonymous`.
    pub fn authenticated(token: impl Into<String>, user: UserIdentity) -> Self {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Self::Anonymous;
        }
        Self::Authenticated { token, user }
    }

    /// Токен, если сессия есть.
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Authenticated { token, .. } => Some(token),
            Self::Anonymous => None,
        }
    }

    /// Пользователь, если сессия есть.
    pub fn user(&self) -> Option<&UserIdentity> {
        match self {
            Self::Authenticated { user, .. } => Some(user),
            Self::Anonymous => None,
        }
    }

    /// `true`, если вход выполнен.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Запись сессии в долговременном хранилище.
pub struct StoredSession {
    /// Токен (ключ `token`).
    pub token: String,
    /// Пользователь (ключ `user`).
    pub user: UserIdentity,
}

impl StoredSession {
    fn into_session(self) -> Session {
        Session::authenticated(self.token, self.user)
    }
}

fn parse_stored(raw: &str) -> Option<StoredSession> {
    let stored = serde_json::from_str::<StoredSession>(raw).ok()?;
    if stored.token.trim().is_empty() {
        return None;
    }
    Some(stored)
}

/// Долговременное хранилище сессии. Токен и пользователь пишутся и
/// удаляются вместе.
pub trait SessionStorage: Send + Sync {
    /// Загружает запись; битая или пустая запись даёт `Ok(None)`.
    fn load(&self) -> BoardClientResult<Option<StoredSession>>;
    /// Сохраняет запись целиком.
    fn save(&self, session: &StoredSession) -> BoardClientResult<()>;
    /// Удаляет запись.
    fn clear(&self) -> BoardClientResult<()>;
}

#[derive(Debug, Default)]
/// Хранилище в памяти процесса.
pub struct MemorySessionStorage {
    slot: Mutex<Option<StoredSession>>,
}

impl MemorySessionStorage {
    /// Пустое хранилище.
    pub fn new() -> Self {
        Self::default()
    }

    /// Хранилище с заранее сохранённой записью.
    pub fn with_session(session: StoredSession) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
        }
    }
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> BoardClientResult<Option<StoredSession>> {
        Ok(lock(&self.slot).clone())
    }

    fn save(&self, session: &StoredSession) -> BoardClientResult<()> {
        *lock(&self.slot) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> BoardClientResult<()> {
        *lock(&self.slot) = None;
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Хранилище в JSON-файле `{"token": ..., "user": {...}}`.
///
/// Запись идёт через временный файл и `rename`, поэтому ключи никогда не
/// оказываются на диске по отдельности.
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    /// Хранилище в указанном файле.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Путь к файлу сессии.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn storage_error(action: &str, err: io::Error) -> BoardClientError {
        BoardClientError::Storage(format!("failed to {action} session file: {err}"))
    }
}

impl SessionStorage for FileSessionStorage {
    fn load(&self) -> BoardClientResult<Option<StoredSession>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Self::storage_error("read", err)),
        };

        let stored = parse_stored(&raw);
        if stored.is_none() {
            warn!(path = %self.path.display(), "ignoring malformed session file");
        }
        Ok(stored)
    }

    fn save(&self, session: &StoredSession) -> BoardClientResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| Self::storage_error("create dir for", err))?;
        }

        let raw = serde_json::to_string(session)
            .map_err(|err| {
                BoardClientError::Storage(format!("failed to serialize session: {err}"))
            })?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw).map_err(|err| Self::storage_error("write", err))?;
        fs::rename(&tmp, &self.path).map_err(|err| Self::storage_error("replace", err))
    }

    fn clear(&self) -> BoardClientResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Self::storage_error("remove", err)),
        }
    }
}

/// Наблюдаемое хранилище текущей сессии.
pub struct SessionStore {
    state: watch::Sender<Session>,
    storage: Mutex<Option<Box<dyn SessionStorage>>>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_logged_in())
            .field("durable", &lock(&self.storage).is_some())
            .finish()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl SessionStore {
    /// Хранилище без долговременной записи.
    pub fn in_memory() -> Self {
        let (state, _) = watch::channel(Session::Anonymous);
        Self {
            state,
            storage: Mutex::new(None),
        }
    }

    /// Восстанавливает сессию из `storage` и продолжает в него писать.
    ///
    /// Ошибка чтения не мешает работе: стартуем гостем, хранилище остаётся
    /// подключённым.
    pub fn restore(storage: impl SessionStorage + 'static) -> Self {
        let initial = match storage.load() {
            Ok(Some(stored)) => stored.into_session(),
            Ok(None) => Session::Anonymous,
            Err(err) => {
                warn!(error = %err, "failed to restore session, starting anonymous");
                Session::Anonymous
            }
        };

        let (state, _) = watch::channel(initial);
        Self {
            state,
            storage: Mutex::new(Some(Box::new(storage))),
        }
    }

    /// Текущая сессия.
    pub fn get(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Токен текущей сессии.
    pub fn token(&self) -> Option<String> {
        self.state.borrow().token().map(str::to_string)
    }

    /// Пользователь текущей сессии.
    pub fn user(&self) -> Option<UserIdentity> {
        self.state.borrow().user().cloned()
    }

    /// `true`, если вход выполнен.
    pub fn is_logged_in(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Подписка на изменения сессии.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Заменяет сессию. `Session::Anonymous` эквивалентен `clear()`.
    pub fn set(&self, session: Session) {
        let Session::Authenticated { token, user } = &session else {
            self.clear();
            return;
        };

        let user_id = user.id;
        let stored = StoredSession {
            token: token.clone(),
            user: user.clone(),
        };
        self.commit(session, |storage| storage.save(&stored));
        debug!(user_id, "session set");
    }

    /// Обновляет данные пользователя, сохраняя токен. Без сессии ничего не делает.
    pub fn update_user(&self, user: UserIdentity) {
        let Some(token) = self.token() else {
            return;
        };
        self.set(Session::Authenticated { token, user });
    }

    /// Удаляет сессию.
    pub fn clear(&self) {
        let previous = self.commit(Session::Anonymous, |storage| storage.clear());
        if previous.is_authenticated() {
            debug!("session cleared");
        }
    }

    /// Пишет в хранилище и в канал под одной блокировкой хранилища, чтобы
    /// диск и память отражали одну и ту же последнюю запись.
    fn commit(
        &self,
        next: Session,
        op: impl FnOnce(&dyn SessionStorage) -> BoardClientResult<()>,
    ) -> Session {
        let mut guard = lock(&self.storage);
        let failed = match guard.as_deref() {
            Some(storage) => op(storage).err(),
            None => None,
        };
        if let Some(err) = failed {
            warn!(error = %err, "session storage unavailable, keeping session in memory only");
            *guard = None;
        }
        self.state.send_replace(next)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
