use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::api::BoardApi;
use crate::error::BoardClientResult;
use crate::models::{Page, PostSummary};
use crate::query::{FetchStrategy, QueryState};

/// Сколько номеров страниц показывает пагинация.
pub const PAGE_WINDOW_SIZE: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Фаза загрузки списка.
pub enum ListStatus {
    /// Ещё ничего не запрашивали.
    Idle,
    /// Запрос последнего состояния в полёте.
    Loading,
    /// Последний запрос успешен.
    Loaded,
    /// Последний запрос завершился ошибкой.
    Errored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Метка исходящего запроса: порядковый номер и состояние, из которого он
/// построен.
pub struct FetchTicket {
    seq: u64,
    query: QueryState,
}

impl FetchTicket {
    /// Состояние, для которого выдан запрос.
    pub fn query(&self) -> &QueryState {
        &self.query
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Чем закончился `refresh`.
pub enum SyncOutcome {
    /// Ответ применён к экрану.
    Applied,
    /// Ответ устарел (после него был запрошен другой) и выброшен.
    Discarded,
}

#[derive(Debug, Clone)]
/// То, что сейчас показывает список.
pub struct ListView {
    /// Фаза загрузки.
    pub status: ListStatus,
    /// Последняя успешно загруженная страница. При ошибке не очищается.
    pub page: Option<Page<PostSummary>>,
    /// Состояние, которому соответствует `page`.
    pub loaded_query: Option<QueryState>,
    /// Последнее запрошенное состояние.
    pub requested_query: Option<QueryState>,
    /// Текст последней ошибки.
    pub error: Option<String>,
}

impl ListView {
    fn idle() -> Self {
        Self {
            status: ListStatus::Idle,
            page: None,
            loaded_query: None,
            requested_query: None,
            error: None,
        }
    }

    /// `true`, если список загружен и пуст.
    pub fn is_empty(&self) -> bool {
        self.status == ListStatus::Loaded && self.page.as_ref().is_some_and(Page::is_empty)
    }

    /// `true`, пока идёт загрузка.
    pub fn is_loading(&self) -> bool {
        self.status == ListStatus::Loading
    }

    /// Пагинация для показанной страницы.
    pub fn window(&self) -> Option<PageWindow> {
        self.page
            .as_ref()
            .map(|page| PageWindow::new(page.page_index, page.total_pages))
    }
}

struct ListInner {
    issued: u64,
    latest: Option<FetchTicket>,
    // Статус последнего завершённого запроса, без `Loading`.
    settled: ListStatus,
    view: ListView,
}

/// Загружает страницу постов для текущего `QueryState`.
///
/// Порядок применения ответов совпадает с порядком запросов: ответ, чей
/// билет уже не последний, выбрасывается при получении.
pub struct ListSynchronizer<A: BoardApi> {
    api: Arc<A>,
    page_size: u32,
    inner: Mutex<ListInner>,
}

impl<A: BoardApi> ListSynchronizer<A> {
    /// Синхронизатор со страницами по `page_size` постов.
    pub fn new(api: Arc<A>, page_size: u32) -> Self {
        Self {
            api,
            page_size: page_size.max(1),
            inner: Mutex::new(ListInner {
                issued: 0,
                latest: None,
                settled: ListStatus::Idle,
                view: ListView::idle(),
            }),
        }
    }

    /// Снимок текущего состояния списка.
    pub fn snapshot(&self) -> ListView {
        self.lock().view.clone()
    }

    /// Запрашивает страницу для `query`.
    ///
    /// Ошибка возвращается только если запрос всё ещё актуален; ошибки
    /// устаревших запросов тоже выбрасываются.
    pub async fn refresh(&self, query: &QueryState) -> BoardClientResult<SyncOutcome> {
        let ticket = self.issue(query);
        let result = self.fetch(ticket.query()).await;
        self.resolve(ticket, result)
    }

    /// Выдаёт билет и переводит список в `Loading`.
    pub fn issue(&self, query: &QueryState) -> FetchTicket {
        let mut inner = self.lock();
        inner.issued += 1;
        let ticket = FetchTicket {
            seq: inner.issued,
            query: query.clone(),
        };
        inner.latest = Some(ticket.clone());
        inner.view.status = ListStatus::Loading;
        inner.view.requested_query = Some(query.clone());
        ticket
    }

    /// Применяет результат запроса `ticket`, если он всё ещё последний.
    pub fn resolve(
        &self,
        ticket: FetchTicket,
        result: BoardClientResult<Page<PostSummary>>,
    ) -> BoardClientResult<SyncOutcome> {
        let mut inner = self.lock();
        if inner.latest.as_ref() != Some(&ticket) {
            debug!(seq = ticket.seq, query = ?ticket.query, "discarding stale list response");
            return Ok(SyncOutcome::Discarded);
        }

        match result {
            Ok(page) => {
                inner.settled = ListStatus::Loaded;
                inner.view.status = ListStatus::Loaded;
                inner.view.page = Some(page);
                inner.view.loaded_query = Some(ticket.query);
                inner.view.error = None;
                Ok(SyncOutcome::Applied)
            }
            Err(err) if err.is_handled_globally() => {
                // Сессию уже сбросил транспорт, экран списка не трогаем.
                debug!(error = %err, query = ?ticket.query, "list request ended by global error");
                let settled = inner.settled;
                inner.view.status = settled;
                Err(err)
            }
            Err(err) => {
                warn!(error = %err, query = ?ticket.query, "failed to load posts");
                inner.settled = ListStatus::Errored;
                inner.view.status = ListStatus::Errored;
                inner.view.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    async fn fetch(&self, query: &QueryState) -> BoardClientResult<Page<PostSummary>> {
        match query.strategy() {
            FetchStrategy::Search { keyword } => {
                self.api
                    .search_posts(keyword, query.page, self.page_size)
                    .await
            }
            FetchStrategy::Category { category_id } => {
                self.api
                    .posts_by_category(category_id, query.page, self.page_size)
                    .await
            }
            FetchStrategy::All => self.api.list_posts(query.page, self.page_size).await,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ListInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Окно номеров страниц для пагинации.
pub struct PageWindow {
    /// Номера страниц с нуля, не больше `PAGE_WINDOW_SIZE`.
    pub pages: Vec<u32>,
    /// Текущая страница, прижатая к `[0, total_pages)`.
    pub current: u32,
    /// Всего страниц.
    pub total_pages: u32,
    /// Доступна ли кнопка «назад».
    pub has_previous: bool,
    /// Доступна ли кнопка «вперёд».
    pub has_next: bool,
}

impl PageWindow {
    /// Окно вокруг `current`, не выходящее за границы.
    pub fn new(current: u32, total_pages: u32) -> Self {
        if total_pages == 0 {
            return Self {
                pages: Vec::new(),
                current: 0,
                total_pages,
                has_previous: false,
                has_next: false,
            };
        }

        let current = current.min(total_pages - 1);
        let mut start = current.saturating_sub(PAGE_WINDOW_SIZE / 2);
        let end = start.saturating_add(PAGE_WINDOW_SIZE).min(total_pages);
        if end - start < PAGE_WINDOW_SIZE {
            start = end.saturating_sub(PAGE_WINDOW_SIZE);
        }

        Self {
            pages: (start..end).collect(),
            current,
            total_pages,
            has_previous: current > 0,
            has_next: current + 1 < total_pages,
        }
    }

    /// Пагинацию показывают только когда страниц больше одной.
    pub fn is_visible(&self) -> bool {
        self.total_pages > 1
    }
}
