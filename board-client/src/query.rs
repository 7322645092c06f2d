//! Состояние фильтров списка (страница, поиск, категория) и его
//! отображение в query-строку адреса.
//!
//! Адрес является единственным источником правды: `QueryStateController`
//! не хранит отдельной копии состояния, а каждый раз разбирает текущую
//! запись `History`.

use tokio::sync::watch;
use tracing::debug;
use url::form_urlencoded;

/// Параметр номера страницы.
pub const PAGE_PARAM: &str = "page";
/// Параметр поискового запроса.
pub const KEYWORD_PARAM: &str = "keyword";
/// Параметр категории.
pub const CATEGORY_PARAM: &str = "category";

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
/// Выбор пользователя в списке постов.
pub struct QueryState {
    /// Номер страницы с нуля.
    pub page: u32,
    /// Поисковый запрос, пустая строка значит «без поиска».
    pub keyword: String,
    /// Выбранная категория.
    pub category_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Какой эндпоинт списка использовать.
pub enum FetchStrategy<'a> {
    /// Поиск по ключевому слову.
    Search {
        /// Запрос без крайних пробелов.
        keyword: &'a str,
    },
    /// Посты одной категории.
    Category {
        /// Идентификатор категории.
        category_id: i64,
    },
    /// Все посты.
    All,
}

impl QueryState {
    /// Начальная страница без фильтров.
    pub fn all() -> Self {
        Self::default()
    }

    /// Поиск с первой страницы.
    pub fn search(keyword: impl Into<String>) -> Self {
        Self {
            page: 0,
            keyword: keyword.into(),
            category_id: None,
        }
    }

    /// Категория с первой страницы.
    pub fn category(category_id: i64) -> Self {
        Self {
            page: 0,
            keyword: String::new(),
            category_id: Some(category_id),
        }
    }

    /// То же состояние на другой странице.
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }

    /// Непустой поиск важнее категории.
    pub fn strategy(&self) -> FetchStrategy<'_> {
        let keyword = self.keyword.trim();
        if !keyword.is_empty() {
            return FetchStrategy::Search { keyword };
        }
        match self.category_id {
            Some(category_id) => FetchStrategy::Category { category_id },
            None => FetchStrategy::All,
        }
    }

    /// Сериализует в query-строку без ведущего `?`.
    ///
    /// `page` пишется всегда, `keyword` только непустой, `category` только
    /// если выбрана.
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        if !self.keyword.is_empty() {
            serializer.append_pair(KEYWORD_PARAM, &self.keyword);
        }
        if let Some(category_id) = self.category_id {
            serializer.append_pair(CATEGORY_PARAM, &category_id.to_string());
        }
        serializer.append_pair(PAGE_PARAM, &self.page.to_string());
        serializer.finish()
    }

    /// Разбирает query-строку (ведущий `?` допускается).
    ///
    /// Некорректный `page` даёт `0`, некорректный `category` отсутствует,
    /// неизвестные параметры игнорируются. При повторах берётся первое значение.
    pub fn from_query_string(raw: &str) -> Self {
        let raw = raw.strip_prefix('?').unwrap_or(raw);

        let mut page = None;
        let mut keyword = None;
        let mut category_id = None;

        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                PAGE_PARAM if page.is_none() => page = Some(value.parse::<u32>().unwrap_or(0)),
                KEYWORD_PARAM if keyword.is_none() => keyword = Some(value.into_owned()),
                CATEGORY_PARAM if category_id.is_none() => {
                    category_id = Some(value.parse::<i64>().ok())
                }
                _ => {}
            }
        }

        Self {
            page: page.unwrap_or(0),
            keyword: keyword.unwrap_or_default(),
            category_id: category_id.flatten(),
        }
    }
}

#[derive(Debug, Clone)]
/// История адресов: записи query-строк и курсор на текущую.
pub struct History {
    entries: Vec<String>,
    cursor: usize,
}

impl History {
    /// История из одной записи.
    pub fn new(initial: impl Into<String>) -> Self {
        let initial = initial.into();
        let initial = initial.strip_prefix('?').unwrap_or(&initial).to_string();
        Self {
            entries: vec![initial],
            cursor: 0,
        }
    }

    /// Текущая query-строка.
    pub fn current(&self) -> &str {
        &self.entries[self.cursor]
    }

    /// Добавляет запись, отбрасывая записи «вперёд».
    pub fn push(&mut self, entry: String) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(entry);
        self.cursor = self.entries.len() - 1;
    }

    /// Заменяет текущую запись.
    pub fn replace(&mut self, entry: String) {
        self.entries[self.cursor] = entry;
    }

    /// Шаг назад; `false`, если назад некуда.
    pub fn back(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    /// Шаг вперёд; `false`, если вперёд некуда.
    pub fn forward(&mut self) -> bool {
        if self.cursor + 1 >= self.entries.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// Количество записей.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// История никогда не бывает пустой.
    pub fn is_empty(&self) -> bool {
        false
    }
}

#[derive(Debug)]
/// Контроллер фильтров списка.
///
/// Методы записи возвращают `Some(state)`, если адрес изменился и список
/// нужно перезапросить, и `None`, если действие ничего не поменяло.
pub struct QueryStateController {
    history: History,
    state: watch::Sender<QueryState>,
}

impl QueryStateController {
    /// Контроллер, стартующий с адреса `initial_query`.
    pub fn new(initial_query: &str) -> Self {
        let history = History::new(initial_query);
        let (state, _) = watch::channel(QueryState::from_query_string(history.current()));
        Self { history, state }
    }

    /// Текущее состояние, прочитанное из адреса.
    pub fn current(&self) -> QueryState {
        QueryState::from_query_string(self.history.current())
    }

    /// Текущая query-строка адреса.
    pub fn url_query(&self) -> &str {
        self.history.current()
    }

    /// История адресов.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Подписка на смену состояния.
    pub fn subscribe(&self) -> watch::Receiver<QueryState> {
        self.state.subscribe()
    }

    /// Новый поиск с первой страницы. Пустой или пробельный запрос ничего
    /// не делает (это не «сброс поиска»).
    pub fn submit_keyword(&mut self, raw: &str) -> Option<QueryState> {
        let keyword = raw.trim();
        if keyword.is_empty() {
            return None;
        }
        self.write(QueryState::search(keyword))
    }

    /// Переключает категорию с первой страницы; `None` значит «все посты».
    pub fn select_category(&mut self, category_id: Option<i64>) -> Option<QueryState> {
        let next = match category_id {
            Some(category_id) => QueryState::category(category_id),
            None => QueryState::all(),
        };
        self.write(next)
    }

    /// Меняет только страницу.
    pub fn go_to_page(&mut self, page: u32) -> Option<QueryState> {
        let next = self.current().with_page(page);
        self.write(next)
    }

    /// Навигация назад по истории.
    pub fn back(&mut self) -> Option<QueryState> {
        if !self.history.back() {
            return None;
        }
        self.on_navigation()
    }

    /// Навигация вперёд по истории.
    pub fn forward(&mut self) -> Option<QueryState> {
        if !self.history.forward() {
            return None;
        }
        self.on_navigation()
    }

    fn write(&mut self, next: QueryState) -> Option<QueryState> {
        let encoded = next.to_query_string();
        if self.current() == next {
            // Эквивалентное состояние не плодит записей в истории.
            self.history.replace(encoded);
            return None;
        }

        debug!(query = %encoded, "query state changed");
        self.history.push(encoded);
        self.on_navigation()
    }

    fn on_navigation(&mut self) -> Option<QueryState> {
        let current = self.current();
        let changed = self.state.send_if_modified(|state| {
            if *state == current {
                return false;
            }
            *state = current.clone();
            true
        });
        changed.then_some(current)
    }
}
