mod logging;
mod settings;

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result, anyhow};
use board_client::{
    AuthResponse, BoardApi, BoardClient, BoardClientError, Category, CommentDraft, DeleteOutcome,
    DetailView, FileSessionStorage, ListView, PostDetail, PostDraft, ProfilePatch, SessionStore,
    SignUpRequest, UploadFile, UploadedFile, UserIdentity,
};
use clap::{Parser, Subcommand};
use tracing::debug;

use crate::logging::init_logging;
use crate::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "board-cli", version, about = "CLI клиент для доски объявлений")]
struct Cli {
    /// Адрес API, например `http://localhost:8080/api`.
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Регистрация пользователя (сразу выполняет вход).
    Signup {
        #[arg(long)]
        login: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        nickname: String,
        #[arg(long)]
        email: String,
    },
    /// Вход пользователя.
    Login {
        #[arg(long)]
        login: String,
        #[arg(long)]
        password: String,
    },
    /// Выход: удаляет сохранённую сессию.
    Logout,
    /// Профиль текущего пользователя.
    Me,
    /// Изменение профиля (требует вход).
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Список постов.
    ///
    /// `--query` задаёт исходную query-строку (`keyword=..&category=..&page=..`),
    /// остальные флаги применяются поверх неё.
    List {
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        keyword: Option<String>,
        #[arg(long)]
        category: Option<i64>,
        /// Номер страницы, начиная с 1.
        #[arg(long)]
        page: Option<u32>,
    },
    /// Пост с комментариями.
    Show {
        #[arg(long)]
        id: i64,
    },
    /// Поставить или снять лайк (требует вход).
    Like {
        #[arg(long)]
        id: i64,
    },
    /// Комментарии (требуют вход).
    #[command(subcommand)]
    Comment(CommentCommand),
    /// Посты (требуют вход).
    #[command(subcommand)]
    Post(PostCommand),
    /// Список категорий.
    Categories,
    /// Загрузка изображений (требует вход).
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
enum CommentCommand {
    /// Добавить комментарий.
    Add {
        #[arg(long)]
        post: i64,
        #[arg(long)]
        content: String,
    },
    /// Изменить свой комментарий.
    Edit {
        #[arg(long)]
        post: i64,
        #[arg(long)]
        id: i64,
        #[arg(long)]
        content: String,
    },
    /// Удалить свой комментарий.
    Delete {
        #[arg(long)]
        post: i64,
        #[arg(long)]
        id: i64,
        /// Не спрашивать подтверждение.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
enum ProfileCommand {
    /// Изменить имя или email.
    Update {
        #[arg(long)]
        nickname: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Сменить пароль.
    Password {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },
    /// Загрузить аватар.
    Avatar { file: PathBuf },
    /// Удалить аккаунт.
    Delete {
        #[arg(long)]
        password: String,
    },
}

#[derive(Debug, Subcommand)]
enum PostCommand {
    /// Создать пост.
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        #[arg(long)]
        category: Option<i64>,
    },
    /// Обновить пост.
    ///
    /// Если `--content` не указан, используется текущее содержимое поста.
    Update {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        category: Option<i64>,
    },
    /// Удалить пост.
    Delete {
        #[arg(long)]
        id: i64,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Ошибка: {err}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings = Settings::from_env()?.with_server(cli.server);
    init_logging(&settings.log_level)?;
    debug!(
        base_url = %settings.base_url,
        session_file = %settings.session_file.display(),
        "board-cli started"
    );

    let session = SessionStore::restore(FileSessionStorage::new(settings.session_file.clone()));
    let client = BoardClient::new(settings.client_config(), session)
        .map_err(map_client_error)
        .context("не удалось создать HTTP клиент")?;

    match cli.command {
        Command::Signup {
            login,
            password,
            nickname,
            email,
        } => {
            let auth = client
                .signup(SignUpRequest {
                    login_id: login,
                    password,
                    nickname,
                    email,
                })
                .await
                .map_err(map_client_error)?;
            print_auth("Регистрация успешна", &auth);
        }
        Command::Login { login, password } => {
            let auth = client
                .login(&login, &password)
                .await
                .map_err(map_client_error)?;
            print_auth("Вход выполнен", &auth);
        }
        Command::Logout => {
            client.logout();
            println!("Сессия удалена");
        }
        Command::Me => {
            let user = client.me().await.map_err(map_client_error)?;
            print_user(&user);
        }
        Command::List {
            query,
            keyword,
            category,
            page,
        } => {
            let mut controller = client.query_controller(query.as_deref().unwrap_or_default());
            if let Some(keyword) = keyword {
                controller.submit_keyword(&keyword);
            }
            if category.is_some() {
                controller.select_category(category);
            }
            if let Some(page) = page {
                controller.go_to_page(page.saturating_sub(1));
            }

            let sync = client.list_synchronizer();
            sync.refresh(&controller.current())
                .await
                .map_err(map_client_error)?;
            print_list(controller.url_query(), &sync.snapshot());
        }
        Command::Show { id } => {
            let detail = client.open_post(id).await.map_err(map_client_error)?;
            print_detail(&client, &detail.snapshot());
        }
        Command::Like { id } => {
            let detail = client.open_post(id).await.map_err(map_client_error)?;
            let liked = detail.toggle_like().await.map_err(map_client_error)?;
            let view = detail.snapshot();
            let state = if liked { "поставлен" } else { "снят" };
            println!("Лайк {state}: likes={}", view.post.like_count);
        }
        Command::Profile(command) => run_profile(&client, command).await?,
        Command::Comment(command) => run_comment(&client, command).await?,
        Command::Post(command) => run_post(&client, command).await?,
        Command::Categories => {
            let categories = client.categories().await.map_err(map_client_error)?;
            print_categories(&categories);
        }
        Command::Upload { files } => {
            let files = files
                .iter()
                .map(|path| read_upload(path))
                .collect::<Result<Vec<_>>>()?;
            let uploaded = client
                .upload_images(files)
                .await
                .map_err(map_client_error)?;
            print_uploaded(&client, &uploaded);
        }
    }

    Ok(())
}

async fn run_profile(client: &BoardClient, command: ProfileCommand) -> Result<()> {
    match command {
        ProfileCommand::Update { nickname, email } => {
            if nickname.is_none() && email.is_none() {
                return Err(anyhow!("укажите --nickname и/или --email"));
            }
            let user = client
                .update_profile(ProfilePatch {
                    nickname,
                    email,
                    profile_image_url: None,
                })
                .await
                .map_err(map_client_error)?;
            println!("Профиль обновлён");
            print_user(&user);
        }
        ProfileCommand::Password { current, new } => {
            client
                .change_password(&current, &new)
                .await
                .map_err(map_client_error)?;
            println!("Пароль изменён");
        }
        ProfileCommand::Avatar { file } => {
            let uploaded = client
                .upload_profile_image(read_upload(&file)?)
                .await
                .map_err(map_client_error)?;
            print_uploaded(client, std::slice::from_ref(&uploaded));
        }
        ProfileCommand::Delete { password } => {
            client
                .delete_account(&password)
                .await
                .map_err(map_client_error)?;
            println!("Аккаунт удалён");
        }
    }
    Ok(())
}

async fn run_comment(client: &BoardClient, command: CommentCommand) -> Result<()> {
    match command {
        CommentCommand::Add { post, content } => {
            let detail = client.open_post(post).await.map_err(map_client_error)?;
            let comment = detail
                .create_comment(CommentDraft::text(content))
                .await
                .map_err(map_client_error)?;
            println!(
                "Комментарий добавлен: id={}, комментариев={}",
                comment.id,
                detail.snapshot().post.comment_count
            );
        }
        CommentCommand::Edit { post, id, content } => {
            let detail = client.open_post(post).await.map_err(map_client_error)?;
            let comment = detail
                .update_comment(id, CommentDraft::text(content))
                .await
                .map_err(map_client_error)?;
            println!("Комментарий обновлён: id={}", comment.id);
        }
        CommentCommand::Delete { post, id, yes } => {
            let detail = client.open_post(post).await.map_err(map_client_error)?;
            let outcome = detail
                .delete_comment(id, |comment| yes || confirm_delete(&comment.content))
                .await
                .map_err(map_client_error)?;
            match outcome {
                DeleteOutcome::Deleted => println!(
                    "Комментарий удалён: id={id}, комментариев={}",
                    detail.snapshot().post.comment_count
                ),
                DeleteOutcome::Cancelled => println!("Удаление отменено"),
            }
        }
    }
    Ok(())
}

async fn run_post(client: &BoardClient, command: PostCommand) -> Result<()> {
    match command {
        PostCommand::Create {
            title,
            content,
            category,
        } => {
            let post = client
                .create_post(PostDraft {
                    title,
                    content,
                    category_id: category,
                    image_urls: Vec::new(),
                })
                .await
                .map_err(map_client_error)?;
            print_post("Пост создан", &post);
        }
        PostCommand::Update {
            id,
            title,
            content,
            category,
        } => {
            // Без --content оставляем текущий текст поста.
            let content = match content {
                Some(content) => content,
                None => {
                    client
                        .api()
                        .get_post(id)
                        .await
                        .map_err(map_client_error)?
                        .content
                }
            };
            let post = client
                .update_post(
                    id,
                    PostDraft {
                        title,
                        content,
                        category_id: category,
                        image_urls: Vec::new(),
                    },
                )
                .await
                .map_err(map_client_error)?;
            print_post("Пост обновлён", &post);
        }
        PostCommand::Delete { id } => {
            client.delete_post(id).await.map_err(map_client_error)?;
            println!("Пост удалён: id={id}");
        }
    }
    Ok(())
}

fn confirm_delete(content: &str) -> bool {
    print!("Удалить комментарий «{content}»? [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    is_confirmation(&answer)
}

fn is_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "д" | "да")
}

fn read_upload(path: &Path) -> Result<UploadFile> {
    let bytes = fs::read(path).with_context(|| format!("не удалось прочитать {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("некорректное имя файла: {}", path.display()))?;
    Ok(UploadFile {
        mime: guess_mime(&file_name).map(str::to_string),
        file_name,
        bytes,
    })
}

fn guess_mime(file_name: &str) -> Option<&'static str> {
    let (_, ext) = file_name.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

fn map_client_error(err: BoardClientError) -> anyhow::Error {
    let message = match err {
        BoardClientError::SessionExpired => {
            "сессия истекла: выполните `board-cli login ...` заново".to_string()
        }
        BoardClientError::LoginRequired => {
            "требуется вход: выполните `board-cli login ...` или `board-cli signup ...`"
                .to_string()
        }
        BoardClientError::Validation(message) => format!("некорректный запрос: {message}"),
        BoardClientError::Forbidden => "недостаточно прав".to_string(),
        BoardClientError::NotFound => "ресурс не найден".to_string(),
        BoardClientError::Server { status, message } => {
            format!("ошибка сервера: status={status}, message={message}")
        }
        BoardClientError::Http(err) => format!("ошибка HTTP: {err}"),
        BoardClientError::Decode(message) => format!("некорректный ответ сервера: {message}"),
        BoardClientError::Storage(message) => format!("ошибка хранилища сессии: {message}"),
        BoardClientError::Busy(action) => format!("операция уже выполняется: {action}"),
    };
    anyhow!(message)
}

fn print_user(user: &UserIdentity) {
    println!("user:");
    println!("  id: {}", user.id);
    println!("  login: {}", user.login_id);
    println!("  nickname: {}", user.nickname);
    println!("  email: {}", user.email);
    println!("  role: {}", user.role);
    if let Some(created_at) = user.created_at {
        println!("  created_at: {created_at}");
    }
}

fn print_auth(title: &str, auth: &AuthResponse) {
    println!("{title}");
    println!("token: {}", auth.token);
    print_user(&auth.user);
}

fn print_post(title: &str, post: &PostDetail) {
    println!("{title}");
    println!("id: {}", post.id);
    println!("title: {}", post.title);
    println!("content: {}", post.content);
    println!("author: {}", post.author_nickname);
    if let Some(category) = &post.category_name {
        println!("category: {category}");
    }
    println!(
        "views: {}, likes: {}, comments: {}",
        post.view_count, post.like_count, post.comment_count
    );
    println!("created_at: {}", post.created_at);
    if let Some(updated_at) = post.updated_at {
        println!("updated_at: {updated_at}");
    }
}

fn print_detail(client: &BoardClient, view: &DetailView) {
    print_post("Пост", &view.post);
    if view.post.is_liked {
        println!("Вы поставили лайк");
    }
    for image in &view.post.images {
        if let Some(url) = client.config().resolve_image_url(&image.image_url) {
            println!("image: {url}");
        }
    }

    if let Some(error) = &view.comments_error {
        println!("Комментарии не загрузились: {error}");
        return;
    }
    println!("Комментарии ({}):", view.comments.len());
    let me = client.session().user().map(|user| user.id);
    for comment in &view.comments {
        let own = if me.is_some() && comment.author_id == me {
            " *"
        } else {
            ""
        };
        println!(
            "- [{}] {}: {}{own}",
            comment.id, comment.author_nickname, comment.content
        );
    }
}

fn print_list(url_query: &str, view: &ListView) {
    println!("?{url_query}");
    let Some(page) = &view.page else {
        println!("Список не загружен");
        return;
    };

    if view.is_empty() {
        println!("Постов нет");
        return;
    }

    println!(
        "Постов: {} (страница {} из {}, всего {})",
        page.items.len(),
        page.page_index + 1,
        page.total_pages,
        page.total_elements
    );
    for post in &page.items {
        println!(
            "- [{}] {} ({}, likes={}, comments={})",
            post.id, post.title, post.author_nickname, post.like_count, post.comment_count
        );
    }

    if let Some(window) = view.window().filter(|window| window.is_visible()) {
        println!("{}", format_window(&window.pages, window.current));
    }
}

fn format_window(pages: &[u32], current: u32) -> String {
    pages
        .iter()
        .map(|&page| {
            if page == current {
                format!("[{}]", page + 1)
            } else {
                format!("{}", page + 1)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_categories(categories: &[Category]) {
    println!("Категорий: {}", categories.len());
    for category in categories {
        println!("- [{}] {}", category.id, category.name);
    }
}

fn print_uploaded(client: &BoardClient, uploaded: &[UploadedFile]) {
    println!("Загружено файлов: {}", uploaded.len());
    for file in uploaded {
        let url = client
            .config()
            .resolve_image_url(&file.image_url)
            .unwrap_or_else(|| file.image_url.clone());
        println!("- {url}");
    }
}
