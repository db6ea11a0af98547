use std::process;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use feed_client::{
    Comment, FeedStore, HttpGateway, LeaderboardEntry, LeaderboardStore, Post, Session,
    SyncOutcome,
};
use serde::Serialize;
use tracing::{debug, info};

mod logging;
mod settings;

use logging::init_logging;
use settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "feed-cli", version, about = "CLI клиент ленты: посты, комментарии, лайки, рейтинг")]
struct Cli {
    /// Корень API (по умолчанию FEED_API_URL).
    #[arg(long, global = true)]
    server: Option<String>,

    /// Печатать результат в JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Лента постов.
    Posts,
    /// Дерево комментариев поста.
    Comments {
        #[arg(long)]
        post: i64,
    },
    /// Лайк поста.
    LikePost {
        #[arg(long)]
        post: i64,
    },
    /// Лайк комментария.
    LikeComment {
        #[arg(long)]
        post: i64,
        #[arg(long)]
        comment: i64,
    },
    /// Новый пост от имени пользователя сессии.
    Post {
        #[arg(long)]
        content: String,
    },
    /// Комментарий к посту или ответ на комментарий (`--parent`).
    Reply {
        #[arg(long)]
        post: i64,
        #[arg(long)]
        parent: Option<i64>,
        #[arg(long)]
        content: String,
    },
    /// Рейтинг по карме.
    Leaderboard {
        /// Полный список вместо верха рейтинга.
        #[arg(long)]
        full: bool,
    },
    /// Проверка доступности сервера.
    Health,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Ошибка: {err}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let settings = Settings::from_env()?;
    init_logging(&settings.log_level)?;

    let api_url = cli
        .server
        .map(normalize_server)
        .unwrap_or_else(|| settings.api_url.clone());
    let gateway = HttpGateway::with_timeouts(
        api_url,
        settings.connect_timeout,
        settings.request_timeout,
    )
    .context("не удалось создать HTTP-клиент")?;
    info!(api_url = %gateway.base_url(), "using feed api");
    let session = Session::new(settings.user_name.clone());
    debug!(user = %session.current_user().name, command = ?cli.command, "running command");
    let output = Output { json: cli.json };

    match cli.command {
        Command::Posts => {
            let feed = FeedStore::new(gateway);
            ensure_applied(feed.load_posts().await, "не удалось загрузить ленту")?;
            output.posts(&feed.posts())?;
        }
        Command::Comments { post } => {
            let feed = FeedStore::new(gateway);
            let loaded = load_post_with_comments(&feed, post).await?;
            output.post(&loaded)?;
        }
        Command::LikePost { post } => {
            let feed = FeedStore::new(gateway);
            ensure_applied(feed.load_posts().await, "не удалось загрузить ленту")?;
            let outcome = feed.like_post(post).await;
            report(outcome, "лайк поста");
            ensure_not_failed(outcome, "сервер отклонил лайк поста")?;
            let liked = feed
                .post(post)
                .ok_or_else(|| anyhow!("пост не найден: id={post}"))?;
            output.post(&liked)?;
        }
        Command::LikeComment { post, comment } => {
            let feed = FeedStore::new(gateway);
            load_post_with_comments(&feed, post).await?;
            let outcome = feed.like_comment(post, comment).await;
            report(outcome, "лайк комментария");
            ensure_not_failed(outcome, "сервер отклонил лайк комментария")?;
            let current = feed
                .post(post)
                .ok_or_else(|| anyhow!("пост не найден: id={post}"))?;
            output.post(&current)?;
        }
        Command::Post { content } => {
            let feed = FeedStore::new(gateway);
            let outcome = feed.add_post(&content, session.current_user().clone()).await;
            report(outcome, "публикация поста");
            ensure_not_failed(outcome, "не удалось опубликовать пост")?;
            output.posts(&feed.posts())?;
        }
        Command::Reply {
            post,
            parent,
            content,
        } => {
            let feed = FeedStore::new(gateway);
            load_post_with_comments(&feed, post).await?;
            let outcome = feed
                .add_comment(post, parent, &content, session.current_user().clone())
                .await;
            report(outcome, "комментарий");
            ensure_not_failed(outcome, "не удалось добавить комментарий")?;
            let current = feed
                .post(post)
                .ok_or_else(|| anyhow!("пост не найден: id={post}"))?;
            output.post(&current)?;
        }
        Command::Leaderboard { full } => {
            let board = LeaderboardStore::new(gateway);
            if full {
                ensure_applied(
                    board.load_full_leaderboard().await,
                    "не удалось загрузить полный рейтинг",
                )?;
                output.leaderboard(&board.snapshot().full_entries)?;
            } else {
                ensure_applied(board.load_leaderboard().await, "не удалось загрузить рейтинг")?;
                output.leaderboard(&board.snapshot().entries)?;
            }
        }
        Command::Health => {
            let healthy = gateway.health().await.context("сервер недоступен")?;
            if !healthy {
                return Err(anyhow!("сервер ответил, но статус не ok"));
            }
            println!("Сервер доступен: {}", gateway.base_url());
        }
    }

    Ok(())
}

async fn load_post_with_comments(feed: &FeedStore<HttpGateway>, post_id: i64) -> Result<Post> {
    ensure_applied(feed.load_posts().await, "не удалось загрузить ленту")?;
    feed.post(post_id)
        .ok_or_else(|| anyhow!("пост не найден: id={post_id}"))?;
    ensure_applied(
        feed.load_post_comments(post_id).await,
        "не удалось загрузить комментарии",
    )?;
    feed.post(post_id)
        .ok_or_else(|| anyhow!("пост не найден: id={post_id}"))
}

fn normalize_server(server: String) -> String {
    if server.starts_with("http://") || server.starts_with("https://") {
        return server;
    }

    format!("http://{server}")
}

fn ensure_applied(outcome: SyncOutcome, message: &str) -> Result<()> {
    match outcome {
        SyncOutcome::Applied => Ok(()),
        SyncOutcome::Skipped | SyncOutcome::Failed => Err(anyhow!("{message}")),
    }
}

fn ensure_not_failed(outcome: SyncOutcome, message: &str) -> Result<()> {
    match outcome {
        SyncOutcome::Failed => Err(anyhow!("{message}")),
        SyncOutcome::Applied | SyncOutcome::Skipped => Ok(()),
    }
}

fn report(outcome: SyncOutcome, action: &str) {
    match outcome {
        SyncOutcome::Applied => eprintln!("Готово: {action}"),
        SyncOutcome::Skipped => eprintln!("Пропущено: {action} (уже выполнено или цель не найдена)"),
        SyncOutcome::Failed => eprintln!("Откачено: {action}"),
    }
}

struct Output {
    json: bool,
}

impl Output {
    fn posts(&self, posts: &[Post]) -> Result<()> {
        if self.json {
            return print_json(&posts);
        }
        println!("Постов: {}", posts.len());
        for post in posts {
            println!("{}", post_line(post));
        }
        Ok(())
    }

    fn post(&self, post: &Post) -> Result<()> {
        if self.json {
            return print_json(post);
        }
        println!("{}", post_line(post));
        println!("  {}", post.content);
        for comment in &post.comments {
            print_comment(comment, 1);
        }
        Ok(())
    }

    fn leaderboard(&self, entries: &[LeaderboardEntry]) -> Result<()> {
        if self.json {
            return print_json(&entries);
        }
        for entry in entries {
            println!("{}", leaderboard_line(entry));
        }
        Ok(())
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("не удалось сериализовать вывод")?;
    println!("{rendered}");
    Ok(())
}

fn print_comment(comment: &Comment, depth: usize) {
    println!("{}", comment_line(comment, depth));
    for reply in &comment.replies {
        print_comment(reply, depth + 1);
    }
}

fn like_mark(liked_by_me: bool) -> &'static str {
    if liked_by_me { "♥" } else { "♡" }
}

fn post_line(post: &Post) -> String {
    format!(
        "- [{}] {} · {} · {} {}",
        post.id,
        post.author.name,
        post.timestamp,
        like_mark(post.liked_by_me),
        post.likes
    )
}

fn comment_line(comment: &Comment, depth: usize) -> String {
    format!(
        "{}└ [{}] {}: {} ({} {})",
        "  ".repeat(depth),
        comment.id,
        comment.author.name,
        comment.content,
        like_mark(comment.liked_by_me),
        comment.likes
    )
}

fn leaderboard_line(entry: &LeaderboardEntry) -> String {
    format!(
        "{:>3}. {} — {} karma",
        entry.rank, entry.user.name, entry.user.karma
    )
}
