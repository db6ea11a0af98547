use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;

use crate::dto::{
    ApiComment, ApiLeaderboardItem, ApiPost, CreateCommentRequest, CreatePostRequest,
    HealthResponse,
};
use crate::error::{GatewayError, GatewayResult};

/// Корень API по умолчанию.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api";

#[async_trait]
/// Операции REST API, на которые опираются хранилища.
///
/// Хранилища получают реализацию через конструктор, поэтому в тестах её
/// можно подменить.
pub trait FeedApi: Send + Sync {
    /// `GET /posts/`: лента без комментариев, новые первыми.
    async fn list_posts(&self) -> GatewayResult<Vec<ApiPost>>;
    /// `GET /posts/{id}/comments/`: дерево комментариев поста.
    async fn list_comments(&self, post_id: i64) -> GatewayResult<Vec<ApiComment>>;
    /// `POST /posts/{id}/like/`.
    async fn like_post(&self, post_id: i64) -> GatewayResult<()>;
    /// `POST /comments/{id}/like/`.
    async fn like_comment(&self, comment_id: i64) -> GatewayResult<()>;
    /// `POST /posts/create/`.
    async fn create_post(&self, content: &str) -> GatewayResult<ApiPost>;
    /// `POST /posts/{id}/comments/create/`; `parent_id = None` для комментария
    /// верхнего уровня.
    async fn create_comment(
        &self,
        post_id: i64,
        content: &str,
        parent_id: Option<i64>,
    ) -> GatewayResult<ApiComment>;
    /// `GET /leaderboard/`: верх рейтинга.
    async fn leaderboard(&self) -> GatewayResult<Vec<ApiLeaderboardItem>>;
    /// `GET /leaderboard/full/`: рейтинг целиком.
    async fn leaderboard_full(&self) -> GatewayResult<Vec<ApiLeaderboardItem>>;
}

#[derive(Debug, Clone)]
/// HTTP-шлюз к REST API ленты поверх `reqwest`.
pub struct HttpGateway {
    base_url: String,
    client: Client,
}

impl HttpGateway {
    /// Создаёт шлюз с корнем API и таймаутами по умолчанию (5 с на
    /// соединение, 15 с на запрос).
    pub fn new(base_url: impl Into<String>) -> GatewayResult<Self> {
        Self::with_timeouts(base_url, Duration::from_secs(5), Duration::from_secs(15))
    }

    /// Создаёт шлюз с явными таймаутами транспорта.
    pub fn with_timeouts(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> GatewayResult<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    /// Корень API, с которым работает шлюз.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// `GET` по пути относительно корня API с разбором JSON-ответа.
    pub async fn get<T>(&self, path: &str) -> GatewayResult<T>
    where
        T: DeserializeOwned,
    {
        let response = self
            .client
            .request(Method::GET, self.endpoint(path))
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        Self::decode(response).await
    }

    /// `POST` с необязательным JSON-телом и разбором JSON-ответа.
    pub async fn post<T, B>(&self, path: &str, body: Option<&B>) -> GatewayResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        let mut request = self
            .client
            .request(Method::POST, self.endpoint(path))
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        Self::decode(response).await
    }

    /// Проверяет `GET /health/`; `true`, если сервер ответил `{"status":"ok"}`.
    pub async fn health(&self) -> GatewayResult<bool> {
        let health: HealthResponse = self.get("/health/").await?;
        Ok(health.status == "ok")
    }

    async fn decode<T>(response: reqwest::Response) -> GatewayResult<T>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::rejected(status, body));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl FeedApi for HttpGateway {
    async fn list_posts(&self) -> GatewayResult<Vec<ApiPost>> {
        self.get("/posts/").await
    }

    async fn list_comments(&self, post_id: i64) -> GatewayResult<Vec<ApiComment>> {
        self.get(&format!("/posts/{post_id}/comments/")).await
    }

    async fn like_post(&self, post_id: i64) -> GatewayResult<()> {
        self.post::<IgnoredAny, ()>(&format!("/posts/{post_id}/like/"), None)
            .await?;
        Ok(())
    }

    async fn like_comment(&self, comment_id: i64) -> GatewayResult<()> {
        self.post::<IgnoredAny, ()>(&format!("/comments/{comment_id}/like/"), None)
            .await?;
        Ok(())
    }

    async fn create_post(&self, content: &str) -> GatewayResult<ApiPost> {
        let payload = CreatePostRequest { content };
        self.post("/posts/create/", Some(&payload)).await
    }

    async fn create_comment(
        &self,
        post_id: i64,
        content: &str,
        parent_id: Option<i64>,
    ) -> GatewayResult<ApiComment> {
        let payload = CreateCommentRequest { content, parent_id };
        self.post(&format!("/posts/{post_id}/comments/create/"), Some(&payload))
            .await
    }

    async fn leaderboard(&self) -> GatewayResult<Vec<ApiLeaderboardItem>> {
        self.get("/leaderboard/").await
    }

    async fn leaderboard_full(&self) -> GatewayResult<Vec<ApiLeaderboardItem>> {
        self.get("/leaderboard/full/").await
    }
}
