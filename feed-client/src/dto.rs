//! Формы данных REST API в том виде, в каком их отдаёт и принимает сервер.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Пост в ответах `GET /posts/` и `POST /posts/create/`.
pub struct ApiPost {
    /// Идентификатор поста.
    pub id: i64,
    /// Имя автора.
    pub author: String,
    /// Текст.
    pub content: String,
    /// Время создания в ISO 8601.
    pub created_at: String,
    /// Число лайков; может отсутствовать.
    #[serde(default)]
    pub like_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Узел дерева комментариев в ответах API.
pub struct ApiComment {
    /// Идентификатор комментария.
    pub id: i64,
    /// Имя автора.
    pub author: String,
    /// Текст.
    pub content: String,
    /// Время создания в ISO 8601.
    pub created_at: String,
    /// Дочерние комментарии (рекурсивно).
    #[serde(default)]
    pub children: Vec<ApiComment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Строка рейтинга; сервер отдаёт её отсортированной по убыванию кармы.
pub struct ApiLeaderboardItem {
    /// Идентификатор пользователя.
    #[serde(rename = "user__id")]
    pub user_id: i64,
    /// Имя пользователя.
    #[serde(rename = "user__username")]
    pub username: String,
    /// Суммарная карма; `null`, если агрегировать нечего.
    #[serde(default)]
    pub total_karma: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreatePostRequest<'a> {
    pub(crate) content: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateCommentRequest<'a> {
    pub(crate) content: &'a str,
    pub(crate) parent_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: String,
}
