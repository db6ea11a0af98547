use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "id", rename_all = "snake_case")]
/// Идентичность поста или комментария.
///
/// Сущность, созданная локально и ещё не подтверждённая сервером, помечается
/// `Pending` с локальным номером; после подтверждения её заменяет сущность
/// с серверным `Confirmed`-идентификатором.
pub enum EntityId {
    /// Локальная сущность в ожидании ответа сервера.
    Pending(u64),
    /// Идентификатор, выданный сервером.
    Confirmed(i64),
}

impl EntityId {
    /// Серверный идентификатор, если сущность подтверждена.
    pub fn server_id(&self) -> Option<i64> {
        match self {
            Self::Confirmed(id) => Some(*id),
            Self::Pending(_) => None,
        }
    }

    /// `true`, пока сущность не подтверждена сервером.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending(local) => write!(f, "pending#{local}"),
            Self::Confirmed(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Краткое представление пользователя для отображения.
pub struct UserSummary {
    /// Серверный идентификатор пользователя, если известен.
    pub id: Option<i64>,
    /// Отображаемое имя.
    pub name: String,
    /// URL аватара, вычисляемый из имени.
    pub avatar: String,
    /// Карма пользователя, если известна.
    pub karma: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Комментарий и его поддерево ответов.
///
/// Ответы хранятся в порядке поступления (старые первыми). Узлы разделяются
/// через `Arc`: изменение узла пересобирает только путь от него до корня.
pub struct Comment {
    /// Идентичность комментария.
    pub id: EntityId,
    /// Автор.
    pub author: UserSummary,
    /// Текст комментария.
    pub content: String,
    /// Время создания в виде строки для отображения.
    pub timestamp: String,
    /// Число лайков.
    pub likes: u64,
    /// Лайкнул ли текущий пользователь.
    pub liked_by_me: bool,
    /// Вложенные ответы.
    pub replies: Vec<Arc<Comment>>,
}

impl Comment {
    pub(crate) fn pending(local_id: u64, author: UserSummary, content: &str, timestamp: String) -> Self {
        Self {
            id: EntityId::Pending(local_id),
            author,
            content: content.to_string(),
            timestamp,
            likes: 0,
            liked_by_me: false,
            replies: Vec::new(),
        }
    }

    /// Копия узла с другим списком ответов; поддеревья переиспользуются.
    pub(crate) fn with_replies(&self, replies: Vec<Arc<Comment>>) -> Self {
        Self {
            id: self.id,
            author: self.author.clone(),
            content: self.content.clone(),
            timestamp: self.timestamp.clone(),
            likes: self.likes,
            liked_by_me: self.liked_by_me,
            replies,
        }
    }

    pub(crate) fn liked(&self) -> Self {
        let mut node = self.with_replies(self.replies.clone());
        node.likes = node.likes.saturating_add(1);
        node.liked_by_me = true;
        node
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Пост ленты.
pub struct Post {
    /// Идентичность поста.
    pub id: EntityId,
    /// Автор.
    pub author: UserSummary,
    /// Текст поста.
    pub content: String,
    /// Время создания в виде строки для отображения.
    pub timestamp: String,
    /// Число лайков.
    pub likes: u64,
    /// Лайкнул ли текущий пользователь.
    pub liked_by_me: bool,
    /// Дерево комментариев верхнего уровня; заполняется лениво.
    pub comments: Vec<Arc<Comment>>,
    /// Загружено ли дерево комментариев с сервера.
    pub has_loaded_comments: bool,
}

impl Post {
    pub(crate) fn pending(local_id: u64, author: UserSummary, content: &str, timestamp: String) -> Self {
        Self {
            id: EntityId::Pending(local_id),
            author,
            content: content.to_string(),
            timestamp,
            likes: 0,
            liked_by_me: false,
            comments: Vec::new(),
            has_loaded_comments: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Пользователь в рейтинге: идентификатор и карма всегда известны.
pub struct RankedUser {
    /// Серверный идентификатор пользователя.
    pub id: i64,
    /// Отображаемое имя.
    pub name: String,
    /// URL аватара.
    pub avatar: String,
    /// Суммарная карма.
    pub karma: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Строка рейтинга.
pub struct LeaderboardEntry {
    /// Место в списке, начиная с 1; вычисляется из позиции.
    pub rank: usize,
    /// Пользователь.
    pub user: RankedUser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Итог операции хранилища.
///
/// Ошибки шлюза наружу не пробрасываются: к моменту возврата оптимистичное
/// изменение уже подтверждено или откачено.
pub enum SyncOutcome {
    /// Операция дошла до сервера и состояние подтверждено.
    Applied,
    /// Ничего не сделано: цель не найдена, повторный лайк, пустой текст
    /// или загрузка уже выполнена/выполняется.
    Skipped,
    /// Сервер или транспорт вернули ошибку; состояние откачено
    /// или оставлено прежним.
    Failed,
}
