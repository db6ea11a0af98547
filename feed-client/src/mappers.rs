//! Преобразование серверных форм данных в модели для отображения.

use std::fmt::Display;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

use crate::dto::{ApiComment, ApiLeaderboardItem, ApiPost};
use crate::models::{Comment, EntityId, LeaderboardEntry, Post, RankedUser, UserSummary};

const AVATAR_BASE_URL: &str = "https://api.dicebear.com/9.x/identicon/svg";
const DISPLAY_FORMAT: &str = "%b %-d, %I:%M %p";

/// URL identicon-аватара, детерминированно зависящий от имени.
///
/// Пустое имя заменяется на `user`. Сетевых запросов не делает.
pub fn avatar_for_name(name: &str) -> String {
    let seed = if name.is_empty() { "user" } else { name };
    format!("{AVATAR_BASE_URL}?seed={}", encode_component(seed))
}

/// Пользователь по отображаемому имени; `id` и `karma` неизвестны.
pub fn map_user(name: &str) -> UserSummary {
    UserSummary {
        id: None,
        name: name.to_string(),
        avatar: avatar_for_name(name),
        karma: None,
    }
}

/// Короткая дата и время в локальной зоне, например `Mar 5, 02:07 PM`.
///
/// Если строку не удалось разобрать, она возвращается без изменений.
pub fn format_timestamp(raw: &str) -> String {
    format_timestamp_in(raw, &Local)
}

/// То же, что [`format_timestamp`], но в заданной часовой зоне.
pub fn format_timestamp_in<Tz>(raw: &str, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match parse_timestamp(raw) {
        Some(parsed) => parsed.with_timezone(tz).format(DISPLAY_FORMAT).to_string(),
        None => raw.to_string(),
    }
}

pub(crate) fn now_timestamp() -> String {
    Local::now().format(DISPLAY_FORMAT).to_string()
}

/// Пост из ответа API: комментарии ещё не загружены, лайк не поставлен.
pub fn map_post(post: ApiPost) -> Post {
    Post {
        id: EntityId::Confirmed(post.id),
        author: map_user(&post.author),
        content: post.content,
        timestamp: format_timestamp(&post.created_at),
        likes: post.like_count.unwrap_or(0),
        liked_by_me: false,
        comments: Vec::new(),
        has_loaded_comments: false,
    }
}

/// Комментарий из ответа API вместе со всем поддеревом `children`.
///
/// Сервер не отдаёт лайки комментариев, поэтому каждый узел начинает
/// с `likes = 0` и `liked_by_me = false`.
pub fn map_comment(comment: ApiComment) -> Comment {
    Comment {
        id: EntityId::Confirmed(comment.id),
        author: map_user(&comment.author),
        content: comment.content,
        timestamp: format_timestamp(&comment.created_at),
        likes: 0,
        liked_by_me: false,
        replies: map_comments(comment.children),
    }
}

/// Список узлов верхнего уровня в порядке ответа сервера.
pub fn map_comments(comments: Vec<ApiComment>) -> Vec<Arc<Comment>> {
    comments
        .into_iter()
        .map(|comment| Arc::new(map_comment(comment)))
        .collect()
}

/// Строка рейтинга; место равно `index + 1`.
pub fn map_leaderboard_item(item: ApiLeaderboardItem, index: usize) -> LeaderboardEntry {
    LeaderboardEntry {
        rank: index + 1,
        user: RankedUser {
            id: item.user_id,
            avatar: avatar_for_name(&item.username),
            name: item.username,
            karma: item.total_karma.unwrap_or(0),
        },
    }
}

/// Рейтинг целиком, места назначаются по позиции в этом списке.
pub fn map_leaderboard(items: Vec<ApiLeaderboardItem>) -> Vec<LeaderboardEntry> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| map_leaderboard_item(item, index))
        .collect()
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    // без смещения считаем время UTC
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn encode_component(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char);
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_comment(id: i64, children: Vec<ApiComment>) -> ApiComment {
        ApiComment {
            id,
            author: format!("user{id}"),
            content: format!("comment {id}"),
            created_at: "2024-03-05T14:07:00Z".to_string(),
            children,
        }
    }

    #[test]
    fn avatar_encodes_name_as_uri_component() {
        assert_eq!(
            avatar_for_name("Demo User"),
            "https://api.dicebear.com/9.x/identicon/svg?seed=Demo%20User"
        );
        assert_eq!(
            avatar_for_name("ада&co"),
            "https://api.dicebear.com/9.x/identicon/svg?seed=%D0%B0%D0%B4%D0%B0%26co"
        );
    }

    #[test]
    fn avatar_uses_fallback_seed_for_empty_name() {
        assert!(avatar_for_name("").ends_with("?seed=user"));
        let user = map_user("");
        assert_eq!(user.name, "");
        assert!(user.avatar.ends_with("?seed=user"));
    }

    #[test]
    fn format_timestamp_renders_short_date_time() {
        assert_eq!(
            format_timestamp_in("2024-03-05T14:07:00Z", &Utc),
            "Mar 5, 02:07 PM"
        );
        assert_eq!(
            format_timestamp_in("2024-03-05T14:07:00.123456+02:00", &Utc),
            "Mar 5, 12:07 PM"
        );
    }

    #[test]
    fn format_timestamp_treats_naive_value_as_utc() {
        assert_eq!(
            format_timestamp_in("2024-11-20T09:30:00.5", &Utc),
            "Nov 20, 09:30 AM"
        );
    }

    #[test]
    fn format_timestamp_returns_raw_value_on_parse_failure() {
        assert_eq!(format_timestamp("yesterday"), "yesterday");
        assert_eq!(format_timestamp(""), "");
    }

    #[test]
    fn map_post_keeps_like_count_and_defaults_missing_to_zero() {
        let post = map_post(ApiPost {
            id: 7,
            author: "ada".to_string(),
            content: "hello".to_string(),
            created_at: "2024-03-05T14:07:00Z".to_string(),
            like_count: Some(5),
        });
        assert_eq!(post.id, EntityId::Confirmed(7));
        assert_eq!(post.likes, 5);
        assert!(!post.liked_by_me);
        assert!(!post.has_loaded_comments);
        assert!(post.comments.is_empty());

        let post = map_post(ApiPost {
            id: 8,
            author: "ada".to_string(),
            content: "again".to_string(),
            created_at: "2024-03-05T14:07:00Z".to_string(),
            like_count: None,
        });
        assert_eq!(post.likes, 0);
    }

    #[test]
    fn map_comment_preserves_ids_order_and_depth_with_zero_likes() {
        let tree = api_comment(
            1,
            vec![
                api_comment(2, vec![api_comment(4, vec![])]),
                api_comment(3, vec![]),
            ],
        );

        let mapped = map_comment(tree);
        assert_eq!(mapped.id, EntityId::Confirmed(1));
        assert_eq!(mapped.content, "comment 1");
        let child_ids: Vec<_> = mapped.replies.iter().map(|c| c.id).collect();
        assert_eq!(child_ids, vec![EntityId::Confirmed(2), EntityId::Confirmed(3)]);
        assert_eq!(mapped.replies[0].replies[0].id, EntityId::Confirmed(4));
        assert!(mapped.replies[0].replies[0].replies.is_empty());

        for node in [&mapped, &mapped.replies[0], &mapped.replies[0].replies[0]] {
            assert_eq!(node.likes, 0);
            assert!(!node.liked_by_me);
        }
    }

    #[test]
    fn map_leaderboard_assigns_dense_ranks_by_position() {
        let entries = map_leaderboard(vec![ApiLeaderboardItem {
            user_id: 9,
            username: "ada".to_string(),
            total_karma: Some(500),
        }]);

        assert_eq!(
            entries,
            vec![LeaderboardEntry {
                rank: 1,
                user: RankedUser {
                    id: 9,
                    name: "ada".to_string(),
                    karma: 500,
                    avatar: avatar_for_name("ada"),
                },
            }]
        );
    }

    #[test]
    fn map_leaderboard_item_uses_given_index() {
        let entry = map_leaderboard_item(
            ApiLeaderboardItem {
                user_id: 1,
                username: "bob".to_string(),
                total_karma: None,
            },
            4,
        );
        assert_eq!(entry.rank, 5);
        assert_eq!(entry.user.karma, 0);
    }
}
