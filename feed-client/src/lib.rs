//! Клиентская библиотека ленты: посты, древовидные комментарии, лайки и
//! рейтинг по карме поверх REST API.
//!
//! Хранилища (`FeedStore`, `LeaderboardStore`) держат состояние в памяти и
//! применяют изменения оптимистично: сразу локально, затем подтверждают или
//! откатывают по ответу сервера. Транспорт подключается через трейт
//! [`FeedApi`]; рабочая реализация — [`HttpGateway`] на `reqwest`.
#![warn(missing_docs)]

mod comment_tree;
mod dto;
mod error;
mod feed_store;
mod gateway;
mod leaderboard_store;
mod mappers;
mod models;
mod session;
#[cfg(test)]
mod testing;

pub use dto::{ApiComment, ApiLeaderboardItem, ApiPost};
pub use error::{GatewayError, GatewayResult};
pub use feed_store::{FeedState, FeedStore};
pub use gateway::{DEFAULT_API_URL, FeedApi, HttpGateway};
pub use leaderboard_store::{LeaderboardState, LeaderboardStore};
pub use mappers::{
    avatar_for_name, format_timestamp, format_timestamp_in, map_comment, map_comments,
    map_leaderboard, map_leaderboard_item, map_post, map_user,
};
pub use models::{Comment, EntityId, LeaderboardEntry, Post, RankedUser, SyncOutcome, UserSummary};
pub use session::{DEFAULT_USER_NAME, Session};
