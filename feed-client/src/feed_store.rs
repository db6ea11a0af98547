//! Состояние ленты с оптимистичными изменениями и откатом.
//!
//! Каждая операция видна в два шага: оптимистичное изменение применяется
//! сразу под блокировкой, а подтверждение или откат приходит после ответа
//! сервера. Блокировки никогда не удерживаются через `.await`.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, error, info, warn};

use crate::comment_tree;
use crate::gateway::FeedApi;
use crate::mappers::{map_comment, map_comments, map_post, now_timestamp};
use crate::models::{Comment, EntityId, Post, SyncOutcome, UserSummary};

#[derive(Debug, Clone, Default, PartialEq)]
/// Снимок состояния ленты.
pub struct FeedState {
    /// Посты, новые первыми.
    pub posts: Vec<Post>,
    /// Идёт ли загрузка ленты.
    pub is_loading: bool,
    loads_in_flight: usize,
}

impl FeedState {
    /// Подтверждённый пост по серверному идентификатору.
    pub fn post(&self, post_id: i64) -> Option<&Post> {
        let key = EntityId::Confirmed(post_id);
        self.posts.iter().find(|post| post.id == key)
    }

    fn post_mut(&mut self, id: &EntityId) -> Option<&mut Post> {
        self.posts.iter_mut().find(|post| &post.id == id)
    }

    fn begin_load(&mut self) {
        self.loads_in_flight += 1;
        self.is_loading = true;
    }

    fn finish_load(&mut self) {
        self.loads_in_flight = self.loads_in_flight.saturating_sub(1);
        self.is_loading = self.loads_in_flight > 0;
    }
}

#[derive(Clone)]
/// Хранилище ленты поверх [`FeedApi`].
///
/// Клоны разделяют одно состояние, поэтому операции можно запускать
/// из разных задач.
pub struct FeedStore<A> {
    api: A,
    state: Arc<RwLock<FeedState>>,
    comments_in_flight: Arc<Mutex<HashSet<i64>>>,
    next_local_id: Arc<AtomicU64>,
}

impl<A: FeedApi> FeedStore<A> {
    /// Создаёт пустое хранилище.
    pub fn new(api: A) -> Self {
        Self {
            api,
            state: Arc::new(RwLock::new(FeedState::default())),
            comments_in_flight: Arc::new(Mutex::new(HashSet::new())),
            next_local_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Копия текущего состояния; узлы комментариев разделяются через `Arc`.
    pub fn snapshot(&self) -> FeedState {
        self.read().clone()
    }

    /// Текущий список постов.
    pub fn posts(&self) -> Vec<Post> {
        self.read().posts.clone()
    }

    /// Подтверждённый пост по серверному идентификатору.
    pub fn post(&self, post_id: i64) -> Option<Post> {
        self.read().post(post_id).cloned()
    }

    /// Идёт ли загрузка ленты.
    pub fn is_loading(&self) -> bool {
        self.read().is_loading
    }

    /// Заменяет список постов целиком.
    pub fn set_posts(&self, posts: Vec<Post>) {
        self.write().posts = posts;
    }

    /// Загружает ленту и заменяет ею текущий список.
    ///
    /// При ошибке список остаётся прежним. Флаг загрузки снимается, когда
    /// завершается последняя из одновременных загрузок.
    pub async fn load_posts(&self) -> SyncOutcome {
        self.write().begin_load();
        let result = self.api.list_posts().await;

        let mut state = self.write();
        state.finish_load();
        match result {
            Ok(posts) => {
                state.posts = posts.into_iter().map(map_post).collect();
                info!(count = state.posts.len(), "posts loaded");
                SyncOutcome::Applied
            }
            Err(err) => {
                error!(error = %err, "failed to load posts");
                SyncOutcome::Failed
            }
        }
    }

    /// Загружает дерево комментариев поста один раз.
    ///
    /// Пропускается, если пост не найден, комментарии уже загружены или
    /// загрузка для этого поста уже идёт.
    pub async fn load_post_comments(&self, post_id: i64) -> SyncOutcome {
        let Some(_in_flight) = InFlight::acquire(&self.comments_in_flight, post_id) else {
            debug!(post_id, "comments are already loading");
            return SyncOutcome::Skipped;
        };

        let key = EntityId::Confirmed(post_id);
        match self.read().post(post_id) {
            None => {
                debug!(post_id, "post not found, comments not loaded");
                return SyncOutcome::Skipped;
            }
            Some(post) if post.has_loaded_comments => return SyncOutcome::Skipped,
            Some(_) => {}
        }

        match self.api.list_comments(post_id).await {
            Ok(comments) => {
                let comments = map_comments(comments);
                let count = comments.len();
                if let Some(post) = self.write().post_mut(&key) {
                    post.comments = comments;
                    post.has_loaded_comments = true;
                }
                info!(post_id, count, "comments loaded");
                SyncOutcome::Applied
            }
            Err(err) => {
                error!(post_id, error = %err, "failed to load comments");
                SyncOutcome::Failed
            }
        }
    }

    /// Лайк поста. Повторный лайк ничего не делает: снять лайк нельзя.
    ///
    /// При ошибке восстанавливаются прежнее число лайков и `liked_by_me = false`.
    pub async fn like_post(&self, post_id: i64) -> SyncOutcome {
        let key = EntityId::Confirmed(post_id);
        let previous_likes = {
            let mut state = self.write();
            let Some(post) = state.post_mut(&key) else {
                debug!(post_id, "post not found, like ignored");
                return SyncOutcome::Skipped;
            };
            if post.liked_by_me {
                return SyncOutcome::Skipped;
            }
            let previous = post.likes;
            post.likes = previous.saturating_add(1);
            post.liked_by_me = true;
            previous
        };

        match self.api.like_post(post_id).await {
            Ok(()) => SyncOutcome::Applied,
            Err(err) => {
                if let Some(post) = self.write().post_mut(&key) {
                    post.likes = previous_likes;
                    post.liked_by_me = false;
                }
                warn!(post_id, error = %err, "failed to like post, like reverted");
                SyncOutcome::Failed
            }
        }
    }

    /// Лайк комментария на любой глубине дерева поста.
    ///
    /// Пересобирается только путь от комментария до корня. При ошибке дерево
    /// перезагружается с сервера, а если и это не удалось, у самого
    /// комментария восстанавливаются прежние `likes` и `liked_by_me`.
    /// Остальное дерево не трогается: изменения других операций сохраняются.
    pub async fn like_comment(&self, post_id: i64, comment_id: i64) -> SyncOutcome {
        let key = EntityId::Confirmed(post_id);
        let target = EntityId::Confirmed(comment_id);
        let previous_likes = {
            let mut state = self.write();
            let Some(post) = state.post_mut(&key) else {
                debug!(post_id, "post not found, like ignored");
                return SyncOutcome::Skipped;
            };
            let previous = match comment_tree::find(&post.comments, &target) {
                None => {
                    debug!(post_id, comment_id, "comment not found, like ignored");
                    return SyncOutcome::Skipped;
                }
                Some(comment) if comment.liked_by_me => return SyncOutcome::Skipped,
                Some(comment) => comment.likes,
            };
            let Some(updated) = comment_tree::update(&post.comments, &target, Comment::liked)
            else {
                return SyncOutcome::Skipped;
            };
            post.comments = updated;
            previous
        };

        let err = match self.api.like_comment(comment_id).await {
            Ok(()) => return SyncOutcome::Applied,
            Err(err) => err,
        };
        warn!(post_id, comment_id, error = %err, "failed to like comment, resyncing comments");

        match self.api.list_comments(post_id).await {
            Ok(fresh) => {
                self.replace_comments(&key, map_comments(fresh));
            }
            Err(resync_err) => {
                error!(post_id, error = %resync_err, "failed to resync comments, reverting like");
                let reverted = self.update_comments(&key, |comments| {
                    comment_tree::update(comments, &target, |comment| Comment {
                        likes: previous_likes,
                        liked_by_me: false,
                        ..comment.clone()
                    })
                });
                if !reverted {
                    debug!(post_id, comment_id, "liked comment is gone, nothing to revert");
                }
            }
        }
        SyncOutcome::Failed
    }

    /// Публикует пост: временный пост сразу встаёт в начало ленты и после
    /// ответа сервера заменяется подтверждённым на том же месте.
    ///
    /// При ошибке временный пост удаляется.
    pub async fn add_post(&self, content: &str, author: UserSummary) -> SyncOutcome {
        if content.trim().is_empty() {
            debug!("blank post ignored");
            return SyncOutcome::Skipped;
        }

        let local_id = self.next_local_id();
        let pending = EntityId::Pending(local_id);
        self.write()
            .posts
            .insert(0, Post::pending(local_id, author, content, now_timestamp()));

        match self.api.create_post(content).await {
            Ok(created) => {
                let confirmed = map_post(created);
                let confirmed_id = confirmed.id;
                let mut state = self.write();
                match state.post_mut(&pending) {
                    Some(slot) => *slot = confirmed,
                    None => debug!(%pending, "pending post is gone, confirmation dropped"),
                }
                info!(post_id = %confirmed_id, "post created");
                SyncOutcome::Applied
            }
            Err(err) => {
                self.write().posts.retain(|post| post.id != pending);
                warn!(error = %err, "failed to create post, pending post removed");
                SyncOutcome::Failed
            }
        }
    }

    /// Добавляет комментарий: при `parent_id = None` последним на верхнем
    /// уровне, иначе последним ответом узла `parent_id` на любой глубине.
    ///
    /// После ответа сервера временный узел заменяется подтверждённым на том же
    /// месте, при ошибке удаляется, где бы он ни находился.
    pub async fn add_comment(
        &self,
        post_id: i64,
        parent_id: Option<i64>,
        content: &str,
        author: UserSummary,
    ) -> SyncOutcome {
        if content.trim().is_empty() {
            debug!(post_id, "blank comment ignored");
            return SyncOutcome::Skipped;
        }

        let key = EntityId::Confirmed(post_id);
        let local_id = self.next_local_id();
        let pending = EntityId::Pending(local_id);
        {
            let mut state = self.write();
            let Some(post) = state.post_mut(&key) else {
                debug!(post_id, "post not found, comment ignored");
                return SyncOutcome::Skipped;
            };
            let node = Arc::new(Comment::pending(local_id, author, content, now_timestamp()));
            match parent_id {
                None => post.comments.push(node),
                Some(parent) => {
                    let parent_key = EntityId::Confirmed(parent);
                    match comment_tree::append_reply(&post.comments, &parent_key, node) {
                        Some(updated) => post.comments = updated,
                        None => {
                            debug!(post_id, parent, "parent comment not found, reply ignored");
                            return SyncOutcome::Skipped;
                        }
                    }
                }
            }
        }

        match self.api.create_comment(post_id, content, parent_id).await {
            Ok(created) => {
                let confirmed = map_comment(created);
                let comment_id = confirmed.id;
                let replaced = self.update_comments(&key, |comments| {
                    comment_tree::replace(comments, &pending, confirmed)
                });
                if !replaced {
                    debug!(post_id, %pending, "pending comment is gone, confirmation dropped");
                }
                info!(post_id, comment_id = %comment_id, "comment created");
                SyncOutcome::Applied
            }
            Err(err) => {
                self.update_comments(&key, |comments| comment_tree::remove(comments, &pending));
                warn!(post_id, error = %err, "failed to create comment, pending comment removed");
                SyncOutcome::Failed
            }
        }
    }

    fn next_local_id(&self) -> u64 {
        self.next_local_id.fetch_add(1, Ordering::Relaxed)
    }

    fn replace_comments(&self, key: &EntityId, comments: Vec<Arc<Comment>>) {
        if let Some(post) = self.write().post_mut(key) {
            post.comments = comments;
        }
    }

    fn update_comments<F>(&self, key: &EntityId, f: F) -> bool
    where
        F: FnOnce(&[Arc<Comment>]) -> Option<Vec<Arc<Comment>>>,
    {
        let mut state = self.write();
        let Some(post) = state.post_mut(key) else {
            return false;
        };
        match f(&post.comments) {
            Some(updated) => {
                post.comments = updated;
                true
            }
            None => false,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, FeedState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FeedState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Отметка о загрузке комментариев поста; снимается при drop.
struct InFlight<'a> {
    posts: &'a Mutex<HashSet<i64>>,
    post_id: i64,
}

impl<'a> InFlight<'a> {
    fn acquire(posts: &'a Mutex<HashSet<i64>>, post_id: i64) -> Option<Self> {
        let inserted = posts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(post_id);
        inserted.then_some(Self { posts, post_id })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.posts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.post_id);
    }
}
