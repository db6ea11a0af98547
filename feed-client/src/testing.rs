use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::dto::{ApiComment, ApiLeaderboardItem, ApiPost};
use crate::error::{GatewayError, GatewayResult};
use crate::gateway::FeedApi;

pub(crate) const CREATED_AT: &str = "2024-03-05T14:07:00Z";

#[derive(Clone, Default)]
pub(crate) struct FakeFeedApi {
    pub(crate) posts: Arc<Mutex<Vec<ApiPost>>>,
    pub(crate) comments: Arc<Mutex<HashMap<i64, Vec<ApiComment>>>>,
    pub(crate) leaderboard: Arc<Mutex<Vec<ApiLeaderboardItem>>>,
    pub(crate) leaderboard_full: Arc<Mutex<Vec<ApiLeaderboardItem>>>,
    pub(crate) created_comment_children: Arc<Mutex<Vec<ApiComment>>>,
    failing: Arc<Mutex<HashSet<&'static str>>>,
    calls: Arc<Mutex<Vec<String>>>,
    gate: Option<Arc<Notify>>,
}

impl FakeFeedApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Каждый вызов ждёт `notify_one` перед ответом.
    pub(crate) fn gated() -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let api = Self {
            gate: Some(gate.clone()),
            ..Self::default()
        };
        (api, gate)
    }

    pub(crate) fn fail(&self, op: &'static str) {
        self.failing.lock().expect("failing mutex poisoned").insert(op);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    pub(crate) fn call_count(&self, op: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.split('(').next() == Some(op))
            .count()
    }

    async fn enter(&self, op: &'static str, args: String) -> GatewayResult<()> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push(format!("{op}({args})"));

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let failing = self
            .failing
            .lock()
            .expect("failing mutex poisoned")
            .contains(op);
        if failing {
            return Err(GatewayError::Rejected(format!("{op} failed")));
        }
        Ok(())
    }
}

#[async_trait]
impl FeedApi for FakeFeedApi {
    async fn list_posts(&self) -> GatewayResult<Vec<ApiPost>> {
        self.enter("list_posts", String::new()).await?;
        Ok(self.posts.lock().expect("posts mutex poisoned").clone())
    }

    async fn list_comments(&self, post_id: i64) -> GatewayResult<Vec<ApiComment>> {
        self.enter("list_comments", post_id.to_string()).await?;
        Ok(self
            .comments
            .lock()
            .expect("comments mutex poisoned")
            .get(&post_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn like_post(&self, post_id: i64) -> GatewayResult<()> {
        self.enter("like_post", post_id.to_string()).await
    }

    async fn like_comment(&self, comment_id: i64) -> GatewayResult<()> {
        self.enter("like_comment", comment_id.to_string()).await
    }

    async fn create_post(&self, content: &str) -> GatewayResult<ApiPost> {
        self.enter("create_post", content.to_string()).await?;
        Ok(ApiPost {
            id: 100,
            author: "Demo User".to_string(),
            content: content.to_string(),
            created_at: CREATED_AT.to_string(),
            like_count: Some(0),
        })
    }

    async fn create_comment(
        &self,
        post_id: i64,
        content: &str,
        parent_id: Option<i64>,
    ) -> GatewayResult<ApiComment> {
        self.enter("create_comment", format!("{post_id},{parent_id:?},{content}"))
            .await?;
        Ok(ApiComment {
            id: 200,
            author: "Demo User".to_string(),
            content: content.to_string(),
            created_at: CREATED_AT.to_string(),
            children: self
                .created_comment_children
                .lock()
                .expect("created_comment_children mutex poisoned")
                .clone(),
        })
    }

    async fn leaderboard(&self) -> GatewayResult<Vec<ApiLeaderboardItem>> {
        self.enter("leaderboard", String::new()).await?;
        Ok(self.leaderboard.lock().expect("leaderboard mutex poisoned").clone())
    }

    async fn leaderboard_full(&self) -> GatewayResult<Vec<ApiLeaderboardItem>> {
        self.enter("leaderboard_full", String::new()).await?;
        Ok(self
            .leaderboard_full
            .lock()
            .expect("leaderboard_full mutex poisoned")
            .clone())
    }
}

pub(crate) fn api_post(id: i64, like_count: u64) -> ApiPost {
    ApiPost {
        id,
        author: format!("author{id}"),
        content: format!("post {id}"),
        created_at: CREATED_AT.to_string(),
        like_count: Some(like_count),
    }
}

pub(crate) fn api_comment(id: i64, children: Vec<ApiComment>) -> ApiComment {
    ApiComment {
        id,
        author: format!("author{id}"),
        content: format!("comment {id}"),
        created_at: CREATED_AT.to_string(),
        children,
    }
}

pub(crate) fn api_leader(user_id: i64, username: &str, karma: i64) -> ApiLeaderboardItem {
    ApiLeaderboardItem {
        user_id,
        username: username.to_string(),
        total_karma: Some(karma),
    }
}

/// Отдаёт управление рантайму, пока условие не выполнится.
pub(crate) async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition was not reached");
}
