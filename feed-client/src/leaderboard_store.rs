use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{error, info};

use crate::gateway::FeedApi;
use crate::mappers::map_leaderboard;
use crate::models::{LeaderboardEntry, SyncOutcome};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Снимок состояния рейтинга.
pub struct LeaderboardState {
    /// Верх рейтинга.
    pub entries: Vec<LeaderboardEntry>,
    /// Полный рейтинг; места считаются независимо от `entries`.
    pub full_entries: Vec<LeaderboardEntry>,
    /// Показан ли полный список.
    pub full_list_open: bool,
    /// Идёт ли загрузка верха или полного списка.
    pub is_loading: bool,
    loads_in_flight: usize,
}

impl LeaderboardState {
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
/// Кэш рейтинга: только чтение с сервера, без изменений.
pub struct LeaderboardStore<A> {
    api: A,
    state: Arc<RwLock<LeaderboardState>>,
}

impl<A: FeedApi> LeaderboardStore<A> {
    /// Создаёт пустое хранилище.
    pub fn new(api: A) -> Self {
        Self {
            api,
            state: Arc::new(RwLock::new(LeaderboardState::default())),
        }
    }

    /// Копия текущего состояния.
    pub fn snapshot(&self) -> LeaderboardState {
        self.read().clone()
    }

    /// Загружает верх рейтинга. При ошибке прежние данные остаются.
    pub async fn load_leaderboard(&self) -> SyncOutcome {
        self.write().begin_load();
        let result = self.api.leaderboard().await;

        let mut state = self.write();
        state.finish_load();
        match result {
            Ok(items) => {
                state.entries = map_leaderboard(items);
                info!(count = state.entries.len(), "leaderboard loaded");
                SyncOutcome::Applied
            }
            Err(err) => {
                error!(error = %err, "failed to load leaderboard");
                SyncOutcome::Failed
            }
        }
    }

    /// Загружает полный рейтинг и открывает полный список.
    ///
    /// При ошибке полный список не открывается, прежние данные остаются.
    pub async fn load_full_leaderboard(&self) -> SyncOutcome {
        self.write().begin_load();
        let result = self.api.leaderboard_full().await;

        let mut state = self.write();
        state.finish_load();
        match result {
            Ok(items) => {
                state.full_entries = map_leaderboard(items);
                state.full_list_open = true;
                info!(count = state.full_entries.len(), "full leaderboard loaded");
                SyncOutcome::Applied
            }
            Err(err) => {
                error!(error = %err, "failed to load full leaderboard");
                SyncOutcome::Failed
            }
        }
    }

    /// Скрывает полный список; загруженные данные сохраняются.
    pub fn close_full_list(&self) {
        self.write().full_list_open = false;
    }

    fn read(&self) -> RwLockReadGuard<'_, LeaderboardState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LeaderboardState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
