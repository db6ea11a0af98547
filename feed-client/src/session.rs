use crate::mappers::avatar_for_name;
use crate::models::UserSummary;

/// Имя пользователя сессии по умолчанию.
pub const DEFAULT_USER_NAME: &str = "Demo User";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Текущий пользователь на всё время сессии; входа и выхода нет.
pub struct Session {
    user: UserSummary,
}

impl Session {
    /// Сессия с заданным отображаемым именем и нулевой кармой.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            user: UserSummary {
                id: None,
                avatar: avatar_for_name(&name),
                name,
                karma: Some(0),
            },
        }
    }

    /// Демо-сессия `Demo User`.
    pub fn demo() -> Self {
        Self::new(DEFAULT_USER_NAME)
    }

    /// Автор для новых постов и комментариев.
    pub fn current_user(&self) -> &UserSummary {
        &self.user
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::demo()
    }
}
