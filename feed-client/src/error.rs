use thiserror::Error;

#[derive(Debug, Error)]
/// Ошибки обращения к REST API ленты.
///
/// Для вызывающего кода это единый сигнал неудачи: коды HTTP-статусов наружу
/// не выдаются, используется только текст ошибки.
pub enum GatewayError {
    /// Ошибка HTTP-транспорта (`reqwest`): сеть недоступна, таймаут и т.п.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Сервер ответил неуспешным статусом. Содержит тело ответа
    /// или общее сообщение, если тело пустое.
    #[error("request failed: {0}")]
    Rejected(String),

    /// Успешный ответ не удалось разобрать как JSON ожидаемой формы.
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Результат операций шлюза.
pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    pub(crate) fn rejected(status: reqwest::StatusCode, body: String) -> Self {
        if body.trim().is_empty() {
            return Self::Rejected(format!("request failed with status {}", status.as_u16()));
        }
        Self::Rejected(body)
    }
}
