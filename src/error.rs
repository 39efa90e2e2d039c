use crate::events::NodeId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    /// Нарушение предусловия вызывающей стороной (логическая ошибка оркестрации)
    #[error("Нарушение предусловия: {0}")]
    Precondition(String),

    #[error("Не удалось создать обработчик контрола: {0}")]
    HandlerConstruction(String),

    #[error("Узел {0} удалён из дерева")]
    StaleNode(NodeId),

    #[error("Сервис недоступен: {0}")]
    ServiceUnavailable(String),

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl WatchError {
    pub fn precondition<T>(msg: impl Into<String>) -> Result<T> {
        Err(WatchError::Precondition(msg.into()))
    }
}

pub type Result<T> = std::result::Result<T, WatchError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! watch_error {
    (handler, $($arg:tt)*) => {
        $crate::error::WatchError::HandlerConstruction(format!($($arg)*))
    };
    (service_unavailable, $($arg:tt)*) => {
        $crate::error::WatchError::ServiceUnavailable(format!($($arg)*))
    };
}
