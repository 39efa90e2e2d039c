use serde::{Deserialize, Serialize};

/// Режим очереди речи
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueMode {
    /// Сбросить всю ожидающую речь и говорить сразу
    Flush,
    /// Сбросить только речь той же категории
    CategoryFlush,
    /// Поставить в конец очереди
    Queue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechStyle {
    /// Срочное объявление (assertive live-регион)
    Assertive,
    /// Фоновое объявление (polite live-регион)
    Polite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Earcon {
    DialogEnter,
    DialogExit,
}

/// Политика выбора режима очереди.
///
/// Первое высказывание после явного действия пользователя сбрасывает очередь,
/// последующие в рамках той же пачки используют `CategoryFlush`. Флаг
/// сбрасывается при каждом чтении.
#[derive(Debug, Default)]
pub struct QueueModePolicy {
    flush_next: bool,
    force_queue: bool,
}

impl QueueModePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Отметить явное действие пользователя
    pub fn user_action(&mut self) {
        self.flush_next = true;
    }

    /// Следующее высказывание обязано встать в очередь без сброса
    pub fn force_queue(&mut self) {
        self.force_queue = true;
    }

    pub fn peek_flush(&self) -> bool {
        self.flush_next && !self.force_queue
    }

    pub fn take(&mut self) -> QueueMode {
        let mode = if self.force_queue {
            QueueMode::Queue
        } else if self.flush_next {
            QueueMode::Flush
        } else {
            QueueMode::CategoryFlush
        };
        self.flush_next = false;
        self.force_queue = false;
        mode
    }

    pub fn reset(&mut self) {
        self.flush_next = false;
        self.force_queue = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_only_once_per_user_action() {
        let mut policy = QueueModePolicy::new();
        assert_eq!(policy.take(), QueueMode::CategoryFlush);

        policy.user_action();
        assert!(policy.peek_flush());
        assert_eq!(policy.take(), QueueMode::Flush);
        assert_eq!(policy.take(), QueueMode::CategoryFlush);
    }

    #[test]
    fn test_forced_queue_wins_over_flush() {
        let mut policy = QueueModePolicy::new();
        policy.user_action();
        policy.force_queue();
        assert!(!policy.peek_flush());
        assert_eq!(policy.take(), QueueMode::Queue);
        assert_eq!(policy.take(), QueueMode::CategoryFlush);
    }
}
