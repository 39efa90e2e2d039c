use crate::debug_if_enabled;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Одноразовый колбэк готовности
pub type ReadyCallback = Box<dyn FnOnce() + Send>;

/// Уведомитель "очередь пуста".
///
/// Колбэк срабатывает, только если очередь оставалась пустой целый тик опроса.
/// Любое новое событие отменяет взведённый тик; следующий взводится после
/// очередного сброса.
pub struct IdleNotifier {
    callbacks: VecDeque<ReadyCallback>,
    poll: Duration,
    deadline: Option<Instant>,
}

impl IdleNotifier {
    pub fn new(poll: Duration) -> Self {
        Self {
            callbacks: VecDeque::new(),
            poll,
            deadline: None,
        }
    }

    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.callbacks.len()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn register(&mut self, callback: ReadyCallback, now: Instant, queue_idle: bool) {
        self.callbacks.push_back(callback);
        if queue_idle && self.deadline.is_none() {
            self.deadline = Some(now + self.poll);
        }
    }

    /// Пришло событие: очередь больше не пуста
    pub fn on_activity(&mut self) {
        if self.deadline.take().is_some() {
            debug_if_enabled!("Тик готовности отменён новым событием");
        }
    }

    /// Поколение полностью обработано
    pub fn on_queue_drained(&mut self, now: Instant) {
        if !self.callbacks.is_empty() {
            self.deadline = Some(now + self.poll);
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| deadline <= now)
    }

    /// Вызвать колбэки по порядку регистрации, проверяя пустоту перед каждым.
    /// Возвращает число вызванных колбэков.
    pub fn fire(&mut self, is_idle: impl Fn() -> bool) -> usize {
        self.deadline = None;
        let mut fired = 0;
        while !self.callbacks.is_empty() && is_idle() {
            if let Some(callback) = self.callbacks.pop_front() {
                callback();
                fired += 1;
            }
        }
        fired
    }

    /// Вызвать все колбэки без ожидания (завершение сессии)
    pub fn drain(&mut self) -> usize {
        self.deadline = None;
        let count = self.callbacks.len();
        for callback in self.callbacks.drain(..) {
            callback();
        }
        count
    }
}

impl std::fmt::Debug for IdleNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdleNotifier")
            .field("callbacks", &self.callbacks.len())
            .field("poll", &self.poll)
            .field("deadline", &self.deadline)
            .finish()
    }
}
