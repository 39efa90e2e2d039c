use crate::config::TimingConfig;
use crate::events::RawEvent;
use crate::services::reducer::last_focus;
use std::time::{Duration, Instant};

/// Состояние планировщика дебаунса
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Таймер не взведён
    Idle,
    /// Ровно один таймер, который однажды вызовет сброс
    Armed { deadline: Instant },
}

/// Решение при срабатывании таймера
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushDecision {
    /// Фокус был совсем недавно, а потолок ещё не достигнут
    Wait { until: Instant },
    Flush,
}

/// Кооперативный планировщик дебаунса с двумя порогами.
///
/// `wait_time` даёт странице успокоиться после каждого фокуса, `max_wait_time`
/// ограничивает задержку от первого необработанного события.
#[derive(Debug)]
pub struct DebounceScheduler {
    state: SchedulerState,
    wait_time: Duration,
    max_wait_time: Duration,
}

impl DebounceScheduler {
    pub fn new(timing: &TimingConfig) -> Self {
        Self {
            state: SchedulerState::Idle,
            wait_time: timing.wait_time(),
            max_wait_time: timing.max_wait_time(),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, SchedulerState::Armed { .. })
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            SchedulerState::Armed { deadline } => Some(deadline),
            SchedulerState::Idle => None,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline().is_some_and(|deadline| deadline <= now)
    }

    /// Idle → Armed. Возвращает `false`, если таймер уже взведён.
    pub fn arm(&mut self, now: Instant) -> bool {
        if self.is_armed() {
            return false;
        }
        self.state = SchedulerState::Armed {
            deadline: now + self.wait_time,
        };
        true
    }

    /// Решить, сбрасывать ли поколение сейчас. При ожидании таймер
    /// перевзводится, старый дедлайн заменяется новым.
    pub fn decide(
        &mut self,
        now: Instant,
        pending: &[RawEvent],
        first_unprocessed: Option<Instant>,
    ) -> FlushDecision {
        let focus_recent = last_focus(pending)
            .is_some_and(|(_, at)| now.saturating_duration_since(at) < self.wait_time);
        let under_ceiling = first_unprocessed
            .is_some_and(|first| now.saturating_duration_since(first) < self.max_wait_time);

        if focus_recent && under_ceiling {
            let until = now + self.wait_time;
            self.state = SchedulerState::Armed { deadline: until };
            FlushDecision::Wait { until }
        } else {
            FlushDecision::Flush
        }
    }

    /// Armed → Idle после сброса
    pub fn finish(&mut self) {
        self.state = SchedulerState::Idle;
    }
}
