use std::time::Instant;

/// Источник монотонного времени для очереди и планировщика.
///
/// Ядро никогда не вызывает `Instant::now()` напрямую: тесты подставляют
/// ручные часы и двигают виртуальное время детерминированно.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Часы tokio: при `tokio::time::pause()` время замораживается вместе с рантаймом
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}
