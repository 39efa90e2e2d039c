use crate::events::{EventKind, NodeId, RawEvent};
use std::time::Instant;

/// Буфер сырых событий текущего поколения.
///
/// Поколение: события, накопленные между двумя сбросами. Содержимое
/// заменяется только целиком через [`EventQueue::take_generation`].
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: Vec<RawEvent>,
    first_unprocessed: Option<Instant>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Добавить событие, проставив метку времени. Дедупликации здесь нет.
    pub fn push(&mut self, kind: EventKind, target: Option<NodeId>, now: Instant) {
        // Метки не убывают внутри поколения даже при немонотонном источнике
        let timestamp = match self.pending.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };
        self.pending.push(RawEvent::stamped(kind, target, timestamp));
        if self.first_unprocessed.is_none() {
            self.first_unprocessed = Some(now);
        }
    }

    pub fn pending(&self) -> &[RawEvent] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn first_unprocessed(&self) -> Option<Instant> {
        self.first_unprocessed
    }

    /// Забрать поколение по значению; новые события попадут в свежее поколение
    pub fn take_generation(&mut self) -> Vec<RawEvent> {
        self.first_unprocessed = None;
        std::mem::take(&mut self.pending)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.first_unprocessed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_push_tracks_generation_times() {
        let t0 = Instant::now();
        let mut queue = EventQueue::new();

        queue.push(EventKind::Focus, Some(NodeId(1)), t0);
        queue.push(EventKind::Click, Some(NodeId(1)), t0 + Duration::from_millis(3));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.first_unprocessed(), Some(t0));
    }

    #[test]
    fn test_take_generation_starts_fresh() {
        let t0 = Instant::now();
        let mut queue = EventQueue::new();
        queue.push(EventKind::Focus, Some(NodeId(1)), t0);

        let generation = queue.take_generation();
        assert_eq!(generation.len(), 1);
        assert!(queue.is_empty());
        assert_eq!(queue.first_unprocessed(), None);

        let t1 = t0 + Duration::from_millis(20);
        queue.push(EventKind::Blur, Some(NodeId(1)), t1);
        assert_eq!(queue.first_unprocessed(), Some(t1));
    }

    #[test]
    fn test_timestamps_never_decrease() {
        let t0 = Instant::now();
        let mut queue = EventQueue::new();
        queue.push(EventKind::Focus, None, t0 + Duration::from_millis(5));
        queue.push(EventKind::Blur, None, t0);

        let pending = queue.pending();
        assert!(pending[1].timestamp >= pending[0].timestamp);
    }
}
