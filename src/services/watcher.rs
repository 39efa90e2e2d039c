use crate::config::Config;
use crate::debug_if_enabled;
use crate::error::{Result, WatchError};
use crate::events::{ChangeSource, DocumentHandle, EventKind, NodeId, QueueModePolicy};
use crate::services::collaborators::Collaborators;
use crate::services::control::{ActiveControl, ControlSignal, ControlState};
use crate::services::dialog::DialogTracker;
use crate::services::dispatcher::{DispatchReport, Dispatcher};
use crate::services::event_queue::EventQueue;
use crate::services::idle_notifier::{IdleNotifier, ReadyCallback};
use crate::services::reducer::reduce;
use crate::services::scheduler::{DebounceScheduler, FlushDecision};
use crate::utils::Clock;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Снимок состояния наблюдателя для логов и тестов
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherStats {
    pub session: Option<DocumentHandle>,
    pub active: bool,
    pub pending: usize,
    pub flushes: u64,
    pub control: ControlState,
    pub last_report: Option<DispatchReport>,
}

/// Наблюдатель событий одного документа.
///
/// Владеет всем изменяемым состоянием (очередь, планировщик, слот контрола,
/// уведомитель готовности) и коллабораторами. Все операции вызываются с
/// одного логического потока, поэтому блокировок внутри нет.
pub struct Watcher {
    clock: Arc<dyn Clock>,
    collaborators: Collaborators,
    queue: EventQueue,
    scheduler: DebounceScheduler,
    idle: IdleNotifier,
    control: ActiveControl,
    dialog: DialogTracker,
    queue_mode: QueueModePolicy,
    max_live_regions: usize,
    session: Option<DocumentHandle>,
    active: bool,
    flushes: u64,
    last_report: Option<DispatchReport>,
}

impl Watcher {
    pub fn new(config: &Config, clock: Arc<dyn Clock>, collaborators: Collaborators) -> Self {
        info!(
            "Инициализация Watcher (wait: {}мс, max_wait: {}мс, idle_poll: {}мс)",
            config.timing.wait_time_ms, config.timing.max_wait_time_ms, config.timing.idle_poll_ms
        );

        Self {
            clock,
            collaborators,
            queue: EventQueue::new(),
            scheduler: DebounceScheduler::new(&config.timing),
            idle: IdleNotifier::new(config.timing.idle_poll()),
            control: ActiveControl::new(),
            dialog: DialogTracker::new(),
            queue_mode: QueueModePolicy::new(),
            max_live_regions: config.live_regions.max_per_flush,
            session: None,
            active: config.session.start_active,
            flushes: 0,
            last_report: None,
        }
    }

    /// Подключиться к документу, сбросив состояние очереди
    pub fn init(&mut self, document: DocumentHandle) {
        if let Some(previous) = self.session.replace(document) {
            debug!("Сессия {} заменяется на {}", previous, document);
        }
        self.reset_session_state();
        info!("Watcher подключён к {}", document);
    }

    /// Отключиться от документа. Повторный вызов безопасен.
    pub fn cleanup(&mut self, document: DocumentHandle) {
        match self.session {
            Some(current) if current == document => {}
            Some(current) => {
                debug!("cleanup({}) проигнорирован: активна сессия {}", document, current);
                return;
            }
            None => {
                debug_if_enabled!("cleanup({}) без активной сессии", document);
            }
        }

        self.session = None;
        self.reset_session_state();
        let released = self.idle.drain();
        if released > 0 {
            debug!("При завершении сессии вызвано {} колбэков готовности", released);
        }
        info!("Watcher отключён от {}", document);
    }

    fn reset_session_state(&mut self) {
        self.control.release();
        self.dialog.reset();
        self.queue.clear();
        self.scheduler.finish();
        self.queue_mode.reset();
    }

    pub fn session(&self) -> Option<DocumentHandle> {
        self.session
    }

    /// Включить или выключить обработку. Переключение в текущее состояние
    /// считается ошибкой вызывающей стороны.
    pub fn set_active(&mut self, active: bool) -> Result<()> {
        if self.active == active {
            return WatchError::precondition(format!(
                "наблюдатель уже {}",
                if active { "активен" } else { "неактивен" }
            ));
        }
        self.active = active;
        if !active {
            self.control.release();
        }
        info!("Watcher {}", if active { "включён" } else { "выключен" });
        Ok(())
    }

    /// Принять событие от документа.
    ///
    /// Без активной сессии, при выключенном наблюдателе или без фокуса у
    /// документа событие отбрасывается; фокус при этом всё равно уходит в
    /// кольцо фокуса. Возвращает `true`, если событие поставлено в очередь.
    pub fn push(&mut self, kind: EventKind, target: Option<NodeId>) -> bool {
        let accepting = self.session.is_some()
            && self.active
            && self.collaborators.tree.has_document_focus();

        if !accepting {
            if let (EventKind::Focus, Some(node)) = (&kind, target) {
                self.collaborators.navigator.show_focus_ring(node);
            }
            debug_if_enabled!("Событие {:?} отброшено: обработка неактивна", kind.event_type());
            return false;
        }

        let now = self.clock.now();
        self.queue.push(kind, target, now);
        self.idle.on_activity();
        if self.scheduler.arm(now) {
            debug_if_enabled!("Новое поколение, таймер до {:?}", self.scheduler.deadline());
        }
        true
    }

    /// Сигнал от слушателя input/click активного текстового контрола
    pub fn control_input(&mut self, node: NodeId, signal: ControlSignal) -> bool {
        if !self.control.listens(node, signal) {
            debug_if_enabled!("{:?} от {} без подключённого слушателя", signal, node);
            return false;
        }
        self.push(EventKind::Change(ChangeSource::Input), Some(node))
    }

    /// Мутация поддерева. Учитывается, только если её видит наблюдатель активного контрола.
    pub fn subtree_mutation(&mut self, node: NodeId) -> bool {
        match self.control.observes(node, &*self.collaborators.tree) {
            Some(control) => self.push(EventKind::Change(ChangeSource::Mutation), Some(control)),
            None => false,
        }
    }

    /// Зарегистрировать одноразовый колбэк "очередь пуста"
    pub fn when_ready(&mut self, callback: ReadyCallback) {
        let now = self.clock.now();
        let idle = self.is_idle();
        self.idle.register(callback, now, idle);
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && !self.scheduler.is_armed()
    }

    /// Ближайший момент, когда нужно вызвать [`Watcher::on_timer`]
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.scheduler.deadline(), self.idle.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Хотя бы один таймер уже наступил
    pub fn is_due(&self) -> bool {
        self.next_deadline()
            .is_some_and(|deadline| deadline <= self.clock.now())
    }

    /// Обработать все наступившие таймеры
    pub fn on_timer(&mut self) {
        let now = self.clock.now();
        if self.scheduler.is_due(now) {
            self.try_flush(now);
        }
        if self.idle.is_due(now) {
            let queue = &self.queue;
            let scheduler = &self.scheduler;
            let fired = self
                .idle
                .fire(|| queue.is_empty() && !scheduler.is_armed());
            if fired > 0 {
                debug!("Вызвано {} колбэков готовности", fired);
            }
        }
    }

    fn try_flush(&mut self, now: Instant) {
        let decision = self
            .scheduler
            .decide(now, self.queue.pending(), self.queue.first_unprocessed());
        if let FlushDecision::Wait { until } = decision {
            debug_if_enabled!("Фокус ещё не успокоился, ждём до {:?}", until);
            return;
        }

        // Снимок по значению: события, пришедшие во время сброса, уходят в новое поколение
        let generation = self.queue.take_generation();
        self.scheduler.finish();

        if !generation.is_empty() {
            let received = generation.len();
            let batch = reduce(generation);
            debug_if_enabled!("Сброс: {} событий, после редукции {}", received, batch.len());

            let mut dispatcher = Dispatcher {
                collaborators: &mut self.collaborators,
                control: &mut self.control,
                dialog: &mut self.dialog,
                queue_mode: &mut self.queue_mode,
                max_live_regions: self.max_live_regions,
            };
            let report = dispatcher.dispatch(batch);
            self.flushes += 1;
            self.last_report = Some(report);
        }

        if self.is_idle() {
            self.idle.on_queue_drained(now);
        }
    }

    pub fn stats(&self) -> WatcherStats {
        WatcherStats {
            session: self.session,
            active: self.active,
            pending: self.queue.len(),
            flushes: self.flushes,
            control: self.control.state(),
            last_report: self.last_report.clone(),
        }
    }

    #[cfg(test)]
    pub fn control_state(&self) -> ControlState {
        self.control.state()
    }

    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    #[cfg(test)]
    pub fn flushes(&self) -> u64 {
        self.flushes
    }

    /// Отчёт последнего непустого сброса
    #[cfg(test)]
    pub fn last_report(&self) -> Option<&DispatchReport> {
        self.last_report.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Description, EventType, KeyInfo, QueueMode};
    use crate::services::collaborators::{InMemoryTree, NodeSpec};
    use crate::services::testing::{collaborators, run_until, ManualClock, Recorders};
    use parking_lot::Mutex;
    use std::time::Duration;

    const DOC: DocumentHandle = DocumentHandle(1);

    struct Harness {
        clock: ManualClock,
        start: Instant,
        tree: InMemoryTree,
        recorders: Recorders,
        watcher: Watcher,
    }

    impl Harness {
        fn new() -> Self {
            let tree = InMemoryTree::from_specs([
                NodeSpec::new(1, "body"),
                NodeSpec::new(2, "button").child_of(1).attr("aria-label", "A"),
                NodeSpec::new(3, "input").child_of(1).attr("aria-label", "First"),
                NodeSpec::new(4, "input").child_of(1).attr("aria-label", "Second"),
                NodeSpec::new(5, "div").child_of(1).attr("contenteditable", "true"),
                NodeSpec::new(6, "p").child_of(5),
            ]);
            let clock = ManualClock::new();
            let (collaborators, recorders) = collaborators(tree.clone());
            let mut watcher = Watcher::new(&Config::default(), Arc::new(clock.clone()), collaborators);
            watcher.init(DOC);
            Self {
                start: clock.now(),
                clock,
                tree,
                recorders,
                watcher,
            }
        }

        fn at(&self, ms: u64) -> Instant {
            self.start + Duration::from_millis(ms)
        }

        fn run_until(&mut self, ms: u64) {
            let target = self.at(ms);
            run_until(&mut self.watcher, &self.clock, target);
        }

        fn push_at(&mut self, ms: u64, kind: EventKind, node: u64) {
            self.run_until(ms);
            self.watcher.push(kind, Some(NodeId(node)));
        }

        fn focus_at(&mut self, ms: u64, node: u64) {
            self.run_until(ms);
            self.tree.set_focus(Some(NodeId(node)));
            self.watcher.push(EventKind::Focus, Some(NodeId(node)));
        }
    }

    fn flag() -> (Arc<Mutex<bool>>, ReadyCallback) {
        let fired = Arc::new(Mutex::new(false));
        let sink = fired.clone();
        (fired, Box::new(move || *sink.lock() = true))
    }

    #[test]
    fn test_single_focus_flushes_after_wait_time() {
        let mut h = Harness::new();
        h.focus_at(0, 2);

        h.run_until(9);
        assert!(h.recorders.renderer.spoken().is_empty());

        h.run_until(10);
        assert_eq!(
            h.recorders.renderer.spoken(),
            vec![("A, button".to_string(), QueueMode::Flush)]
        );
        assert_eq!(h.watcher.flushes(), 1);
        assert!(h.watcher.is_idle());
    }

    #[test]
    fn test_is_due_tracks_nearest_deadline() {
        let mut h = Harness::new();
        assert!(!h.watcher.is_due());

        h.focus_at(0, 2);
        h.clock.set(h.at(9));
        assert!(!h.watcher.is_due());
        h.clock.set(h.at(10));
        assert!(h.watcher.is_due());

        h.watcher.on_timer();
        assert!(!h.watcher.is_due());
    }

    #[test]
    fn test_focus_storm_flushes_at_ceiling() {
        let mut h = Harness::new();
        for i in 0..=12 {
            let ms = i * 5;
            if ms >= 50 {
                break;
            }
            h.focus_at(ms, if i % 2 == 0 { 3 } else { 2 });
        }

        h.run_until(49);
        assert_eq!(h.watcher.flushes(), 0);

        h.run_until(50);
        assert_eq!(h.watcher.flushes(), 1);
        // Описан только последний фокус (узел 2 на 45мс)
        assert_eq!(h.recorders.renderer.spoken(), vec![("A, button".to_string(), QueueMode::Flush)]);
    }

    #[test]
    fn test_continued_storm_past_ceiling_starts_new_generation() {
        let mut h = Harness::new();
        for ms in (0..=60).step_by(5) {
            h.focus_at(ms, 2);
        }
        h.run_until(60);
        assert_eq!(h.watcher.flushes(), 1);
        assert!(h.watcher.pending() > 0);
    }

    #[test]
    fn test_dispatch_order_focus_keydown_change() {
        let mut h = Harness::new();
        h.focus_at(0, 3);
        h.push_at(2, EventKind::KeyDown(KeyInfo::new("a")), 3);
        h.push_at(4, EventKind::Change(ChangeSource::Document), 3);
        h.run_until(20);

        assert_eq!(
            h.watcher.last_report().map(|r| r.dispatched.clone()),
            Some(vec![EventType::Focus, EventType::KeyDown, EventType::Change])
        );
    }

    #[test]
    fn test_live_region_dispatched_after_focus() {
        let mut h = Harness::new();
        h.focus_at(0, 2);
        h.push_at(
            1,
            EventKind::LiveRegion {
                assertive: true,
                descriptions: vec![Description::new("Saved")],
            },
            1,
        );
        h.run_until(20);

        assert_eq!(
            h.watcher.last_report().map(|r| r.dispatched.clone()),
            Some(vec![EventType::Focus, EventType::LiveRegion])
        );
    }

    #[test]
    fn test_switching_inputs_keeps_single_handler() {
        let mut h = Harness::new();
        h.focus_at(0, 3);
        h.run_until(20);
        h.focus_at(20, 4);
        h.run_until(40);

        let log = h.recorders.factory.log();
        assert_eq!(log.torn_down, vec![NodeId(3)]);
        assert_eq!(log.created.len(), 2);
        assert_eq!(log.max_live, 1);
        assert_eq!(h.watcher.control_state(), ControlState::TextControl);
    }

    #[test]
    fn test_idle_callback_waits_for_quiet_poll() {
        let mut h = Harness::new();
        let (fired, callback) = flag();
        h.watcher.when_ready(callback);

        // Событие внутри тика опроса отменяет срабатывание
        h.push_at(2, EventKind::Click, 2);
        h.run_until(11);
        assert!(!*fired.lock());

        // Сброс на 12мс, затем ещё целый тик тишины
        h.run_until(16);
        assert!(!*fired.lock());
        h.run_until(17);
        assert!(*fired.lock());
    }

    #[test]
    fn test_idle_callback_on_empty_queue() {
        let mut h = Harness::new();
        let (fired, callback) = flag();
        h.watcher.when_ready(callback);

        h.run_until(4);
        assert!(!*fired.lock());
        h.run_until(5);
        assert!(*fired.lock());
    }

    #[test]
    fn test_inactive_watcher_drops_events_but_moves_focus_ring() {
        let mut h = Harness::new();
        h.watcher.set_active(false).unwrap();

        assert!(!h.watcher.push(EventKind::Focus, Some(NodeId(2))));
        assert!(!h.watcher.push(EventKind::Click, Some(NodeId(2))));
        assert_eq!(h.watcher.pending(), 0);
        assert_eq!(h.recorders.navigator.focus_ring(), vec![NodeId(2)]);

        h.tree.set_document_focus(false);
        h.watcher.set_active(true).unwrap();
        assert!(!h.watcher.push(EventKind::Focus, Some(NodeId(3))));
        assert_eq!(h.recorders.navigator.focus_ring(), vec![NodeId(2), NodeId(3)]);
    }

    #[test]
    fn test_set_active_to_current_value_is_precondition_error() {
        let mut h = Harness::new();
        assert!(matches!(h.watcher.set_active(true), Err(WatchError::Precondition(_))));
        h.watcher.set_active(false).unwrap();
        assert!(matches!(h.watcher.set_active(false), Err(WatchError::Precondition(_))));
    }

    #[test]
    fn test_control_signals_require_attached_listener() {
        let mut h = Harness::new();
        assert!(!h.watcher.control_input(NodeId(3), ControlSignal::Input));

        h.focus_at(0, 3);
        h.run_until(20);
        assert!(h.watcher.control_input(NodeId(3), ControlSignal::Input));
        assert!(h.watcher.control_input(NodeId(3), ControlSignal::Click));
        assert!(!h.watcher.control_input(NodeId(4), ControlSignal::Input));
        assert_eq!(h.watcher.pending(), 2);
    }

    #[test]
    fn test_subtree_mutation_routes_through_queue() {
        let mut h = Harness::new();
        assert!(!h.watcher.subtree_mutation(NodeId(6)));

        h.focus_at(0, 5);
        h.run_until(20);
        h.recorders.factory.set_update_result(true);
        assert!(h.watcher.subtree_mutation(NodeId(6)));
        h.run_until(40);

        let log = h.recorders.factory.log();
        assert_eq!(log.updates.last(), Some(&(NodeId(5), false)));
        assert_eq!(
            h.watcher.last_report().map(|r| r.dispatched.clone()),
            Some(vec![EventType::Change])
        );
    }

    #[test]
    fn test_cleanup_is_repeatable_and_releases_everything() {
        let mut h = Harness::new();
        h.focus_at(0, 3);
        h.run_until(20);
        h.push_at(21, EventKind::Click, 2);
        let (fired, callback) = flag();
        h.watcher.when_ready(callback);

        h.watcher.cleanup(DOC);
        h.watcher.cleanup(DOC);

        assert!(*fired.lock());
        assert_eq!(h.watcher.session(), None);
        assert_eq!(h.watcher.pending(), 0);
        assert_eq!(h.watcher.next_deadline(), None);
        assert_eq!(h.watcher.control_state(), ControlState::NoControl);
        assert_eq!(h.recorders.factory.log().torn_down, vec![NodeId(3)]);
        assert!(!h.watcher.push(EventKind::Click, Some(NodeId(2))));
    }

    #[test]
    fn test_cleanup_of_foreign_document_is_ignored() {
        let mut h = Harness::new();
        h.watcher.cleanup(DocumentHandle(99));
        assert_eq!(h.watcher.session(), Some(DOC));
    }
}
