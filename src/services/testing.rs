//! Общие тестовые заглушки: ручные часы и записывающие коллабораторы

use crate::error::Result;
use crate::events::{Earcon, NodeId, QueueMode, SpeechStyle};
use crate::services::collaborators::{
    AccessibilityTree, Collaborators, InMemoryTree, Navigator, OutputRenderer,
};
use crate::services::control::{ControlHandler, ControlHandlerFactory, ControlKind, HandlerIo};
use crate::services::watcher::Watcher;
use crate::utils::Clock;
use crate::watch_error;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Часы, которые двигает только тест
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn set(&self, at: Instant) {
        *self.now.lock() = at;
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Speak {
        text: String,
        mode: QueueMode,
        style: Option<SpeechStyle>,
    },
    Braille(String),
    Earcon(Earcon),
}

#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    outputs: Arc<Mutex<Vec<Output>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outputs(&self) -> Vec<Output> {
        self.outputs.lock().clone()
    }

    pub fn spoken(&self) -> Vec<(String, QueueMode)> {
        self.outputs
            .lock()
            .iter()
            .filter_map(|output| match output {
                Output::Speak { text, mode, .. } => Some((text.clone(), *mode)),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.outputs.lock().clear();
    }
}

impl OutputRenderer for RecordingRenderer {
    fn speak(&mut self, text: &str, mode: QueueMode, style: Option<SpeechStyle>) {
        self.outputs.lock().push(Output::Speak {
            text: text.to_string(),
            mode,
            style,
        });
    }

    fn write_braille(&mut self, text: &str) {
        self.outputs.lock().push(Output::Braille(text.to_string()));
    }

    fn play_earcon(&mut self, earcon: Earcon) {
        self.outputs.lock().push(Output::Earcon(earcon));
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    synced: Arc<Mutex<Vec<NodeId>>>,
    focus_ring: Arc<Mutex<Vec<NodeId>>>,
}

impl RecordingNavigator {
    pub fn synced(&self) -> Vec<NodeId> {
        self.synced.lock().clone()
    }

    pub fn focus_ring(&self) -> Vec<NodeId> {
        self.focus_ring.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn sync_to(&mut self, node: NodeId) {
        self.synced.lock().push(node);
    }

    fn show_focus_ring(&mut self, node: NodeId) {
        self.focus_ring.lock().push(node);
    }
}

/// Журнал фабрики: кто создан, кто разобран, сколько живых одновременно
#[derive(Debug, Clone, Default)]
pub struct FactoryLog {
    pub created: Vec<(ControlKind, NodeId)>,
    pub torn_down: Vec<NodeId>,
    pub updates: Vec<(NodeId, bool)>,
    pub live: usize,
    pub max_live: usize,
    pub fail: bool,
    pub update_result: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingFactory {
    log: Arc<Mutex<FactoryLog>>,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> FactoryLog {
        self.log.lock().clone()
    }

    pub fn fail_creation(&self, fail: bool) {
        self.log.lock().fail = fail;
    }

    pub fn set_update_result(&self, result: bool) {
        self.log.lock().update_result = result;
    }
}

impl ControlHandlerFactory for RecordingFactory {
    fn create(
        &mut self,
        kind: ControlKind,
        node: NodeId,
        _tree: &dyn AccessibilityTree,
    ) -> Result<Box<dyn ControlHandler>> {
        let mut log = self.log.lock();
        if log.fail {
            return Err(watch_error!(handler, "отказ фабрики для {}", node));
        }
        log.created.push((kind, node));
        log.live += 1;
        log.max_live = log.max_live.max(log.live);
        Ok(Box::new(RecordingHandler {
            node,
            log: self.log.clone(),
            torn_down: false,
        }))
    }
}

struct RecordingHandler {
    node: NodeId,
    log: Arc<Mutex<FactoryLog>>,
    torn_down: bool,
}

impl ControlHandler for RecordingHandler {
    fn update(&mut self, _io: HandlerIo<'_>, flush: bool) -> bool {
        let mut log = self.log.lock();
        log.updates.push((self.node, flush));
        log.update_result
    }

    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        let mut log = self.log.lock();
        log.torn_down.push(self.node);
        log.live -= 1;
    }
}

/// Копии записывающих коллабораторов, разделяющие состояние с наблюдателем
#[derive(Debug, Clone)]
pub struct Recorders {
    pub renderer: RecordingRenderer,
    pub navigator: RecordingNavigator,
    pub factory: RecordingFactory,
}

pub fn collaborators(tree: InMemoryTree) -> (Collaborators, Recorders) {
    let recorders = Recorders {
        renderer: RecordingRenderer::new(),
        navigator: RecordingNavigator::default(),
        factory: RecordingFactory::new(),
    };
    let collaborators = Collaborators {
        tree: Box::new(tree),
        output: Box::new(recorders.renderer.clone()),
        navigator: Box::new(recorders.navigator.clone()),
        factory: Box::new(recorders.factory.clone()),
    };
    (collaborators, recorders)
}

/// Прогнать виртуальное время до `target`, вызывая таймеры на каждом дедлайне по порядку
pub fn run_until(watcher: &mut Watcher, clock: &ManualClock, target: Instant) {
    while let Some(deadline) = watcher.next_deadline() {
        if deadline > target {
            break;
        }
        clock.set(deadline.max(clock.now()));
        watcher.on_timer();
    }
    clock.set(target.max(clock.now()));
}
