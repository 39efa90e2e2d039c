use super::classify::{classify, ControlKind, ControlState};
use super::r#trait::{ControlHandler, ControlHandlerFactory, HandlerIo};
use crate::debug_if_enabled;
use crate::events::NodeId;
use crate::services::collaborators::AccessibilityTree;
use tracing::{info, warn};

/// Сигнал от слушателя, подключённого к активному контролу
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Input,
    Click,
}

/// Результат переоценки цели фокуса
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Цель не изменилась, обработчик не пересоздавался
    Unchanged,
    Changed { from: ControlState, to: ControlState },
}

/// Слушатели и наблюдатель, привязанные к живому обработчику
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Listeners {
    input: bool,
    click: bool,
    observe_subtree: bool,
}

struct AttachedControl {
    node: NodeId,
    kind: ControlKind,
    handler: Box<dyn ControlHandler>,
    listeners: Listeners,
}

/// Слот активного контрола: не более одного живого обработчика.
///
/// Старый обработчик всегда разбирается до того, как фабрика создаст новый.
#[derive(Default)]
pub struct ActiveControl {
    attached: Option<AttachedControl>,
    target: Option<NodeId>,
}

impl ActiveControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ControlState {
        self.attached
            .as_ref()
            .map_or(ControlState::NoControl, |control| control.kind.state())
    }

    pub fn node(&self) -> Option<NodeId> {
        self.attached.as_ref().map(|control| control.node)
    }

    /// Перейти к новой цели фокуса (`None` означает "цели нет")
    pub fn transition(
        &mut self,
        target: Option<NodeId>,
        tree: &dyn AccessibilityTree,
        factory: &mut dyn ControlHandlerFactory,
    ) -> Transition {
        if target == self.target {
            return Transition::Unchanged;
        }

        let from = self.state();
        self.teardown();
        self.target = target;

        let Some(node) = target else {
            return Transition::Changed {
                from,
                to: ControlState::NoControl,
            };
        };

        let kind = classify(tree, node);
        if kind == ControlKind::None {
            debug_if_enabled!("{} не является интерактивным контролом", node);
            return Transition::Changed {
                from,
                to: ControlState::NoControl,
            };
        }

        match factory.create(kind, node, tree) {
            Ok(handler) => {
                let listeners = Listeners {
                    input: kind.is_text(),
                    click: kind.is_text(),
                    observe_subtree: kind.has_observable_subtree(),
                };
                info!("Подключён обработчик {:?} для {}", kind, node);
                self.attached = Some(AttachedControl {
                    node,
                    kind,
                    handler,
                    listeners,
                });
            }
            Err(e) => {
                warn!("Не удалось создать обработчик {:?} для {}: {}", kind, node, e);
            }
        }

        Transition::Changed {
            from,
            to: self.state(),
        }
    }

    /// Разобрать текущий обработчик, отключив слушателей и наблюдатель.
    /// Без активного обработчика ничего не делает.
    pub fn teardown(&mut self) {
        // Слушатели и наблюдатель уходят вместе с AttachedControl
        if let Some(mut control) = self.attached.take() {
            control.handler.teardown();
            info!("Обработчик {:?} для {} отключён", control.kind, control.node);
        }
    }

    /// Забыть цель фокуса, чтобы повторный фокус на том же узле переподключил обработчик
    pub fn release(&mut self) {
        self.teardown();
        self.target = None;
    }

    /// Попросить обработчик описать изменение. `None`, если обработчика нет.
    pub fn update(&mut self, io: HandlerIo<'_>, flush: bool) -> Option<bool> {
        self.attached
            .as_mut()
            .map(|control| control.handler.update(io, flush))
    }

    /// Слушатель сигнала подключён к этому узлу
    pub fn listens(&self, node: NodeId, signal: ControlSignal) -> bool {
        self.attached.as_ref().is_some_and(|control| {
            control.node == node
                && match signal {
                    ControlSignal::Input => control.listeners.input,
                    ControlSignal::Click => control.listeners.click,
                }
        })
    }

    /// Мутация узла попадает в наблюдаемое поддерево активного контрола
    pub fn observes(&self, node: NodeId, tree: &dyn AccessibilityTree) -> Option<NodeId> {
        let control = self.attached.as_ref()?;
        if !control.listeners.observe_subtree {
            return None;
        }
        (node == control.node || tree.is_descendant_of(node, control.node)).then_some(control.node)
    }

    /// Узел принадлежит активному контролу (сам контрол или его потомок)
    pub fn owns(&self, node: NodeId, tree: &dyn AccessibilityTree) -> bool {
        self.attached
            .as_ref()
            .is_some_and(|control| node == control.node || tree.is_descendant_of(node, control.node))
    }
}
