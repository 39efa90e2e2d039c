use crate::debug_if_enabled;
use crate::error::{Result, WatchError};
use crate::events::{
    ChangeSource, Description, Earcon, EventKind, EventType, KeyInfo, NodeId, QueueModePolicy,
    RawEvent, SpeechStyle,
};
use crate::services::collaborators::{AccessibilityTree, Collaborators};
use crate::services::control::{ActiveControl, HandlerIo, Transition};
use crate::services::dialog::{DialogTracker, DialogTransition};
use crate::services::reducer::ReducedBatch;
use tracing::{debug, info, warn};

/// Узел скрыт от вспомогательных технологий
const ARIA_HIDDEN: &str = "aria-hidden";
/// Явное разрешение фокусироваться на скрытом узле
const IGNORE_ARIA_HIDDEN: &str = "data-ignore-aria-hidden";

/// Итог одного прохода диспетчера
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub dispatched: Vec<EventType>,
    pub skipped_stale: usize,
    /// Ошибки, отличные от устаревшего узла
    pub failed: usize,
    pub dropped_live_regions: usize,
}

/// Маршрутизация редуцированной пачки по обработчикам типов событий.
///
/// Один проход, строго по порядку, без реентерабельности. Ошибки отдельных
/// событий поглощаются здесь и не прерывают остаток пачки.
pub struct Dispatcher<'a> {
    pub collaborators: &'a mut Collaborators,
    pub control: &'a mut ActiveControl,
    pub dialog: &'a mut DialogTracker,
    pub queue_mode: &'a mut QueueModePolicy,
    pub max_live_regions: usize,
}

impl<'a> Dispatcher<'a> {
    pub fn dispatch(&mut self, batch: ReducedBatch) -> DispatchReport {
        let mut report = DispatchReport::default();
        let mut live_regions = 0;

        for event in batch {
            if event.is_live_region() {
                live_regions += 1;
                if live_regions > self.max_live_regions {
                    report.dropped_live_regions += 1;
                    continue;
                }
            }

            match self.handle(&event) {
                Ok(()) => report.dispatched.push(event.event_type()),
                Err(WatchError::StaleNode(node)) => {
                    debug!("Пропуск {}: {} уже не в дереве", event, node);
                    report.skipped_stale += 1;
                }
                Err(e) => {
                    warn!("Событие {} не обработано: {}", event, e);
                    report.failed += 1;
                }
            }
        }

        if report.dropped_live_regions > 0 {
            info!(
                "Отброшено {} live-регионов сверх лимита {}",
                report.dropped_live_regions, self.max_live_regions
            );
        }
        report
    }

    fn handle(&mut self, event: &RawEvent) -> Result<()> {
        debug_if_enabled!("Диспетчеризация {}", event);

        match &event.kind {
            EventKind::Focus => {
                self.queue_mode.user_action();
                let target = match event.target {
                    Some(node) => Some(self.live(node)?),
                    None => self.collaborators.tree.focused_node(),
                };
                self.focus_transition(target)
            }
            EventKind::Blur => {
                self.control.release();
                Ok(())
            }
            EventKind::KeyDown(key) => {
                self.live_target(event)?;
                self.queue_mode.user_action();
                self.ensure_control();
                self.on_key_down(key)
            }
            EventKind::KeyUp(_) => {
                self.live_target(event)?;
                self.queue_mode.user_action();
                self.on_key_up()
            }
            EventKind::KeyPress(_) | EventKind::Select => {
                self.live_target(event)?;
                self.ensure_control();
                Ok(())
            }
            EventKind::Change(source) => {
                let node = self.live_target(event)?;
                self.on_change(*source, node)
            }
            EventKind::Click => {
                let node = self.live_target(event)?;
                self.queue_mode.user_action();
                self.collaborators.navigator.sync_to(node);
                Ok(())
            }
            EventKind::Clipboard { action, text } => {
                let mode = self.queue_mode.take();
                let utterance = format!("{} {}", action, text);
                self.collaborators.output.speak(utterance.trim_end(), mode, None);
                Ok(())
            }
            EventKind::LiveRegion {
                assertive,
                descriptions,
            } => {
                self.on_live_region(*assertive, descriptions);
                Ok(())
            }
            EventKind::VisibilityChange { visible } => {
                if *visible {
                    self.ensure_control();
                } else {
                    self.control.release();
                    self.dialog.reset();
                }
                Ok(())
            }
        }
    }

    /// Переход фокуса: автомат контрола, затем отдельно диалог, затем описание цели
    fn focus_transition(&mut self, target: Option<NodeId>) -> Result<()> {
        let resolved = target.and_then(|node| self.resolve_focus_target(node));
        let tree = &*self.collaborators.tree;

        let transition = self
            .control
            .transition(resolved, tree, &mut *self.collaborators.factory);
        if let Transition::Changed { from, to } = transition {
            debug_if_enabled!("Переход контрола: {:?} -> {:?}", from, to);
        }

        if let Some(dialog) = self.dialog.update(resolved, tree) {
            self.announce_dialog(dialog);
        }

        match resolved {
            Some(node) => self.describe(node),
            None => Ok(()),
        }
    }

    /// Повторная оценка фокуса без объявлений (KeyDown, KeyPress, Select)
    fn ensure_control(&mut self) {
        let focused = self.collaborators.tree.focused_node();
        let resolved = focused.and_then(|node| self.resolve_focus_target(node));
        self.control.transition(
            resolved,
            &*self.collaborators.tree,
            &mut *self.collaborators.factory,
        );
    }

    fn on_key_down(&mut self, key: &KeyInfo) -> Result<()> {
        if key.modifiers.is_command() {
            debug_if_enabled!("{}: команда, текст не описывается", key);
            return Ok(());
        }
        self.describe_control_change()
    }

    fn on_key_up(&mut self) -> Result<()> {
        let Some(focused) = self.collaborators.tree.focused_node() else {
            return Ok(());
        };
        // Дата и время фиксируют значение только на отпускании клавиши
        if self.control.node() == Some(self.control_of(focused)) {
            return self.describe_control_change();
        }
        self.describe(focused)
    }

    fn on_change(&mut self, source: ChangeSource, node: NodeId) -> Result<()> {
        match source {
            ChangeSource::Input => {
                self.ensure_control();
                self.describe_control_change()
            }
            ChangeSource::Mutation | ChangeSource::Document => {
                if self.claim_change(node) {
                    return Ok(());
                }
                let focused = self.collaborators.tree.focused_node();
                if focused.is_some_and(|f| f == node || self.control_of(f) == node) {
                    self.describe(node)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Ближайший контрол, охватывающий узел (или сам узел)
    fn control_of(&self, node: NodeId) -> NodeId {
        self.collaborators
            .tree
            .surrounding_control(node)
            .unwrap_or(node)
    }

    /// Обработчик активного контрола описал изменение узла
    fn claim_change(&mut self, node: NodeId) -> bool {
        if !self.control.owns(node, &*self.collaborators.tree) {
            return false;
        }
        let flush = self.queue_mode.peek_flush();
        let io = HandlerIo {
            tree: &*self.collaborators.tree,
            output: &mut *self.collaborators.output,
        };
        let claimed = self.control.update(io, flush).unwrap_or(false);
        if claimed {
            self.queue_mode.take();
        }
        claimed
    }

    /// Дельта от обработчика, иначе описание значения контрола целиком
    fn describe_control_change(&mut self) -> Result<()> {
        let Some(node) = self.control.node() else {
            return Ok(());
        };
        if self.claim_change(node) {
            return Ok(());
        }
        self.describe(node)
    }

    fn on_live_region(&mut self, assertive: bool, descriptions: &[Description]) {
        let text = descriptions
            .iter()
            .map(Description::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        if text.trim().is_empty() {
            return;
        }
        let style = if assertive {
            SpeechStyle::Assertive
        } else {
            SpeechStyle::Polite
        };
        let mode = self.queue_mode.take();
        let output = &mut self.collaborators.output;
        output.speak(&text, mode, Some(style));
        output.write_braille(&text);
    }

    fn announce_dialog(&mut self, transition: DialogTransition) {
        let output = &mut self.collaborators.output;
        if let Some(dialog) = transition.exited {
            info!("Выход из диалога {}", dialog);
            output.play_earcon(Earcon::DialogExit);
            output.speak("Exited dialog", self.queue_mode.take(), None);
        }
        if let Some(dialog) = transition.entered {
            info!("Вход в диалог {}", dialog);
            let name = node_label(&*self.collaborators.tree, dialog);
            let text = match name {
                Some(name) => format!("Entered dialog {}", name),
                None => "Entered dialog".to_string(),
            };
            let output = &mut self.collaborators.output;
            output.play_earcon(Earcon::DialogEnter);
            output.speak(&text, self.queue_mode.take(), None);
        }
        // Описание цели встаёт в очередь за объявлением диалога
        self.queue_mode.force_queue();
    }

    fn describe(&mut self, node: NodeId) -> Result<()> {
        let text = describe_node(&*self.collaborators.tree, node)?;
        let mode = self.queue_mode.take();
        let output = &mut self.collaborators.output;
        output.speak(&text, mode, None);
        output.write_braille(&text);
        Ok(())
    }

    /// Учитывает aria-hidden на узле и предках, если узел не помечен обходом правила
    fn resolve_focus_target(&self, node: NodeId) -> Option<NodeId> {
        let tree = &*self.collaborators.tree;
        if !tree.contains(node) {
            return None;
        }
        let bypass = tree
            .attribute(node, IGNORE_ARIA_HIDDEN)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        if bypass {
            return Some(node);
        }

        let mut current = Some(node);
        while let Some(id) = current {
            if tree
                .attribute(id, ARIA_HIDDEN)
                .is_some_and(|v| v.eq_ignore_ascii_case("true"))
            {
                debug_if_enabled!("{} скрыт через aria-hidden, фокус игнорируется", node);
                return None;
            }
            current = tree.parent(id);
        }
        Some(node)
    }

    fn live(&self, node: NodeId) -> Result<NodeId> {
        if self.collaborators.tree.contains(node) {
            Ok(node)
        } else {
            Err(WatchError::StaleNode(node))
        }
    }

    fn live_target(&self, event: &RawEvent) -> Result<NodeId> {
        match event.target {
            Some(node) => self.live(node),
            None => self
                .collaborators
                .tree
                .focused_node()
                .ok_or_else(|| WatchError::Internal(format!("у события {} нет цели", event))),
        }
    }
}

fn node_label(tree: &dyn AccessibilityTree, node: NodeId) -> Option<String> {
    tree.attribute(node, "aria-label")
        .or_else(|| tree.attribute(node, "name"))
        .filter(|label| !label.trim().is_empty())
}

/// Описание узла: "метка, роль, значение" (отсутствующие части опускаются)
pub fn describe_node(tree: &dyn AccessibilityTree, node: NodeId) -> Result<String> {
    if !tree.contains(node) {
        return Err(WatchError::StaleNode(node));
    }

    let role = tree
        .attribute(node, "role")
        .or_else(|| tree.tag_name(node))
        .filter(|role| !role.is_empty());
    let value = tree.attribute(node, "value").filter(|v| !v.is_empty());

    let parts: Vec<String> = [node_label(tree, node), role, value]
        .into_iter()
        .flatten()
        .collect();
    Ok(parts.join(", "))
}
