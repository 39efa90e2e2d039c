use crate::events::{
    ChangeSource, ClipboardAction, Description, EventKind, KeyInfo, NodeId,
};
use crate::services::collaborators::{InMemoryTree, NodeSpec};
use anyhow::{Context, Result};
use figment::{
    providers::{Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Сценарий, проигрываемый без `--scenario`
const BUILTIN_SCENARIO: &str = r#"
document = 1
focused = 10

nodes = [
    { id = 1, tag = "body" },
    { id = 10, tag = "input", parent = 1, attributes = { aria-label = "Имя", value = "" } },
    { id = 11, tag = "input", parent = 1, attributes = { aria-label = "Дата", type = "date", value = "2024-01-01" } },
    { id = 12, tag = "button", parent = 1, attributes = { aria-label = "Отправить" } },
    { id = 20, tag = "div", parent = 1, attributes = { role = "dialog", aria-label = "Подтверждение" } },
    { id = 21, tag = "button", parent = 20, attributes = { aria-label = "OK" } },
    { id = 30, tag = "div", parent = 1, attributes = { aria-live = "polite" } },
]

events = [
    { at_ms = 0, action = { type = "focus", node = 10 } },
    { at_ms = 20, action = { type = "key_down", node = 10, key = { key = "A", modifiers = { shift = true } } } },
    { at_ms = 21, action = { type = "set_value", node = 10, value = "A" } },
    { at_ms = 22, action = { type = "input", node = 10 } },
    { at_ms = 23, action = { type = "key_up", node = 10, key = { key = "A" } } },
    { at_ms = 60, action = { type = "focus", node = 11 } },
    { at_ms = 65, action = { type = "focus", node = 12 } },
    { at_ms = 70, action = { type = "focus", node = 11 } },
    { at_ms = 120, action = { type = "click", node = 12 } },
    { at_ms = 125, action = { type = "focus", node = 21 } },
    { at_ms = 126, action = { type = "live_region", node = 30, assertive = false, text = ["Форма отправлена"] } },
    { at_ms = 200, action = { type = "clipboard", node = 21, action = "copy", text = "OK" } },
    { at_ms = 260, action = { type = "focus", node = 12 } },
    { at_ms = 300, action = { type = "blur", node = 12 } },
]
"#;

/// Действие сценария: событие документа или изменение дерева
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptedAction {
    Focus { node: u64 },
    Blur { node: u64 },
    KeyDown { node: u64, key: KeyInfo },
    KeyUp { node: u64, key: KeyInfo },
    KeyPress { node: u64, key: KeyInfo },
    Change { node: u64 },
    Select { node: u64 },
    Click { node: u64 },
    Clipboard {
        node: u64,
        action: ClipboardAction,
        #[serde(default)]
        text: String,
    },
    LiveRegion {
        node: u64,
        #[serde(default)]
        assertive: bool,
        text: Vec<String>,
    },
    Visibility { visible: bool },
    /// Документ получил или потерял фокус ввода
    DocumentFocus { focused: bool },
    SetValue { node: u64, value: String },
    Input { node: u64 },
    Mutation { node: u64 },
    RemoveNode { node: u64 },
    SetActive { active: bool },
}

/// Что проигрыватель должен сделать для действия
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Событие для `push`
    Event(EventKind, Option<NodeId>),
    /// Событие `Click` плюс сигнал слушателю кликов активного контрола
    Click(NodeId),
    ControlInput(NodeId),
    SubtreeMutation(NodeId),
    SetActive(bool),
    /// Только изменение дерева
    TreeOnly,
}

impl ScriptedAction {
    pub fn node(&self) -> Option<NodeId> {
        match self {
            ScriptedAction::Focus { node }
            | ScriptedAction::Blur { node }
            | ScriptedAction::KeyDown { node, .. }
            | ScriptedAction::KeyUp { node, .. }
            | ScriptedAction::KeyPress { node, .. }
            | ScriptedAction::Change { node }
            | ScriptedAction::Select { node }
            | ScriptedAction::Click { node }
            | ScriptedAction::Clipboard { node, .. }
            | ScriptedAction::LiveRegion { node, .. }
            | ScriptedAction::SetValue { node, .. }
            | ScriptedAction::Input { node }
            | ScriptedAction::Mutation { node }
            | ScriptedAction::RemoveNode { node } => Some(NodeId(*node)),
            ScriptedAction::Visibility { .. }
            | ScriptedAction::DocumentFocus { .. }
            | ScriptedAction::SetActive { .. } => None,
        }
    }

    /// Применить побочный эффект к дереву и вернуть шаг для наблюдателя
    pub fn apply(&self, tree: &InMemoryTree) -> Step {
        let target = self.node();
        match self {
            ScriptedAction::Focus { node } => {
                tree.set_focus(Some(NodeId(*node)));
                Step::Event(EventKind::Focus, target)
            }
            ScriptedAction::Blur { .. } => {
                tree.set_focus(None);
                Step::Event(EventKind::Blur, target)
            }
            ScriptedAction::KeyDown { key, .. } => Step::Event(EventKind::KeyDown(key.clone()), target),
            ScriptedAction::KeyUp { key, .. } => Step::Event(EventKind::KeyUp(key.clone()), target),
            ScriptedAction::KeyPress { key, .. } => Step::Event(EventKind::KeyPress(key.clone()), target),
            ScriptedAction::Change { .. } => {
                Step::Event(EventKind::Change(ChangeSource::Document), target)
            }
            ScriptedAction::Select { .. } => Step::Event(EventKind::Select, target),
            ScriptedAction::Click { node } => Step::Click(NodeId(*node)),
            ScriptedAction::Clipboard { action, text, .. } => Step::Event(
                EventKind::Clipboard {
                    action: *action,
                    text: text.clone(),
                },
                target,
            ),
            ScriptedAction::LiveRegion {
                assertive, text, ..
            } => Step::Event(
                EventKind::LiveRegion {
                    assertive: *assertive,
                    descriptions: text.iter().map(Description::new).collect(),
                },
                target,
            ),
            ScriptedAction::Visibility { visible } => {
                Step::Event(EventKind::VisibilityChange { visible: *visible }, None)
            }
            ScriptedAction::DocumentFocus { focused } => {
                tree.set_document_focus(*focused);
                Step::TreeOnly
            }
            ScriptedAction::SetValue { node, value } => {
                tree.set_attribute(NodeId(*node), "value", value);
                Step::TreeOnly
            }
            ScriptedAction::Input { node } => Step::ControlInput(NodeId(*node)),
            ScriptedAction::Mutation { node } => Step::SubtreeMutation(NodeId(*node)),
            ScriptedAction::RemoveNode { node } => {
                tree.remove(NodeId(*node));
                Step::TreeOnly
            }
            ScriptedAction::SetActive { active } => Step::SetActive(*active),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScriptedEvent {
    /// Смещение от начала проигрывания
    pub at_ms: u64,
    pub action: ScriptedAction,
}

impl ScriptedEvent {
    pub fn offset(&self) -> Duration {
        Duration::from_millis(self.at_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Scenario {
    #[serde(default = "default_document")]
    pub document: u64,
    #[serde(default)]
    pub focused: Option<u64>,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub events: Vec<ScriptedEvent>,
}

fn default_document() -> u64 {
    1
}

impl Scenario {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Файл сценария не найден: {:?}", path);
        }
        let scenario: Scenario = Figment::from(Toml::file(path))
            .extract()
            .with_context(|| format!("Не удалось загрузить сценарий из {:?}", path))?;
        scenario.prepared()
    }

    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_SCENARIO)
    }

    pub fn parse(source: &str) -> Result<Self> {
        let scenario: Scenario = Figment::from(Toml::string(source))
            .extract()
            .context("Не удалось разобрать сценарий")?;
        scenario.prepared()
    }

    fn prepared(mut self) -> Result<Self> {
        self.validate()?;
        // Стабильная сортировка: одновременные события сохраняют порядок файла
        self.events.sort_by_key(|event| event.at_ms);
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for node in &self.nodes {
            if !ids.insert(node.id) {
                anyhow::bail!("Повторяющийся id узла в сценарии: {}", node.id);
            }
        }

        for node in &self.nodes {
            if let Some(parent) = node.parent {
                if !ids.contains(&parent) {
                    anyhow::bail!("Узел {} ссылается на неизвестного родителя {}", node.id, parent);
                }
            }
        }

        if let Some(focused) = self.focused {
            if !ids.contains(&focused) {
                anyhow::bail!("Начальный фокус на неизвестном узле {}", focused);
            }
        }

        for event in &self.events {
            if let Some(node) = event.action.node() {
                if !ids.contains(&node.0) {
                    anyhow::bail!(
                        "Событие на {}мс ссылается на неизвестный узел {}",
                        event.at_ms,
                        node
                    );
                }
            }
        }

        Ok(())
    }

    /// Дерево в начальном состоянии сценария
    pub fn build_tree(&self) -> InMemoryTree {
        let tree = InMemoryTree::from_specs(self.nodes.iter().cloned());
        tree.set_focus(self.focused.map(NodeId));
        tree
    }

    pub fn duration(&self) -> Duration {
        self.events
            .last()
            .map(ScriptedEvent::offset)
            .unwrap_or_default()
    }

    pub fn summary(&self) -> String {
        format!(
            "документ doc#{}, узлов: {}, событий: {}, длительность: {}мс",
            self.document,
            self.nodes.len(),
            self.events.len(),
            self.duration().as_millis()
        )
    }
}
