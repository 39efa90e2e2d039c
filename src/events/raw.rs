use super::keyboard::KeyInfo;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Непрозрачная ссылка на узел дерева доступности.
///
/// Очередь никогда не владеет временем жизни узла: узел может исчезнуть
/// из дерева между созданием события и его диспетчеризацией.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Источник события изменения значения
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSource {
    /// Обычное событие `change` от документа
    Document,
    /// Слушатель `input`, подключённый к активному текстовому контролу
    Input,
    /// Наблюдатель мутаций поддерева активного контрола
    Mutation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipboardAction {
    Copy,
    Cut,
    Paste,
}

impl fmt::Display for ClipboardAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipboardAction::Copy => write!(f, "copy"),
            ClipboardAction::Cut => write!(f, "cut"),
            ClipboardAction::Paste => write!(f, "paste"),
        }
    }
}

/// Фрагмент описания live-региона
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    pub text: String,
}

impl Description {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Вид события вместе с данными, специфичными для вида
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Focus,
    Blur,
    KeyDown(KeyInfo),
    KeyUp(KeyInfo),
    KeyPress(KeyInfo),
    Change(ChangeSource),
    Select,
    Click,
    Clipboard { action: ClipboardAction, text: String },
    LiveRegion { assertive: bool, descriptions: Vec<Description> },
    VisibilityChange { visible: bool },
}

/// Тип события без данных: используется редуктором и в логах
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Focus,
    Blur,
    KeyDown,
    KeyUp,
    KeyPress,
    Change,
    Select,
    Click,
    Clipboard,
    LiveRegion,
    VisibilityChange,
}

impl EventKind {
    pub fn event_type(&self) -> EventType {
        match self {
            EventKind::Focus => EventType::Focus,
            EventKind::Blur => EventType::Blur,
            EventKind::KeyDown(_) => EventType::KeyDown,
            EventKind::KeyUp(_) => EventType::KeyUp,
            EventKind::KeyPress(_) => EventType::KeyPress,
            EventKind::Change(_) => EventType::Change,
            EventKind::Select => EventType::Select,
            EventKind::Click => EventType::Click,
            EventKind::Clipboard { .. } => EventType::Clipboard,
            EventKind::LiveRegion { .. } => EventType::LiveRegion,
            EventKind::VisibilityChange { .. } => EventType::VisibilityChange,
        }
    }
}

/// Сырое событие в очереди. Метку времени ставит очередь в момент `push`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: EventKind,
    pub target: Option<NodeId>,
    pub timestamp: Instant,
}

impl RawEvent {
    pub fn stamped(kind: EventKind, target: Option<NodeId>, timestamp: Instant) -> Self {
        Self {
            kind,
            target,
            timestamp,
        }
    }

    pub fn event_type(&self) -> EventType {
        self.kind.event_type()
    }

    pub fn is_focus(&self) -> bool {
        matches!(self.kind, EventKind::Focus)
    }

    pub fn is_change(&self) -> bool {
        matches!(self.kind, EventKind::Change(_))
    }

    pub fn is_live_region(&self) -> bool {
        matches!(self.kind, EventKind::LiveRegion { .. })
    }
}

impl fmt::Display for RawEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            Some(target) => write!(f, "{:?} -> {}", self.event_type(), target),
            None => write!(f, "{:?}", self.event_type()),
        }
    }
}
