use crate::events::{Earcon, NodeId, QueueMode, SpeechStyle};
use crate::services::control::ControlHandlerFactory;

/// Доступ к дереву доступности.
///
/// Все методы обязаны быть безопасны для удалённых узлов: возвращают
/// `None`/`false`, а не паникуют.
pub trait AccessibilityTree: Send {
    fn focused_node(&self) -> Option<NodeId>;
    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;
    fn tag_name(&self, node: NodeId) -> Option<String>;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn is_descendant_of(&self, node: NodeId, ancestor: NodeId) -> bool;
    fn surrounding_control(&self, node: NodeId) -> Option<NodeId>;
    /// Узел всё ещё присутствует в дереве
    fn contains(&self, node: NodeId) -> bool;
    /// Документ владеет фокусом ввода
    fn has_document_focus(&self) -> bool;
}

/// Вывод речи, брайля и звуковых иконок. Вызовы не блокируют ядро.
pub trait OutputRenderer: Send {
    fn speak(&mut self, text: &str, mode: QueueMode, style: Option<SpeechStyle>);
    fn write_braille(&mut self, text: &str);
    fn play_earcon(&mut self, earcon: Earcon);
}

/// Позиция навигации и визуальное кольцо фокуса
pub trait Navigator: Send {
    fn sync_to(&mut self, node: NodeId);
    fn show_focus_ring(&mut self, node: NodeId);
}

/// Набор коллабораторов, которыми владеет один наблюдатель
pub struct Collaborators {
    pub tree: Box<dyn AccessibilityTree>,
    pub output: Box<dyn OutputRenderer>,
    pub navigator: Box<dyn Navigator>,
    pub factory: Box<dyn ControlHandlerFactory>,
}
