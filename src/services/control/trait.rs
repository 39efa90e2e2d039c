use super::ControlKind;
use crate::error::Result;
use crate::events::NodeId;
use crate::services::collaborators::{AccessibilityTree, OutputRenderer};

/// Доступ обработчика к дереву и выводу на время одного вызова
pub struct HandlerIo<'a> {
    pub tree: &'a dyn AccessibilityTree,
    pub output: &'a mut dyn OutputRenderer,
}

/// Обработчик интерактивного контрола (текстовое поле, дата, медиа)
pub trait ControlHandler: Send {
    /// Описать изменение контрола. Возвращает `true`, если что-то было сказано.
    fn update(&mut self, io: HandlerIo<'_>, flush: bool) -> bool;

    /// Отключить обработчик. Повторный вызов ничего не делает.
    fn teardown(&mut self);
}

/// Фабрика обработчиков; ошибка создания переводит автомат в `NoControl`
pub trait ControlHandlerFactory: Send {
    fn create(
        &mut self,
        kind: ControlKind,
        node: NodeId,
        tree: &dyn AccessibilityTree,
    ) -> Result<Box<dyn ControlHandler>>;
}
