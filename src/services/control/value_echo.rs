use super::{ControlHandler, ControlHandlerFactory, ControlKind, HandlerIo};
use crate::error::Result;
use crate::events::{NodeId, QueueMode};
use crate::services::collaborators::AccessibilityTree;
use crate::watch_error;
use tracing::debug;

/// Фабрика обработчиков, озвучивающих изменения значения контрола.
///
/// Стратегия выбирается по виду: у текстовых полей озвучивается дельта текста,
/// у даты/времени и медиа озвучивается новое значение целиком.
#[derive(Debug, Default)]
pub struct ValueEchoFactory {
    created: usize,
}

impl ValueEchoFactory {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn created(&self) -> usize {
        self.created
    }
}

impl ControlHandlerFactory for ValueEchoFactory {
    fn create(
        &mut self,
        kind: ControlKind,
        node: NodeId,
        tree: &dyn AccessibilityTree,
    ) -> Result<Box<dyn ControlHandler>> {
        let attribute = match kind {
            ControlKind::PlainText | ControlKind::TextArea | ControlKind::Time | ControlKind::Date => {
                "value"
            }
            ControlKind::ContentEditable => "text",
            ControlKind::Media => "state",
            ControlKind::None => {
                return Err(watch_error!(handler, "у {} нет обработчика для {:?}", node, kind));
            }
        };

        if !tree.contains(node) {
            return Err(watch_error!(handler, "{} отсутствует в дереве", node));
        }

        self.created += 1;
        debug!("Обработчик #{} {:?} для {}", self.created, kind, node);
        Ok(Box::new(ValueEchoHandler {
            node,
            kind,
            attribute,
            last_value: tree.attribute(node, attribute).unwrap_or_default(),
            torn_down: false,
        }))
    }
}

struct ValueEchoHandler {
    node: NodeId,
    kind: ControlKind,
    attribute: &'static str,
    last_value: String,
    torn_down: bool,
}

impl ValueEchoHandler {
    /// Текстовая дельта: добавленный хвост, удалённый хвост или новое значение
    fn describe_text_delta(old: &str, new: &str) -> String {
        if let Some(added) = new.strip_prefix(old) {
            added.to_string()
        } else if let Some(removed) = old.strip_prefix(new) {
            format!("deleted {}", removed)
        } else {
            new.to_string()
        }
    }
}

impl ControlHandler for ValueEchoHandler {
    fn update(&mut self, io: HandlerIo<'_>, flush: bool) -> bool {
        if self.torn_down {
            return false;
        }

        let Some(value) = io.tree.attribute(self.node, self.attribute) else {
            return false;
        };
        if value == self.last_value {
            return false;
        }

        let text = if self.kind.is_text() {
            Self::describe_text_delta(&self.last_value, &value)
        } else {
            value.clone()
        };
        self.last_value = value;

        if text.is_empty() {
            return false;
        }

        let mode = if flush { QueueMode::Flush } else { QueueMode::CategoryFlush };
        io.output.speak(&text, mode, None);
        io.output.write_braille(&self.last_value);
        true
    }

    fn teardown(&mut self) {
        if !self.torn_down {
            self.torn_down = true;
            debug!("ValueEchoHandler для {} разобран", self.node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::collaborators::{InMemoryTree, NodeSpec};
    use crate::services::testing::{Output, RecordingRenderer};

    #[test]
    fn test_text_delta_descriptions() {
        assert_eq!(ValueEchoHandler::describe_text_delta("hel", "hello"), "lo");
        assert_eq!(ValueEchoHandler::describe_text_delta("hello", "he"), "deleted llo");
        assert_eq!(ValueEchoHandler::describe_text_delta("abc", "xyz"), "xyz");
    }

    #[test]
    fn test_handler_speaks_only_on_change() {
        let tree = InMemoryTree::from_specs([NodeSpec::new(1, "input").attr("value", "a")]);
        let mut factory = ValueEchoFactory::new();
        let mut renderer = RecordingRenderer::new();
        let mut handler = factory.create(ControlKind::PlainText, NodeId(1), &tree).unwrap();

        assert!(!handler.update(HandlerIo { tree: &tree, output: &mut renderer }, true));

        tree.set_attribute(NodeId(1), "value", "ab");
        assert!(handler.update(HandlerIo { tree: &tree, output: &mut renderer }, true));
        assert_eq!(
            renderer.spoken(),
            vec![("b".to_string(), QueueMode::Flush)]
        );

        handler.teardown();
        handler.teardown();
        tree.set_attribute(NodeId(1), "value", "abc");
        assert!(!handler.update(HandlerIo { tree: &tree, output: &mut renderer }, false));
        assert!(renderer.outputs().contains(&Output::Braille("ab".to_string())));
    }

    #[test]
    fn test_factory_rejects_missing_node() {
        let tree = InMemoryTree::new();
        let mut factory = ValueEchoFactory::new();
        assert!(factory.create(ControlKind::Media, NodeId(9), &tree).is_err());
        assert!(factory.create(ControlKind::None, NodeId(9), &tree).is_err());
        assert_eq!(factory.created(), 0);
    }
}
