use crate::events::NodeId;
use crate::services::collaborators::AccessibilityTree;

/// Форма узла, определяющая конкретную стратегию обработчика
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    PlainText,
    TextArea,
    ContentEditable,
    Time,
    Date,
    Media,
    None,
}

/// Состояние автомата активного контрола
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlState {
    NoControl,
    TextControl,
    TimeControl,
    DateControl,
    MediaControl,
}

impl ControlKind {
    pub fn state(self) -> ControlState {
        match self {
            ControlKind::PlainText | ControlKind::TextArea | ControlKind::ContentEditable => {
                ControlState::TextControl
            }
            ControlKind::Time => ControlState::TimeControl,
            ControlKind::Date => ControlState::DateControl,
            ControlKind::Media => ControlState::MediaControl,
            ControlKind::None => ControlState::NoControl,
        }
    }

    pub fn is_text(self) -> bool {
        self.state() == ControlState::TextControl
    }

    /// У контрола есть поддерево, изменения которого не порождают событий
    pub fn has_observable_subtree(self) -> bool {
        matches!(
            self,
            ControlKind::TextArea | ControlKind::ContentEditable | ControlKind::Media
        )
    }
}

/// Типы `<input>`, редактируемые как однострочный текст
const TEXT_INPUT_TYPES: &[&str] = &["text", "search", "email", "password", "url", "tel", "number"];

/// Классифицировать узел по форме (тег, тип, роль), а не по идентичности
pub fn classify(tree: &dyn AccessibilityTree, node: NodeId) -> ControlKind {
    let Some(tag) = tree.tag_name(node) else {
        return ControlKind::None;
    };

    match tag.to_ascii_lowercase().as_str() {
        "input" => {
            let input_type = tree
                .attribute(node, "type")
                .map(|t| t.to_ascii_lowercase())
                .unwrap_or_else(|| "text".to_string());
            return match input_type.as_str() {
                "time" => ControlKind::Time,
                "date" | "month" | "week" => ControlKind::Date,
                t if TEXT_INPUT_TYPES.contains(&t) => ControlKind::PlainText,
                _ => ControlKind::None,
            };
        }
        "textarea" => return ControlKind::TextArea,
        "video" | "audio" => return ControlKind::Media,
        _ => {}
    }

    let editable = tree
        .attribute(node, "contenteditable")
        .is_some_and(|v| v.is_empty() || v.eq_ignore_ascii_case("true"));
    let textbox = tree
        .attribute(node, "role")
        .is_some_and(|role| role.eq_ignore_ascii_case("textbox"));

    if editable || textbox {
        ControlKind::ContentEditable
    } else {
        ControlKind::None
    }
}
