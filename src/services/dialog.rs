use crate::events::NodeId;
use crate::services::collaborators::AccessibilityTree;

/// Смена диалога, в котором находится фокус
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogTransition {
    pub exited: Option<NodeId>,
    pub entered: Option<NodeId>,
}

/// Отслеживание входа в диалог и выхода из него.
///
/// Работает независимо от автомата активного контрола: объявление делается
/// один раз на реальный переход, а не на каждое событие фокуса.
#[derive(Debug, Default)]
pub struct DialogTracker {
    current: Option<NodeId>,
}

impl DialogTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Ближайший предок (или сам узел) с ролью dialog/alertdialog
    pub fn enclosing_dialog(tree: &dyn AccessibilityTree, node: NodeId) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            let is_dialog = tree.attribute(id, "role").is_some_and(|role| {
                role.eq_ignore_ascii_case("dialog") || role.eq_ignore_ascii_case("alertdialog")
            });
            if is_dialog {
                return Some(id);
            }
            current = tree.parent(id);
        }
        None
    }

    pub fn update(
        &mut self,
        focus: Option<NodeId>,
        tree: &dyn AccessibilityTree,
    ) -> Option<DialogTransition> {
        let dialog = focus.and_then(|node| Self::enclosing_dialog(tree, node));
        if dialog == self.current {
            return None;
        }
        let transition = DialogTransition {
            exited: self.current,
            entered: dialog,
        };
        self.current = dialog;
        Some(transition)
    }
}
