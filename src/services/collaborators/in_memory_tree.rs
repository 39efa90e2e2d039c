use super::r#trait::AccessibilityTree;
use crate::events::NodeId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Описание узла для построения дерева (сценарии и тесты)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NodeSpec {
    pub id: u64,
    pub tag: String,
    #[serde(default)]
    pub parent: Option<u64>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

#[cfg(test)]
impl NodeSpec {
    pub fn new(id: u64, tag: impl Into<String>) -> Self {
        Self {
            id,
            tag: tag.into(),
            parent: None,
            attributes: HashMap::new(),
        }
    }

    pub fn child_of(mut self, parent: u64) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Default)]
struct TreeState {
    nodes: HashMap<NodeId, NodeSpec>,
    focused: Option<NodeId>,
    document_focused: bool,
}

/// Дерево доступности в памяти.
///
/// Клонируемый дескриптор: наблюдатель читает дерево, а сценарий или тест
/// одновременно меняет фокус и атрибуты через свою копию.
#[derive(Debug, Clone)]
pub struct InMemoryTree {
    state: Arc<RwLock<TreeState>>,
}

impl Default for InMemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTree {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(TreeState {
                document_focused: true,
                ..TreeState::default()
            })),
        }
    }

    pub fn from_specs(specs: impl IntoIterator<Item = NodeSpec>) -> Self {
        let tree = Self::new();
        for spec in specs {
            tree.insert(spec);
        }
        tree
    }

    pub fn insert(&self, spec: NodeSpec) {
        self.state.write().nodes.insert(NodeId(spec.id), spec);
    }

    /// Удалить узел вместе с поддеревом
    pub fn remove(&self, node: NodeId) {
        let mut state = self.state.write();
        let mut doomed = vec![node];
        let mut i = 0;
        while i < doomed.len() {
            let current = doomed[i];
            doomed.extend(
                state
                    .nodes
                    .values()
                    .filter(|spec| spec.parent == Some(current.0))
                    .map(|spec| NodeId(spec.id)),
            );
            i += 1;
        }
        for id in doomed {
            state.nodes.remove(&id);
            if state.focused == Some(id) {
                state.focused = None;
            }
        }
    }

    pub fn set_focus(&self, node: Option<NodeId>) {
        self.state.write().focused = node;
    }

    pub fn set_document_focus(&self, focused: bool) {
        self.state.write().document_focused = focused;
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        if let Some(spec) = self.state.write().nodes.get_mut(&node) {
            spec.attributes.insert(name.to_string(), value.to_string());
        }
    }

    fn is_control_shape(spec: &NodeSpec) -> bool {
        let editable = spec
            .attributes
            .get("contenteditable")
            .is_some_and(|v| v.is_empty() || v.eq_ignore_ascii_case("true"));
        editable
            || matches!(
                spec.tag.to_ascii_lowercase().as_str(),
                "input" | "textarea" | "select" | "video" | "audio"
            )
    }
}

impl AccessibilityTree for InMemoryTree {
    fn focused_node(&self) -> Option<NodeId> {
        let state = self.state.read();
        state.focused.filter(|id| state.nodes.contains_key(id))
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.state
            .read()
            .nodes
            .get(&node)
            .and_then(|spec| spec.attributes.get(name).cloned())
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        self.state.read().nodes.get(&node).map(|spec| spec.tag.clone())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        let state = self.state.read();
        state
            .nodes
            .get(&node)
            .and_then(|spec| spec.parent)
            .map(NodeId)
            .filter(|parent| state.nodes.contains_key(parent))
    }

    fn is_descendant_of(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    fn surrounding_control(&self, node: NodeId) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            let is_control = self
                .state
                .read()
                .nodes
                .get(&id)
                .is_some_and(Self::is_control_shape);
            if is_control {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }

    fn contains(&self, node: NodeId) -> bool {
        self.state.read().nodes.contains_key(&node)
    }

    fn has_document_focus(&self) -> bool {
        self.state.read().document_focused
    }
}
