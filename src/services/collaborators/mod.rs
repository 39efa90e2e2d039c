//! Collaborators: внешние зависимости ядра
//!
//! Ядро обращается к дереву доступности, выводу речи/брайля и навигации только
//! через трейты из этого модуля. Реализации здесь нужны сценарному режиму и
//! тестам; реальный браузер подставляет свои.

mod in_memory_tree;
mod tracing_output;
mod r#trait;

pub use self::in_memory_tree::{InMemoryTree, NodeSpec};
pub use self::r#trait::{AccessibilityTree, Collaborators, Navigator, OutputRenderer};
pub use self::tracing_output::{TracingNavigator, TracingRenderer};
