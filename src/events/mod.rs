pub mod keyboard;
pub mod output;
pub mod raw;

pub use keyboard::KeyInfo;
pub use output::{Earcon, QueueMode, QueueModePolicy, SpeechStyle};
pub use raw::{ChangeSource, ClipboardAction, Description, EventKind, EventType, NodeId, RawEvent};

/// Дескриптор документа, к которому привязана сессия наблюдателя
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(pub u64);

impl std::fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}
