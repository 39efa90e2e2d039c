//! Источники событий документа.
//!
//! Источник только порождает события и изменения дерева и передаёт их через
//! [`WatcherHandle`](crate::services::runtime::WatcherHandle). Решения о
//! сбросе, редукции и озвучивании принимает исключительно наблюдатель.

mod scenario_replay;
mod r#trait;

pub use self::r#trait::{create_event_source, EventSourceTrait};
