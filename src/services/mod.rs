pub mod collaborators;
pub mod control;
pub mod dialog;
pub mod dispatcher;
pub mod event_queue;
pub mod event_source;
pub mod idle_notifier;
pub mod reducer;
pub mod runtime;
pub mod scheduler;
pub mod watcher;

#[cfg(test)]
pub mod testing;

pub use collaborators::{Collaborators, TracingNavigator, TracingRenderer};
pub use control::ValueEchoFactory;
pub use event_source::create_event_source;
pub use runtime::spawn_watcher;
pub use watcher::Watcher;
