//! Active control: конечный автомат "не более одного живого обработчика"
//!
//! Классификация узла по форме, создание обработчика через фабрику и
//! гарантированный teardown старого обработчика до создания нового.

mod active;
mod classify;
mod r#trait;
mod value_echo;

pub use self::active::{ActiveControl, ControlSignal, Transition};
pub use self::classify::{ControlKind, ControlState};
pub use self::r#trait::{ControlHandler, ControlHandlerFactory, HandlerIo};
pub use self::value_echo::ValueEchoFactory;
