use super::{Navigator, OutputRenderer};
use crate::events::{Earcon, NodeId, QueueMode, SpeechStyle};
use tracing::info;

/// Вывод в лог вместо синтезатора речи и брайлевского дисплея
#[derive(Debug, Default)]
pub struct TracingRenderer;

impl TracingRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl OutputRenderer for TracingRenderer {
    fn speak(&mut self, text: &str, mode: QueueMode, style: Option<SpeechStyle>) {
        match style {
            Some(style) => info!("🔊 [{:?}/{:?}] {}", mode, style, text),
            None => info!("🔊 [{:?}] {}", mode, text),
        }
    }

    fn write_braille(&mut self, text: &str) {
        info!("⠿ {}", text);
    }

    fn play_earcon(&mut self, earcon: Earcon) {
        info!("🔔 {:?}", earcon);
    }
}

#[derive(Debug, Default)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn sync_to(&mut self, node: NodeId) {
        info!("Позиция навигации синхронизирована с {}", node);
    }

    fn show_focus_ring(&mut self, node: NodeId) {
        info!("Кольцо фокуса на {}", node);
    }
}
