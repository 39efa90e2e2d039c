use super::r#trait::EventSourceTrait;
use crate::error::{Result, WatchError};
use crate::events::EventKind;
use crate::scenario::{Scenario, ScriptedEvent, Step};
use crate::services::collaborators::InMemoryTree;
use crate::services::control::ControlSignal;
use crate::services::runtime::WatcherHandle;
use crate::trace_if_enabled;
use tokio::time::{sleep_until, Instant};
use tracing::{info, warn};

/// Проигрывание сценария по смещениям от момента старта
pub struct ScenarioReplay {
    events: Vec<ScriptedEvent>,
    tree: InMemoryTree,
}

impl ScenarioReplay {
    pub fn new(scenario: &Scenario, tree: InMemoryTree) -> Self {
        Self {
            events: scenario.events.clone(),
            tree,
        }
    }

    async fn step(&self, handle: &WatcherHandle, event: &ScriptedEvent) -> Result<()> {
        match event.action.apply(&self.tree) {
            Step::Event(kind, target) => handle.push(kind, target),
            Step::Click(node) => {
                handle.push(EventKind::Click, Some(node))?;
                handle.control_input(node, ControlSignal::Click)
            }
            Step::ControlInput(node) => handle.control_input(node, ControlSignal::Input),
            Step::SubtreeMutation(node) => handle.subtree_mutation(node),
            Step::SetActive(active) => match handle.set_active(active).await {
                Err(WatchError::Precondition(reason)) => {
                    warn!("Шаг на {}мс пропущен: {}", event.at_ms, reason);
                    Ok(())
                }
                other => other,
            },
            Step::TreeOnly => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl EventSourceTrait for ScenarioReplay {
    async fn run(self: Box<Self>, handle: WatcherHandle) -> Result<()> {
        info!("Проигрывание сценария: {} событий", self.events.len());
        let start = Instant::now();

        for event in &self.events {
            sleep_until(start + event.offset()).await;
            trace_if_enabled!("{}мс: {:?}", event.at_ms, event.action);
            self.step(&handle, event).await?;
        }

        info!("Сценарий проигран за {:?}", start.elapsed());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::events::{DocumentHandle, EventType, QueueMode};
    use crate::services::control::ControlState;
    use crate::services::event_source::create_event_source;
    use crate::services::runtime::spawn_watcher;
    use crate::services::testing::collaborators;
    use crate::services::watcher::Watcher;
    use crate::utils::SystemClock;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_builtin_scenario_replays_to_completion() {
        let scenario = Scenario::builtin().unwrap();
        let tree = scenario.build_tree();
        let (collaborators, recorders) = collaborators(tree.clone());
        let watcher = Watcher::new(&Config::default(), Arc::new(SystemClock), collaborators);
        let (handle, task) = spawn_watcher(watcher);
        handle.init(DocumentHandle(scenario.document)).unwrap();

        let source = create_event_source(&scenario, tree).unwrap();
        source.run(handle.clone()).await.unwrap();
        handle.when_ready().await.unwrap();

        let spoken = recorders.renderer.spoken();
        assert_eq!(spoken[0], ("Имя, input".to_string(), QueueMode::Flush));
        assert!(spoken.contains(&("Entered dialog Подтверждение".to_string(), QueueMode::Flush)));
        assert!(spoken.iter().any(|(text, _)| text == "copy OK"));
        assert!(spoken.iter().any(|(text, _)| text == "Форма отправлена"));

        let stats = handle.stats().await.unwrap();
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.control, ControlState::NoControl);

        handle.shutdown().unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_set_active_is_skipped() {
        let scenario = Scenario::parse(
            r#"
            nodes = [{ id = 1, tag = "button" }]
            events = [
                { at_ms = 0, action = { type = "set_active", active = true } },
                { at_ms = 5, action = { type = "click", node = 1 } },
            ]
            "#,
        )
        .unwrap();
        let tree = scenario.build_tree();
        let (collaborators, recorders) = collaborators(tree.clone());
        let watcher = Watcher::new(&Config::default(), Arc::new(SystemClock), collaborators);
        let (handle, task) = spawn_watcher(watcher);
        handle.init(DocumentHandle(1)).unwrap();

        create_event_source(&scenario, tree)
            .unwrap()
            .run(handle.clone())
            .await
            .unwrap();
        handle.when_ready().await.unwrap();

        assert_eq!(recorders.navigator.synced(), vec![crate::events::NodeId(1)]);

        handle.shutdown().unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_reaches_text_control_listener() {
        let scenario = Scenario::parse(
            r#"
            nodes = [
                { id = 1, tag = "body" },
                { id = 2, tag = "input", parent = 1, attributes = { aria-label = "Query" } },
            ]
            events = [
                { at_ms = 0, action = { type = "focus", node = 2 } },
                { at_ms = 20, action = { type = "click", node = 2 } },
            ]
            "#,
        )
        .unwrap();
        let tree = scenario.build_tree();
        let (collaborators, recorders) = collaborators(tree.clone());
        let watcher = Watcher::new(&Config::default(), Arc::new(SystemClock), collaborators);
        let (handle, task) = spawn_watcher(watcher);
        handle.init(DocumentHandle(1)).unwrap();

        create_event_source(&scenario, tree)
            .unwrap()
            .run(handle.clone())
            .await
            .unwrap();
        handle.when_ready().await.unwrap();

        let stats = handle.stats().await.unwrap();
        assert_eq!(
            stats.last_report.map(|report| report.dispatched),
            Some(vec![EventType::Click, EventType::Change])
        );
        assert_eq!(recorders.navigator.synced(), vec![crate::events::NodeId(2)]);

        handle.shutdown().unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_unfocused_document_drops_events() {
        let scenario = Scenario::parse(
            r#"
            nodes = [{ id = 1, tag = "button" }]
            events = [
                { at_ms = 0, action = { type = "document_focus", focused = false } },
                { at_ms = 5, action = { type = "click", node = 1 } },
            ]
            "#,
        )
        .unwrap();
        let tree = scenario.build_tree();
        let (collaborators, recorders) = collaborators(tree.clone());
        let watcher = Watcher::new(&Config::default(), Arc::new(SystemClock), collaborators);
        let (handle, task) = spawn_watcher(watcher);
        handle.init(DocumentHandle(1)).unwrap();

        create_event_source(&scenario, tree)
            .unwrap()
            .run(handle.clone())
            .await
            .unwrap();
        handle.when_ready().await.unwrap();

        assert!(recorders.navigator.synced().is_empty());
        assert_eq!(handle.stats().await.unwrap().flushes, 0);

        handle.shutdown().unwrap();
        task.await.unwrap();
    }
}
