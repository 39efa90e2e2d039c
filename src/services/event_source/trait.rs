use crate::error::Result;
use crate::scenario::Scenario;
use crate::services::collaborators::InMemoryTree;
use crate::services::runtime::WatcherHandle;

/// Источник, который кормит наблюдателя событиями до своего завершения
#[async_trait::async_trait]
pub trait EventSourceTrait {
    async fn run(self: Box<Self>, handle: WatcherHandle) -> Result<()>;
}

/// Фабрика источника событий для сценария
pub fn create_event_source(
    scenario: &Scenario,
    tree: InMemoryTree,
) -> Result<Box<dyn EventSourceTrait + Send>> {
    Ok(Box::new(super::scenario_replay::ScenarioReplay::new(
        scenario, tree,
    )))
}
