use crate::events::RawEvent;
use smallvec::SmallVec;
use std::time::Instant;

/// Редуцированная пачка: обычно несколько событий, без аллокации
pub type ReducedBatch = SmallVec<[RawEvent; 8]>;

/// Индекс и метка времени последнего события фокуса
pub fn last_focus(events: &[RawEvent]) -> Option<(usize, Instant)> {
    events
        .iter()
        .enumerate()
        .rev()
        .find(|(_, event)| event.is_focus())
        .map(|(index, event)| (index, event.timestamp))
}

/// Причинная редукция и упорядочивание поколения перед диспетчеризацией.
///
/// Событие остаётся, если оно не раньше последнего фокуса или является
/// live-регионом, и при этом не является `Change` того же узла сразу после
/// оставленного `Focus`. Затем live-регионы стабильно переносятся в конец.
pub fn reduce(events: Vec<RawEvent>) -> ReducedBatch {
    let focus_index = last_focus(&events).map(|(index, _)| index);

    let mut kept = ReducedBatch::new();
    for (index, event) in events.into_iter().enumerate() {
        let fresh = focus_index.map_or(true, |focus| index >= focus);
        if !fresh && !event.is_live_region() {
            continue;
        }
        // Смежность считается только по оставленным событиям
        let echoes_focus = kept
            .last()
            .is_some_and(|prev: &RawEvent| prev.is_focus() && prev.target == event.target);
        if event.is_change() && echoes_focus {
            continue;
        }
        kept.push(event);
    }

    let (mut ordered, live): (ReducedBatch, ReducedBatch) =
        kept.into_iter().partition(|event| !event.is_live_region());
    ordered.extend(live);
    ordered
}
