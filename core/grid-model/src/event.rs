//! FILENAME: core/grid-model/src/event.rs
//! PURPOSE: Model-change notifications as an explicit publish/subscribe bus.
//! CONTEXT: Engines publish after a model change has been fully applied, so a
//! listener always observes the final state. Listeners are keyed by event kind.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::model::{AggregationModel, CellSelectionModel, FilterModel, RowGroupingModel, SortModel};

/// Discriminant used to register listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridEventKind {
    AggregationModelChange,
    RowGroupingModelChange,
    CellSelectionChange,
    FilterModelChange,
    SortModelChange,
    RowsSet,
    ColumnsChange,
    FilteredRowsSet,
}

/// A notification carrying the new model as payload.
#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    AggregationModelChange(AggregationModel),
    RowGroupingModelChange(RowGroupingModel),
    CellSelectionChange(CellSelectionModel),
    FilterModelChange(FilterModel),
    SortModelChange(SortModel),
    RowsSet { row_count: usize },
    ColumnsChange { column_count: usize },
    /// Filtering finished; carries the number of passing data rows.
    FilteredRowsSet { passing_rows: usize },
}

impl GridEvent {
    pub fn kind(&self) -> GridEventKind {
        match self {
            GridEvent::AggregationModelChange(_) => GridEventKind::AggregationModelChange,
            GridEvent::RowGroupingModelChange(_) => GridEventKind::RowGroupingModelChange,
            GridEvent::CellSelectionChange(_) => GridEventKind::CellSelectionChange,
            GridEvent::FilterModelChange(_) => GridEventKind::FilterModelChange,
            GridEvent::SortModelChange(_) => GridEventKind::SortModelChange,
            GridEvent::RowsSet { .. } => GridEventKind::RowsSet,
            GridEvent::ColumnsChange { .. } => GridEventKind::ColumnsChange,
            GridEvent::FilteredRowsSet { .. } => GridEventKind::FilteredRowsSet,
        }
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type Listener = Box<dyn FnMut(&GridEvent) + Send>;

/// Listener lists keyed by event kind.
#[derive(Default)]
pub struct EventBus {
    listeners: FxHashMap<GridEventKind, Vec<(SubscriptionId, Listener)>>,
    next_id: u64,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listener_count", &self.listener_count())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        EventBus::default()
    }

    pub fn subscribe(
        &mut self,
        kind: GridEventKind,
        listener: impl FnMut(&GridEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.listeners
            .entry(kind)
            .or_default()
            .push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Returns false if the id was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        for list in self.listeners.values_mut() {
            if let Some(pos) = list.iter().position(|(existing, _)| *existing == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    /// Calls every listener registered for the event's kind, in subscription order.
    pub fn publish(&mut self, event: GridEvent) {
        if let Some(list) = self.listeners.get_mut(&event.kind()) {
            for (_, listener) in list.iter_mut() {
                listener(&event);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_publish_reaches_matching_listeners_only() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();

        let sink = received.clone();
        bus.subscribe(GridEventKind::RowGroupingModelChange, move |event| {
            sink.lock().unwrap().push(event.clone());
        });
        let sink = received.clone();
        bus.subscribe(GridEventKind::AggregationModelChange, move |event| {
            sink.lock().unwrap().push(event.clone());
        });

        bus.publish(GridEvent::RowGroupingModelChange(vec!["region".to_string()]));
        bus.publish(GridEvent::RowsSet { row_count: 3 });

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0], GridEvent::RowGroupingModelChange(vec!["region".to_string()]));
    }

    #[test]
    fn test_unsubscribe() {
        let count = Arc::new(Mutex::new(0));
        let mut bus = EventBus::new();
        let sink = count.clone();
        let id = bus.subscribe(GridEventKind::RowsSet, move |_| *sink.lock().unwrap() += 1);

        bus.publish(GridEvent::RowsSet { row_count: 1 });
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(GridEvent::RowsSet { row_count: 1 });

        assert_eq!(*count.lock().unwrap(), 1);
        assert_eq!(bus.listener_count(), 0);
    }
}
