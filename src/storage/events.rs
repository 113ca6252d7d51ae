use std::rc::Rc;

use crate::error::ListenerError;
use crate::types::{GraphId, ItemId};
use crate::value::FeatureValue;

/// Item whose feature was written.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FeatureOwner {
    /// The store's singleton graph item.
    Graph(GraphId),
    /// A node or edge.
    Item(ItemId),
}

/// Structural and attribute mutations announced to listeners.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphEvent {
    /// A node was added.
    NodeAdded(ItemId),
    /// A node was removed.
    NodeRemoved(ItemId),
    /// An edge was added.
    EdgeAdded(ItemId),
    /// An edge was removed, directly or because it lost a required endpoint.
    EdgeRemoved(ItemId),
    /// A feature value was written (unknown values included).
    FeatureSet {
        /// Item the value belongs to.
        owner: FeatureOwner,
        /// Feature id.
        feature_id: String,
        /// Value as given by the caller.
        value: FeatureValue,
    },
}

/// Receives [`GraphEvent`]s after the mutation has been applied.
///
/// An error returned here is handed back to the caller of the mutating
/// operation; the mutation itself stays applied.
pub trait GraphListener {
    /// Handles one event.
    fn on_event(&self, event: &GraphEvent) -> std::result::Result<(), ListenerError>;
}

impl<F> GraphListener for F
where
    F: Fn(&GraphEvent) -> std::result::Result<(), ListenerError>,
{
    fn on_event(&self, event: &GraphEvent) -> std::result::Result<(), ListenerError> {
        self(event)
    }
}

/// Handle returned by [`crate::GraphStore::add_listener`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ListenerId(pub(crate) u64);

#[derive(Default)]
pub(crate) struct ListenerBus {
    next_id: u64,
    listeners: Vec<(ListenerId, Rc<dyn GraphListener>)>,
}

impl ListenerBus {
    pub(crate) fn add(&mut self, listener: Rc<dyn GraphListener>) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push((id, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Listeners in registration order.
    pub(crate) fn snapshot(&self) -> Vec<Rc<dyn GraphListener>> {
        self.listeners
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect()
    }
}
