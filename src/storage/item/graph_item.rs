use crate::types::{GraphId, Rid, GRAPH_RID};

use super::super::events::FeatureOwner;
use super::super::GraphStore;
use super::{HasFeatures, ItemHandle};

/// Handle to the singleton item standing for the whole store.
///
/// Its features live in the attribute table of the graph id's schema under
/// [`GRAPH_RID`], which never collides with a node or edge row id.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GraphItem<'g>(ItemHandle<'g>);

impl<'g> GraphItem<'g> {
    pub(crate) fn new(store: &'g GraphStore) -> Self {
        let id = store.graph_id();
        Self(ItemHandle::new(
            store,
            id.schema_id().to_owned(),
            id.object_id().to_owned(),
            GRAPH_RID,
        ))
    }

    /// Identity of the store.
    pub fn id(&self) -> &'g GraphId {
        self.0.store.graph_id()
    }
}

impl<'g> HasFeatures<'g> for GraphItem<'g> {
    fn store(&self) -> &'g GraphStore {
        self.0.store
    }

    fn schema_id(&self) -> &str {
        &self.0.schema_id
    }

    fn rid(&self) -> Rid {
        self.0.rid
    }

    fn owner(&self) -> FeatureOwner {
        FeatureOwner::Graph(self.id().clone())
    }
}
