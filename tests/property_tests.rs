use proptest::prelude::*;
use relgraph::{
    FeatureDef, FeatureKind, FeatureValue, GraphId, GraphStore, HasFeatures, Node, Schema,
    SchemaKind, StoreOptions,
};

#[derive(Debug, Clone)]
enum Operation {
    AddNode { index: usize },
    RemoveNode { index: usize },
    AddEdge { source: usize, target: usize },
    RemoveEdge { index: usize },
}

fn arb_operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        (0usize..12).prop_map(|index| Operation::AddNode { index }),
        (0usize..12).prop_map(|index| Operation::RemoveNode { index }),
        (0usize..12, 0usize..12).prop_map(|(source, target)| Operation::AddEdge { source, target }),
        (0usize..24).prop_map(|index| Operation::RemoveEdge { index }),
    ]
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 ]{0,24}",
        "\\PC{0,16}",
    ]
}

fn store() -> GraphStore {
    let store = GraphStore::open(
        StoreOptions::new(GraphId::new("prop", "g").unwrap()).cursor_batch(3),
    )
    .unwrap();
    store
        .add_schema(
            "n",
            Schema::new(SchemaKind::Node)
                .with_feature("num", FeatureDef::open(FeatureKind::Numeric))
                .with_feature("text", FeatureDef::open(FeatureKind::String))
                .with_feature(
                    "level",
                    FeatureDef::closed(FeatureKind::Numeric, FeatureValue::numeric(1.0)),
                ),
        )
        .unwrap();
    store
        .add_schema("e", Schema::new(SchemaKind::DirectedEdge))
        .unwrap();
    store
}

fn node<'g>(store: &'g GraphStore, index: usize) -> Option<Node<'g>> {
    let id = store.item_id("n", &format!("n{index}")).unwrap();
    store.get_node(&id).unwrap()
}

proptest! {
    #[test]
    fn prop_feature_values_read_back(
        num in -1.0e12f64..1.0e12,
        text in arb_text(),
        level in prop_oneof![Just(1.0f64), -100.0f64..100.0],
    ) {
        let store = store();
        let item = store.add_node(&store.item_id("n", "x").unwrap()).unwrap();
        item.set_feature_values(
            &["num", "text", "level"],
            vec![
                FeatureValue::numeric(num),
                FeatureValue::string(text.clone()),
                FeatureValue::numeric(level),
            ],
        )
        .unwrap();

        prop_assert_eq!(item.get_feature_value("num").unwrap(), FeatureValue::numeric(num));
        prop_assert_eq!(item.get_feature_value("text").unwrap(), FeatureValue::string(text));
        prop_assert_eq!(item.get_feature_value("level").unwrap(), FeatureValue::numeric(level));

        let stored = store.num_feature_values_stored("n").unwrap();
        let expected = if level == 1.0 { 2 } else { 3 };
        prop_assert_eq!(stored, expected);
    }

    #[test]
    fn prop_topology_stays_consistent(ops in prop::collection::vec(arb_operation(), 1..60)) {
        let store = store();
        let mut next_edge = 0usize;

        for op in ops {
            match op {
                Operation::AddNode { index } => {
                    let id = store.item_id("n", &format!("n{index}")).unwrap();
                    if !store.has_node(&id).unwrap() {
                        store.add_node(&id).unwrap();
                    }
                }
                Operation::RemoveNode { index } => {
                    if let Some(node) = node(&store, index) {
                        store.remove_node(&node.id()).unwrap();
                    }
                }
                Operation::AddEdge { source, target } => {
                    if let (Some(s), Some(t)) = (node(&store, source), node(&store, target)) {
                        let id = store.item_id("e", &format!("e{next_edge}")).unwrap();
                        next_edge += 1;
                        store.add_directed_edge(&id, &[s], &[t]).unwrap();
                    }
                }
                Operation::RemoveEdge { index } => {
                    let id = store.item_id("e", &format!("e{index}")).unwrap();
                    if store.has_edge(&id).unwrap() {
                        store.remove_edge(&id).unwrap();
                    }
                }
            }
        }

        let edges = store.get_edges().collect_items().unwrap();
        prop_assert_eq!(edges.len(), store.num_edges().unwrap());
        for edge in &edges {
            let directed = edge.as_directed().unwrap();
            // Every surviving edge keeps both required roles.
            prop_assert!(directed.num_sources().unwrap() >= 1);
            prop_assert!(directed.num_targets().unwrap() >= 1);
            for source in directed.source_nodes() {
                prop_assert!(store.has_node(&source.unwrap().id()).unwrap());
            }
        }

        let nodes = store.get_nodes().collect_items().unwrap();
        prop_assert_eq!(nodes.len(), store.num_nodes().unwrap());
        for x in &nodes {
            for y in x.adjacent_nodes() {
                prop_assert!(y.unwrap().is_adjacent(x).unwrap());
            }
        }
    }
}
