use std::sync::atomic::Ordering;
use std::sync::Arc;

use relgraph::{
    CounterMetrics, FeatureDef, FeatureKind, FeatureValue, GraphError, GraphId, GraphStore,
    HasFeatures, JournalMode, Result, Schema, SchemaKind, StoreOptions,
};
use tempfile::tempdir;

fn graph_id() -> GraphId {
    GraphId::new("library", "main").unwrap()
}

fn person() -> Schema {
    Schema::new(SchemaKind::Node)
        .with_feature("name", FeatureDef::open(FeatureKind::String))
        .with_feature(
            "tags",
            FeatureDef::open(FeatureKind::MultiCategorical(vec![
                "author".into(),
                "editor".into(),
                "reader".into(),
            ])),
        )
        .with_feature("friends", FeatureDef::open(FeatureKind::MultiId))
}

#[test]
fn reopened_store_sees_everything_written() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("library.db");

    let (alice_rid, bob_id) = {
        let store = GraphStore::open(StoreOptions::new(graph_id()).path(&path))?;
        store.add_schema("person", person())?;
        store.add_schema("wrote", Schema::new(SchemaKind::DirectedEdge))?;
        let alice = store.add_node(&store.item_id("person", "alice")?)?;
        let bob = store.add_node(&store.item_id("person", "bob")?)?;
        alice.set_feature_value("name", FeatureValue::string("Alice"))?;
        alice.set_feature_value(
            "tags",
            FeatureValue::multi_categorical(["author", "reader"]),
        )?;
        alice.set_feature_value("friends", FeatureValue::multi_id([bob.id()]))?;
        store.add_directed_edge(&store.item_id("wrote", "w1")?, &[alice.clone()], &[bob.clone()])?;
        (alice.rid(), bob.id())
    };

    let store = GraphStore::open(StoreOptions::new(graph_id()).path(&path))?;
    assert_eq!(store.get_schema("person")?, person());
    assert_eq!(store.schema_kind("wrote")?, SchemaKind::DirectedEdge);
    assert_eq!(store.num_nodes()?, 2);
    assert_eq!(store.num_edges()?, 1);

    let alice = store
        .get_node(&store.item_id("person", "alice")?)?
        .expect("alice persisted");
    assert_eq!(alice.rid(), alice_rid);
    assert_eq!(alice.get_feature_value("name")?, FeatureValue::string("Alice"));
    assert_eq!(
        alice.get_feature_value("tags")?,
        FeatureValue::multi_categorical(["reader", "author"])
    );
    assert_eq!(
        alice.get_feature_value("friends")?,
        FeatureValue::multi_id([bob_id.clone()])
    );
    assert_eq!(alice.adjacent_targets().collect_items()?.len(), 1);

    // Row ids continue after the highest persisted one.
    let carol = store.add_node(&store.item_id("person", "carol")?)?;
    let bob = store.get_node(&bob_id)?.expect("bob persisted");
    assert!(carol.rid() > bob.rid());
    Ok(())
}

#[test]
fn removed_row_ids_are_not_handed_out_after_reopening() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("reuse.db");

    let (last_node, last_edge) = {
        let store = GraphStore::open(StoreOptions::new(graph_id()).path(&path))?;
        store.add_schema("person", person())?;
        store.add_schema("wrote", Schema::new(SchemaKind::DirectedEdge))?;
        let a = store.add_node(&store.item_id("person", "a")?)?;
        let b = store.add_node(&store.item_id("person", "b")?)?;
        let edge =
            store.add_directed_edge(&store.item_id("wrote", "w1")?, &[a.clone()], &[a.clone()])?;
        b.set_feature_value("name", FeatureValue::string("Bea"))?;
        store.remove_node(&b.id())?;
        store.remove_edge(&edge.id())?;
        (b.rid(), edge.rid())
    };

    let options = StoreOptions::new(graph_id()).path(&path).foreign_keys(false);
    let store = GraphStore::open(options)?;
    let c = store.add_node(&store.item_id("person", "c")?)?;
    assert!(c.rid() > last_node);
    assert_eq!(c.get_feature_value("name")?, FeatureValue::Unknown);
    let a = store
        .get_node(&store.item_id("person", "a")?)?
        .expect("a persisted");
    let edge = store.add_directed_edge(&store.item_id("wrote", "w2")?, &[a.clone()], &[c])?;
    assert!(edge.rid() > last_edge);
    Ok(())
}

#[test]
fn store_of_another_graph_kind_is_rejected() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("shared.db");
    {
        let store = GraphStore::open(StoreOptions::new(graph_id()).path(&path))?;
        store.add_schema("catalog", Schema::new(SchemaKind::Node))?;
    }
    let other = GraphStore::open(StoreOptions::new(GraphId::new("catalog", "x")?).path(&path))?;
    assert!(matches!(
        other.connect(),
        Err(GraphError::TypeMismatch(_))
    ));
    Ok(())
}

#[test]
fn fallback_location_is_removed_with_the_store() -> Result<()> {
    let store = GraphStore::open(StoreOptions::new(graph_id()))?;
    store.connect()?;
    let location = store.location().expect("connected store has a location");
    assert!(location.exists());
    drop(store);
    assert!(!location.exists());
    Ok(())
}

#[test]
fn options_load_from_toml() -> Result<()> {
    let dir = tempdir()?;
    let db = dir.path().join("from-config.db");
    let config = dir.path().join("store.toml");
    std::fs::write(
        &config,
        format!(
            "graph_id = \"library.main\"\npath = {:?}\njournal_mode = \"wal\"\nforeign_keys = false\ncursor_batch = 3\n",
            db.display().to_string()
        ),
    )?;

    let options = StoreOptions::from_toml_file(&config)?;
    assert_eq!(options.graph_id, graph_id());
    assert_eq!(options.journal_mode, JournalMode::Wal);
    assert!(!options.foreign_keys);
    assert_eq!(options.cursor_batch, 3);

    let store = GraphStore::open(options)?;
    store.connect()?;
    assert_eq!(store.location(), Some(db.clone()));
    assert!(db.exists());
    Ok(())
}

#[test]
fn invalid_toml_options_are_config_errors() {
    assert!(matches!(
        StoreOptions::from_toml_str("graph_id = \"library.main\"\ncolour = \"blue\"\n"),
        Err(GraphError::Config(_))
    ));
    assert!(matches!(
        StoreOptions::from_toml_str("graph_id = \"library.main\"\ncursor_batch = 0\n"),
        Err(GraphError::Config(_))
    ));
}

#[test]
fn metrics_count_store_activity() -> Result<()> {
    let metrics = Arc::new(CounterMetrics::default());
    let options = StoreOptions::new(graph_id()).metrics(metrics.clone());
    let store = GraphStore::open(options)?;
    store.add_schema("person", person())?;
    store.add_schema("knows", Schema::new(SchemaKind::UndirectedEdge))?;
    let a = store.add_node(&store.item_id("person", "a")?)?;
    let b = store.add_node(&store.item_id("person", "b")?)?;
    store.add_undirected_edge(&store.item_id("knows", "k")?, &[a.clone(), b])?;
    a.set_feature_value("name", FeatureValue::string("A"))?;
    a.set_feature_value("name", FeatureValue::Unknown)?;
    store.remove_node(&a.id())?;

    assert_eq!(metrics.nodes_created.load(Ordering::Relaxed), 2);
    assert_eq!(metrics.edges_created.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.nodes_removed.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.edges_removed.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.feature_rows_written.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.feature_rows_suppressed.load(Ordering::Relaxed), 1);
    Ok(())
}
