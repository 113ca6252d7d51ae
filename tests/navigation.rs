use relgraph::{
    GraphId, GraphStore, ItemCursor, Node, Result, Schema, SchemaKind, StoreOptions,
};

struct Fixture {
    store: GraphStore,
}

impl Fixture {
    /// a -> b and a -> c by `follows`, b - c by `knows`, d isolated.
    fn new(cursor_batch: usize) -> Result<Self> {
        let options = StoreOptions::new(GraphId::new("social", "g1")?).cursor_batch(cursor_batch);
        let store = GraphStore::open(options)?;
        store.add_schema("person", Schema::new(SchemaKind::Node))?;
        store.add_schema("robot", Schema::new(SchemaKind::Node))?;
        store.add_schema("knows", Schema::new(SchemaKind::UndirectedEdge))?;
        store.add_schema("follows", Schema::new(SchemaKind::DirectedEdge))?;
        Ok(Self { store })
    }

    fn populated(cursor_batch: usize) -> Result<Self> {
        let fixture = Self::new(cursor_batch)?;
        let store = &fixture.store;
        let a = store.add_node(&store.item_id("person", "a")?)?;
        let b = store.add_node(&store.item_id("person", "b")?)?;
        let c = store.add_node(&store.item_id("robot", "c")?)?;
        store.add_node(&store.item_id("person", "d")?)?;
        store.add_directed_edge(&store.item_id("follows", "f1")?, &[a.clone()], &[b.clone()])?;
        store.add_directed_edge(&store.item_id("follows", "f2")?, &[a], &[c.clone()])?;
        store.add_undirected_edge(&store.item_id("knows", "k1")?, &[b, c])?;
        Ok(fixture)
    }

    fn node(&self, schema: &str, object: &str) -> Result<Node<'_>> {
        let id = self.store.item_id(schema, object)?;
        Ok(self.store.get_node(&id)?.expect("node exists"))
    }
}

fn names<'g>(cursor: ItemCursor<'g, Node<'g>>) -> Result<Vec<String>> {
    let mut out: Vec<String> = cursor
        .map(|node| node.map(|n| n.object_id().to_owned()))
        .collect::<Result<_>>()?;
    out.sort();
    Ok(out)
}

#[test]
fn adjacency_is_symmetric() -> Result<()> {
    let fixture = Fixture::populated(256)?;
    let nodes = fixture.store.get_nodes().collect_items()?;
    for x in &nodes {
        for y in x.adjacent_nodes() {
            let y = y?;
            assert!(y.is_adjacent(x)?, "{} not adjacent back to {}", y.id(), x.id());
            assert!(y.adjacent_nodes().collect_items()?.contains(x));
        }
    }
    Ok(())
}

#[test]
fn adjacent_nodes_follow_roles() -> Result<()> {
    let fixture = Fixture::populated(256)?;
    let a = fixture.node("person", "a")?;
    let b = fixture.node("person", "b")?;
    let c = fixture.node("robot", "c")?;
    let d = fixture.node("person", "d")?;

    assert_eq!(names(a.adjacent_nodes())?, vec!["b", "c"]);
    assert_eq!(names(a.adjacent_targets())?, vec!["b", "c"]);
    assert!(names(a.adjacent_sources())?.is_empty());
    assert_eq!(names(b.adjacent_sources())?, vec!["a"]);
    assert_eq!(names(b.adjacent_nodes_of("knows"))?, vec!["c"]);
    assert_eq!(names(c.adjacent_sources_of("follows"))?, vec!["a"]);
    assert!(names(c.adjacent_targets_of("follows"))?.is_empty());
    assert!(names(d.adjacent_nodes())?.is_empty());
    assert!(!a.is_adjacent(&d)?);
    assert!(!a.is_adjacent(&a)?);
    Ok(())
}

#[test]
fn incident_edges_follow_roles() -> Result<()> {
    let fixture = Fixture::populated(256)?;
    let a = fixture.node("person", "a")?;
    let b = fixture.node("person", "b")?;

    assert_eq!(a.degree()?, 2);
    assert_eq!(b.degree()?, 2);
    assert_eq!(a.edges_where_source().count(), 2);
    assert_eq!(a.edges_where_target().count(), 0);
    assert_eq!(b.edges_where_target_of("follows").count(), 1);
    assert_eq!(b.edges_where_source_of("follows").count(), 0);
    assert_eq!(b.incident_edges_of("knows").count(), 1);

    for edge in b.incident_edges() {
        let edge = edge?;
        assert!(b.is_incident(&edge)?);
        assert!(edge.is_incident(&b)?);
        assert!(!edge.is_incident(&a)? || edge.schema_id() == "follows");
    }
    Ok(())
}

#[test]
fn edges_report_their_endpoints_and_neighbours() -> Result<()> {
    let fixture = Fixture::populated(256)?;
    let store = &fixture.store;
    let f1 = store.get_edge(&store.item_id("follows", "f1")?)?.expect("f1 exists");
    let k1 = store.get_edge(&store.item_id("knows", "k1")?)?.expect("k1 exists");
    let c = fixture.node("robot", "c")?;

    assert!(f1.is_directed());
    assert!(!k1.is_directed());
    assert_eq!(f1.num_nodes()?, 2);
    assert_eq!(names(k1.incident_nodes())?, vec!["b", "c"]);
    assert_eq!(names(k1.incident_nodes_of("robot"))?, vec!["c"]);

    let directed = f1.as_directed().expect("f1 is directed");
    assert_eq!(names(directed.source_nodes())?, vec!["a"]);
    assert_eq!(names(directed.target_nodes())?, vec!["b"]);
    assert_eq!(names(k1.as_undirected().expect("k1 is undirected").nodes())?, vec!["b", "c"]);

    let adjacent: Vec<String> = f1
        .adjacent_edges()
        .map(|e| e.map(|e| e.object_id().to_owned()))
        .collect::<Result<_>>()?;
    assert_eq!(adjacent.len(), 2);
    assert!(f1.is_adjacent(&k1)?);
    assert_eq!(f1.adjacent_edges_of("knows").count(), 1);
    // f1 and k1 share b, not c.
    assert_eq!(f1.adjacent_edges_via(&c).count(), 0);
    assert_eq!(k1.adjacent_edges_via(&c).count(), 1);
    Ok(())
}

#[test]
fn adjacency_through_one_edge() -> Result<()> {
    let fixture = Fixture::populated(256)?;
    let store = &fixture.store;
    let f1 = store.get_edge(&store.item_id("follows", "f1")?)?.expect("f1 exists");
    let a = fixture.node("person", "a")?;
    let d = fixture.node("person", "d")?;
    assert_eq!(names(a.adjacent_nodes_via(&f1))?, vec!["b"]);
    assert!(names(d.adjacent_nodes_via(&f1))?.is_empty());
    Ok(())
}

#[test]
fn handles_from_another_store_match_nothing() -> Result<()> {
    let first = Fixture::populated(256)?;
    let second = Fixture::populated(256)?;
    let a1 = first.node("person", "a")?;
    let b2 = second.node("person", "b")?;
    let f1 = second
        .store
        .get_edge(&second.store.item_id("follows", "f1")?)?
        .expect("f1 exists");

    assert!(!a1.is_adjacent(&b2)?);
    assert!(!a1.is_incident(&f1)?);
    assert_eq!(a1.adjacent_nodes_via(&f1).count(), 0);
    Ok(())
}

#[test]
fn cursors_nest_across_pages() -> Result<()> {
    let fixture = Fixture::new(2)?;
    let store = &fixture.store;
    let mut people = Vec::new();
    for i in 0..7 {
        people.push(store.add_node(&store.item_id("person", &format!("p{i}"))?)?);
    }
    for pair in people.windows(2) {
        let id = store.item_id("knows", &format!("{}-{}", pair[0].object_id(), pair[1].object_id()))?;
        store.add_undirected_edge(&id, pair)?;
    }

    let mut pairs = 0;
    for node in store.get_nodes() {
        let node = node?;
        for other in node.adjacent_nodes() {
            let other = other?;
            assert!(store.get_nodes_of("person").any(|n| n.map(|n| n == other).unwrap_or(false)));
            pairs += 1;
        }
    }
    // Each of the 6 edges is seen from both ends.
    assert_eq!(pairs, 12);
    Ok(())
}

#[test]
fn cursor_survives_mutation_between_pages() -> Result<()> {
    let fixture = Fixture::new(2)?;
    let store = &fixture.store;
    for i in 0..5 {
        store.add_node(&store.item_id("person", &format!("p{i}"))?)?;
    }
    let mut seen = Vec::new();
    let mut cursor = store.get_nodes();
    while cursor.has_next()? {
        let node = cursor.next_item()?;
        seen.push(node.object_id().to_owned());
        if seen.len() == 1 {
            store.add_node(&store.item_id("person", "late")?)?;
        }
    }
    assert_eq!(seen.len(), 6);
    assert_eq!(seen.last().map(String::as_str), Some("late"));
    Ok(())
}

#[test]
fn disconnected_cursor_yields_nothing_more() -> Result<()> {
    let fixture = Fixture::populated(1)?;
    let mut cursor = fixture.store.get_nodes();
    assert!(cursor.is_connected());
    assert!(cursor.has_next()?);
    cursor.next_item()?;
    cursor.disconnect();
    assert!(!cursor.is_connected());
    assert!(!cursor.has_next()?);
    assert!(cursor.next().is_none());
    assert!(cursor.next_item().is_err());
    Ok(())
}

#[test]
fn schema_filtered_listings() -> Result<()> {
    let fixture = Fixture::populated(256)?;
    let store = &fixture.store;
    assert_eq!(store.get_nodes_of("person").count(), 3);
    assert_eq!(store.get_nodes_of("robot").count(), 1);
    assert_eq!(store.num_nodes_of("robot")?, 1);
    assert_eq!(store.get_edges_of("follows").count(), 2);
    assert_eq!(store.get_edges().count(), 3);
    Ok(())
}

#[test]
fn removing_incident_edges_keeps_unaffected_edges() -> Result<()> {
    let fixture = Fixture::populated(256)?;
    let store = &fixture.store;
    let a = fixture.node("person", "a")?;
    a.remove_incident_edges()?;
    assert_eq!(a.degree()?, 0);
    assert_eq!(store.num_edges()?, 1);
    assert!(store.has_edge(&store.item_id("knows", "k1")?)?);
    assert!(store.has_node(&a.id())?);
    Ok(())
}
