//! Property tests: every sequence of editor operations can be rolled back by
//! applying the inverses of the recorded changes in reverse order.

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use tessera_core::{
    Annotation, AnnotationTarget, ClassExpr, EdgeKey, GraphChange, GraphEditor, Iri, Literal,
    ModelGraph, Shorthand,
};

const POOL: usize = 5;

#[derive(Debug, Clone)]
enum Op {
    Create(usize, Vec<Ann>),
    Delete(usize),
    AddType(usize, u8),
    RemoveType(usize, u8),
    AddEdge(usize, usize, Vec<Ann>),
    RemoveEdge(usize, usize),
    Annotate(Target, Vec<Ann>),
    Unannotate(Target, Ann),
    Upsert(Target, u8),
    AddLiteral(usize, u8),
    RemoveLiteral(usize, u8),
    Cascade(Vec<usize>),
}

#[derive(Debug, Clone)]
enum Ann {
    Comment(u8),
    Evidence(usize),
}

#[derive(Debug, Clone)]
enum Target {
    Node(usize),
    Edge(usize, usize),
    Model,
}

fn node(i: usize) -> Iri {
    Iri::new(format!("http://x/n{}", i))
}

fn edge(s: usize, o: usize) -> EdgeKey {
    EdgeKey::new(node(s), Iri::from("RO:0002333"), node(o))
}

fn annotation(ann: &Ann) -> Annotation {
    match ann {
        Ann::Comment(v) => Annotation::shorthand(Shorthand::Comment, format!("c{}", v % 3)),
        Ann::Evidence(i) => Annotation::reference(Shorthand::Evidence.property(), node(*i)),
    }
}

fn target(t: &Target) -> AnnotationTarget {
    match t {
        Target::Node(i) => AnnotationTarget::node(node(*i)),
        Target::Edge(s, o) => AnnotationTarget::edge(edge(*s, *o)),
        Target::Model => AnnotationTarget::Model,
    }
}

fn literals(v: u8) -> BTreeMap<Iri, BTreeSet<Literal>> {
    let mut map = BTreeMap::new();
    map.insert(
        Iri::from("http://x/weight"),
        BTreeSet::from([Literal::plain(format!("{}", v % 3))]),
    );
    map
}

fn ann_strategy() -> impl Strategy<Value = Ann> {
    prop_oneof![
        any::<u8>().prop_map(Ann::Comment),
        (0..POOL).prop_map(Ann::Evidence),
    ]
}

fn target_strategy() -> impl Strategy<Value = Target> {
    prop_oneof![
        (0..POOL).prop_map(Target::Node),
        (0..POOL, 0..POOL).prop_map(|(s, o)| Target::Edge(s, o)),
        Just(Target::Model),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let anns = || prop::collection::vec(ann_strategy(), 0..3);
    prop_oneof![
        3 => (0..POOL, anns()).prop_map(|(i, a)| Op::Create(i, a)),
        1 => (0..POOL).prop_map(Op::Delete),
        2 => (0..POOL, any::<u8>()).prop_map(|(i, c)| Op::AddType(i, c)),
        1 => (0..POOL, any::<u8>()).prop_map(|(i, c)| Op::RemoveType(i, c)),
        3 => (0..POOL, 0..POOL, anns()).prop_map(|(s, o, a)| Op::AddEdge(s, o, a)),
        1 => (0..POOL, 0..POOL).prop_map(|(s, o)| Op::RemoveEdge(s, o)),
        2 => (target_strategy(), anns()).prop_map(|(t, a)| Op::Annotate(t, a)),
        1 => (target_strategy(), ann_strategy()).prop_map(|(t, a)| Op::Unannotate(t, a)),
        1 => (target_strategy(), any::<u8>()).prop_map(|(t, v)| Op::Upsert(t, v)),
        1 => (0..POOL, any::<u8>()).prop_map(|(i, v)| Op::AddLiteral(i, v)),
        1 => (0..POOL, any::<u8>()).prop_map(|(i, v)| Op::RemoveLiteral(i, v)),
        1 => prop::collection::vec(0..POOL, 0..3).prop_map(Op::Cascade),
    ]
}

/// Runs one operation; errors are expected for operations that do not fit the
/// current graph and leave it untouched.
fn run(editor: &mut GraphEditor<'_>, op: &Op) {
    let class = |c: &u8| ClassExpr::named(format!("GO:{}", c % 4).as_str());
    let _ = match op {
        Op::Create(i, anns) => editor
            .create_node(Some(node(*i)), anns.iter().map(annotation).collect())
            .map(|_| ()),
        Op::Delete(i) => editor.delete_node(&node(*i)).map(|_| ()),
        Op::AddType(i, c) => editor.add_type(&node(*i), class(c)).map(|_| ()),
        Op::RemoveType(i, c) => editor.remove_type(&node(*i), &class(c)).map(|_| ()),
        Op::AddEdge(s, o, anns) => editor
            .add_edge(edge(*s, *o), anns.iter().map(annotation).collect())
            .map(|_| ()),
        Op::RemoveEdge(s, o) => editor.remove_edge(&edge(*s, *o)).map(|_| ()),
        Op::Annotate(t, anns) => {
            editor.add_annotations(&target(t), anns.iter().map(annotation).collect())
        }
        Op::Unannotate(t, ann) => editor
            .remove_annotations(&target(t), &[annotation(ann)])
            .map(|_| ()),
        Op::Upsert(t, v) => editor.upsert_annotation(
            &target(t),
            Annotation::shorthand(Shorthand::Date, format!("2024-01-0{}", v % 9 + 1)),
        ),
        Op::AddLiteral(i, v) => editor.add_literals(&node(*i), &literals(*v)),
        Op::RemoveLiteral(i, v) => editor.remove_literals(&node(*i), &literals(*v)),
        Op::Cascade(nodes) => editor
            .cascade(nodes.iter().map(|i| node(*i)).collect())
            .map(|_| ()),
    };
}

fn rollback(graph: &mut ModelGraph, changes: &[GraphChange]) {
    for change in changes.iter().rev() {
        graph
            .apply(&change.inverse())
            .expect("inverse of a recorded change must apply");
    }
}

proptest! {
    #[test]
    fn whole_sequence_rolls_back(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut graph = ModelGraph::new("model:p".into(), "http://x/model/p".into());
        let before = graph.snapshot();
        let mut changes = Vec::new();
        {
            let mut editor = GraphEditor::new(&mut graph, &mut changes);
            for op in &ops {
                run(&mut editor, op);
            }
        }
        rollback(&mut graph, &changes);
        prop_assert_eq!(graph.snapshot(), before);
    }

    #[test]
    fn each_operation_rolls_back(ops in prop::collection::vec(op_strategy(), 1..30)) {
        let mut graph = ModelGraph::new("model:p".into(), "http://x/model/p".into());
        for op in &ops {
            let before = graph.snapshot();
            let mut changes = Vec::new();
            run(&mut GraphEditor::new(&mut graph, &mut changes), op);
            let after = graph.snapshot();

            rollback(&mut graph, &changes);
            prop_assert_eq!(&graph.snapshot(), &before);

            // Redo by re-applying forward, as the undo manager does.
            for change in &changes {
                graph.apply(change).expect("recorded change must re-apply");
            }
            prop_assert_eq!(graph.snapshot(), after);
        }
    }
}

#[test]
fn deleted_evidence_comes_back_on_rollback() {
    let mut graph = ModelGraph::new("model:p".into(), "http://x/model/p".into());
    let mut changes = Vec::new();
    {
        let mut editor = GraphEditor::new(&mut graph, &mut changes);
        editor
            .create_node(Some(node(0)), vec![annotation(&Ann::Evidence(1))])
            .unwrap();
        editor.create_node(Some(node(1)), vec![]).unwrap();
        editor.delete_node(&node(0)).unwrap();
    }
    assert_eq!(graph.node_count(), 0);
    let created: Vec<GraphChange> = changes[..2].to_vec();
    rollback(&mut graph, &changes[2..]);
    assert_eq!(graph.node_count(), 2);
    rollback(&mut graph, &created);
    assert_eq!(graph.node_count(), 0);
}
