// Integration tests for refgraph

use assert_cmd::Command;
use predicates::prelude::*;
use refgraph::census::{count, typestats};
use refgraph::{
    find_backref_chain, show_backrefs, Direction, Error, GraphBuilder, GraphOptions, GraphOutput,
    Heap, HeapObject, Inspect, ObjectId, ObjectSpace, Presenter, Referents, Referrers, StructuralKind,
    SystemTools,
};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn test_object(name: &str) -> HeapObject {
    HeapObject::new("TestObject").summary(format!("TestObject({})", name))
}

fn backrefs(heap: &Heap, roots: &[ObjectId], options: GraphOptions<'_>) -> refgraph::Diagram {
    GraphBuilder::new(heap, options)
        .build(roots, &Referrers(heap), Direction::Backward)
        .expect("build failed")
}

// ============================================================================
// Traversal Tests
// ============================================================================

#[test]
fn test_two_objects_exact_output() {
    let mut heap = Heap::new();
    let a = heap.insert(test_object("A"));
    heap.insert(test_object("B").refs([a]));

    let diagram = backrefs(&heap, &[a], GraphOptions::new());
    let expected = "digraph ObjectGraph {\n\
                    \x20 node[shape=box, style=filled, fillcolor=white];\n\
                    \x20 o1[fontcolor=red];\n\
                    \x20 o1[label=\"TestObject\\nTestObject(A)\"];\n\
                    \x20 o1[fillcolor=\"0,0,1\"];\n\
                    \x20 o2 -> o1;\n\
                    \x20 o2[label=\"TestObject\\nTestObject(B)\"];\n\
                    \x20 o2[fillcolor=\"0,0,0.766667\"];\n\
                    }\n";
    assert_eq!(diagram.to_dot(), expected);
}

#[test]
fn test_acyclic_graph_visits_each_object_once() {
    let mut heap = Heap::new();
    let leaf = heap.insert(test_object("leaf"));
    let left = heap.insert(test_object("left").refs([leaf]));
    let right = heap.insert(test_object("right").refs([leaf]));
    heap.insert(test_object("top").refs([left, right]));

    let diagram = backrefs(&heap, &[leaf], GraphOptions::new());
    let nodes = diagram.nodes();
    let unique: HashSet<&str> = nodes.iter().copied().collect();
    assert_eq!(nodes.len(), 4);
    assert_eq!(unique.len(), 4);
    // `top` reaches the leaf twice; both of its edges are drawn.
    assert_eq!(diagram.edges().len(), 4);
}

#[test]
fn test_cycle_terminates() {
    let mut heap = Heap::new();
    let a = heap.insert(test_object("A"));
    let b = heap.insert(test_object("B").refs([a]));
    heap.link(a, b).unwrap();

    let diagram = backrefs(&heap, &[a], GraphOptions::new().max_depth(10));
    assert_eq!(diagram.node_count(), 2);
    assert_eq!(diagram.edges().len(), 2);
}

#[test]
fn test_single_isolated_root() {
    let mut heap = Heap::new();
    let a = heap.insert(test_object("A"));
    let diagram = backrefs(&heap, &[a], GraphOptions::new());
    assert_eq!(diagram.roots(), vec!["o1"]);
    assert_eq!(diagram.nodes(), vec!["o1"]);
    assert!(diagram.edges().is_empty());
}

#[test]
fn test_depth_limit() {
    let mut heap = Heap::new();
    let mut prev = heap.insert(test_object("0"));
    let root = prev;
    for i in 1..6 {
        prev = heap.insert(test_object(&i.to_string()).refs([prev]));
    }

    let diagram = backrefs(&heap, &[root], GraphOptions::new().max_depth(2));
    assert_eq!(diagram.node_count(), 3);
    assert_eq!(diagram.edges().len(), 2);
    // Deepest drawn node is at the bottom of the gradient.
    assert_eq!(diagram.fill_of("o3").unwrap().to_string(), "0,0,0.3");
    assert!(diagram.to_dot().contains("  o3[fontcolor=white];\n"));
}

#[test]
fn test_fan_out_truncation() {
    let mut heap = Heap::new();
    let target = heap.insert(test_object("target"));
    for i in 0..15 {
        heap.insert(test_object(&i.to_string()).refs([target]));
    }

    let diagram = backrefs(&heap, &[target], GraphOptions::new());
    assert_eq!(diagram.edges().len(), 10);
    assert_eq!(diagram.node_count(), 11);
    assert_eq!(diagram.summaries(), vec![("too_many_o1", "5 more backreferences")]);

    let dot = diagram.to_dot();
    assert!(dot.contains("  too_many_o1 -> o1 [color=red,style=dotted,len=0.25,weight=10];\n"));
    assert!(dot.contains(
        "  too_many_o1[label=\"5 more backreferences\",shape=box,height=0.25,color=red,fillcolor=\"0,1,0.766667\",fontsize=6];\n"
    ));
}

#[test]
fn test_forward_summary_label() {
    let mut heap = Heap::new();
    let children: Vec<ObjectId> = (0..4).map(|i| heap.insert(test_object(&i.to_string()))).collect();
    let parent = heap.insert(HeapObject::new("list").kind(StructuralKind::Container).refs(children));

    let diagram = GraphBuilder::new(&heap, GraphOptions::new().too_many(2))
        .build(&[parent], &Referents(&heap), Direction::Forward)
        .unwrap();
    assert_eq!(diagram.edges().len(), 2);
    assert_eq!(diagram.summaries()[0].1, "2 more references");
}

#[test]
fn test_filtered_neighbors_not_counted() {
    let mut heap = Heap::new();
    let target = heap.insert(test_object("target"));
    for i in 0..5 {
        heap.insert(HeapObject::new("Skip").refs([target]));
        heap.insert(test_object(&i.to_string()).refs([target]));
    }
    heap.insert(test_object("5").refs([target]));

    let options = GraphOptions::new()
        .too_many(6)
        .filter(|_, obj| obj.type_name() != "Skip");
    let diagram = backrefs(&heap, &[target], options);
    assert_eq!(diagram.edges().len(), 6);
    assert!(diagram.summaries().is_empty());
}

#[test]
fn test_extra_ignore() {
    let mut heap = Heap::new();
    let a = heap.insert(test_object("A"));
    let b = heap.insert(test_object("B").refs([a]));
    heap.insert(test_object("C").refs([b]));

    let diagram = backrefs(&heap, &[a], GraphOptions::new().ignore([b]));
    assert_eq!(diagram.node_count(), 1);
}

#[test]
fn test_cull_splices_edges() {
    let mut heap = Heap::new();
    let a = heap.insert(test_object("A"));
    let b = heap.insert(test_object("B"));
    let c = heap.insert(test_object("C"));
    let d = heap.insert(test_object("D"));

    let edges = move |id: ObjectId| {
        if id == a {
            vec![b]
        } else if id == b {
            vec![c]
        } else if id == c {
            vec![d]
        } else {
            Vec::new()
        }
    };
    let options = GraphOptions::new().cull(move |id, _| id == b);
    let diagram = GraphBuilder::new(&heap, options)
        .build(&[a], &edges, Direction::Backward)
        .unwrap();

    assert_eq!(diagram.nodes(), vec!["o1", "o3", "o4"]);
    let edges: Vec<(&str, &str)> = diagram.edges().iter().map(|e| (e.from, e.to)).collect();
    assert_eq!(edges, vec![("o3", "o1"), ("o4", "o3")]);
}

#[test]
fn test_mapping_edge_labels() {
    let mut heap = Heap::new();
    let value = heap.insert(test_object("value"));
    heap.insert(HeapObject::new("dict").entry("config", value));

    let dot = backrefs(&heap, &[value], GraphOptions::new()).to_dot();
    assert!(dot.contains("  o2 -> o1 [label=\"config\",weight=2];\n"));
}

#[test]
fn test_function_attribute_edge_from_snapshot() {
    let json = r#"{"objects": [
        {"id": 1, "type": "dict", "kind": "mapping"},
        {"id": 2, "type": "function", "kind": "function", "named": {"__globals__": 1}}
    ]}"#;
    let heap = Heap::from_snapshot(serde_json::from_str(json).unwrap()).unwrap();

    let dot = backrefs(&heap, &[ObjectId(1)], GraphOptions::new()).to_dot();
    assert!(dot.contains("  o2 -> o1 [label=\"__globals__\",weight=10];\n"));
    assert!(dot.contains("  o2[label=\"function\\n<function function>\"];\n"));
}

#[test]
fn test_unknown_root_is_an_error() {
    let heap = Heap::new();
    let err = GraphBuilder::new(&heap, GraphOptions::new())
        .build(&[ObjectId(3)], &Referrers(&heap), Direction::Backward)
        .unwrap_err();
    assert!(matches!(err, Error::UnknownObject(ObjectId(3))));
}

// ============================================================================
// Chain and Census Tests
// ============================================================================

#[test]
fn test_chain_no_match_returns_start() {
    let mut heap = Heap::new();
    let a = heap.insert(test_object("A"));
    heap.insert(test_object("B").refs([a]));

    let chain = find_backref_chain(&heap, a, |_, o| o.type_name() == "Missing", 20, &HashSet::new());
    assert_eq!(chain, vec![a]);
}

#[test]
fn test_count_equals_typestats() {
    let mut heap = Heap::new();
    for _ in 0..3 {
        heap.insert(HeapObject::new("dict"));
    }
    heap.insert(HeapObject::new("list"));

    let stats = typestats(&heap, true);
    assert_eq!(stats.len(), 2);
    for (name, n) in stats {
        assert_eq!(count(&heap, &name), n);
    }
}

// ============================================================================
// Output Tests
// ============================================================================

#[test]
fn test_conflicting_outputs() {
    let mut heap = Heap::new();
    let a = heap.insert(test_object("A"));
    let mut sink = Vec::new();
    let output = GraphOutput {
        filename: Some("graph.dot".into()),
        sink: Some(&mut sink),
    };
    let presenter = Presenter::new(&SystemTools);
    let err = show_backrefs(&heap, &[a], GraphOptions::new(), output, &presenter).unwrap_err();
    assert!(matches!(err, Error::Argument(_)));
}

#[test]
fn test_write_dot_file() {
    let mut heap = Heap::new();
    let a = heap.insert(test_object("A"));
    heap.insert(test_object("B").refs([a]));

    let temp = TempDir::new().unwrap();
    let path = temp.path().join("graph.dot");
    let presenter = Presenter::new(&SystemTools);
    let presentation =
        show_backrefs(&heap, &[a], GraphOptions::new(), GraphOutput::file(&path), &presenter).unwrap();

    assert_eq!(
        presentation.messages,
        vec![format!("Graph written to {} (2 nodes)", path.display())]
    );
    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with("digraph ObjectGraph {\n"));
    assert!(contents.contains("  o2 -> o1;\n"));
}

#[test]
fn test_snapshot_file_round_trip() {
    let mut heap = Heap::new();
    let a = heap.insert(test_object("A"));
    heap.insert(test_object("B").refs([a]));

    let temp = TempDir::new().unwrap();
    let path = temp.path().join("heap.json");
    fs::write(&path, serde_json::to_string(&heap.to_snapshot()).unwrap()).unwrap();

    let loaded = Heap::load(&path).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.referrers(a), heap.referrers(a));
}

// ============================================================================
// CLI Tests
// ============================================================================

const SNAPSHOT: &str = r#"{
  "objects": [
    {"id": 1, "type": "Widget", "module": "app.ui", "summary": "<Widget main>"},
    {"id": 2, "type": "list", "kind": "container", "refs": [1]},
    {"id": 3, "type": "dict", "kind": "mapping", "entries": [{"key": "widgets", "value": 2}]},
    {"id": 4, "type": "module", "kind": "module", "summary": "<module app>", "attributes": 3},
    {"id": 5, "type": "Widget", "module": "app.ui"}
  ]
}"#;

fn write_snapshot(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("heap.json");
    fs::write(&path, SNAPSHOT).unwrap();
    path
}

fn refgraph(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("refgraph").unwrap();
    cmd.current_dir(dir);
    cmd
}

#[test]
fn test_cli_backrefs_to_stdout() {
    let temp = TempDir::new().unwrap();
    let snapshot = write_snapshot(temp.path());

    refgraph(temp.path())
        .arg("backrefs")
        .arg(&snapshot)
        .args(["--root", "1", "--output", "-"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("digraph ObjectGraph {"))
        .stdout(predicate::str::contains("  o2 -> o1;"))
        .stdout(predicate::str::contains("  o3 -> o2 [label=\"widgets\",weight=2];"))
        .stdout(predicate::str::contains("  o4 -> o3 [label=\"__dict__\",weight=10];"));
}

#[test]
fn test_cli_backrefs_refcounts() {
    let temp = TempDir::new().unwrap();
    let snapshot = write_snapshot(temp.path());

    refgraph(temp.path())
        .arg("backrefs")
        .arg(&snapshot)
        .args(["--root", "1", "--refcounts", "--output", "-"])
        .assert()
        .success()
        .stdout(predicate::str::contains("  o1[label=\"Widget [1]\\n<Widget main>\"];"))
        .stdout(predicate::str::contains("  o2[label=\"list [1]\\n1 items\"];"));
}

#[test]
fn test_cli_refs_to_dot_file() {
    let temp = TempDir::new().unwrap();
    let snapshot = write_snapshot(temp.path());
    let output = temp.path().join("refs.dot");

    refgraph(temp.path())
        .arg("refs")
        .arg(&snapshot)
        .args(["--root", "2", "--depth", "1", "--output"])
        .arg(&output)
        .assert()
        .success()
        .stderr(predicate::str::contains("Graph written to"));

    let dot = fs::read_to_string(&output).unwrap();
    assert!(dot.contains("  o2 -> o1;\n"));
}

#[test]
fn test_cli_exclude_type() {
    let temp = TempDir::new().unwrap();
    let snapshot = write_snapshot(temp.path());

    refgraph(temp.path())
        .arg("backrefs")
        .arg(&snapshot)
        .args(["--root", "1", "--exclude-type", "li*", "--output", "-"])
        .assert()
        .success()
        .stdout(predicate::str::contains("o2").not());
}

#[test]
fn test_cli_count() {
    let temp = TempDir::new().unwrap();
    let snapshot = write_snapshot(temp.path());

    refgraph(temp.path())
        .arg("count")
        .arg(&snapshot)
        .arg("Widget")
        .assert()
        .success()
        .stdout("2\n");
}

#[test]
fn test_cli_stats() {
    let temp = TempDir::new().unwrap();
    let snapshot = write_snapshot(temp.path());

    refgraph(temp.path())
        .arg("stats")
        .arg(&snapshot)
        .args(["--limit", "1"])
        .assert()
        .success()
        .stdout("Widget 2\n");
}

#[test]
fn test_cli_chain() {
    let temp = TempDir::new().unwrap();
    let snapshot = write_snapshot(temp.path());

    refgraph(temp.path())
        .arg("chain")
        .arg(&snapshot)
        .args(["--from", "1", "--to-type", "module"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("4\tmodule\t<module app>\n"))
        .stdout(predicate::str::ends_with("1\tWidget\t<Widget main>\n"));
}

#[test]
fn test_cli_leaks() {
    let temp = TempDir::new().unwrap();
    let snapshot = write_snapshot(temp.path());

    refgraph(temp.path())
        .arg("leaks")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("4\tmodule"))
        .stdout(predicate::str::contains("5\tWidget"))
        .stdout(predicate::str::contains("2 objects without referrers"));
}

#[test]
fn test_cli_missing_snapshot() {
    let temp = TempDir::new().unwrap();

    refgraph(temp.path())
        .args(["count", "missing.json", "Widget"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Path not found"));
}

#[test]
fn test_cli_unknown_root() {
    let temp = TempDir::new().unwrap();
    let snapshot = write_snapshot(temp.path());

    refgraph(temp.path())
        .arg("backrefs")
        .arg(&snapshot)
        .args(["--root", "99", "--output", "-"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown object: 99"));
}

#[test]
fn test_cli_version() {
    let temp = TempDir::new().unwrap();

    refgraph(temp.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("refgraph "));
}
