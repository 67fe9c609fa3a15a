use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::*;
use crate::config::{Config, ModeConfig};

fn tmp_path(name: &str) -> std::path::PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("kinbaku-graph-test-{}-{}.kbk", name, std::process::id()));
    let _ = std::fs::remove_file(&p);
    p
}

fn open_new(path: &std::path::Path) -> Graph {
    let mut cfg = Config::new(path);
    cfg.set_mode(ModeConfig::New).set_table_increment(64);
    Graph::open(cfg).unwrap()
}

#[test]
fn test_add_node_is_idempotent() {
    let path = tmp_path("idempotent-node");
    let mut g = open_new(&path);
    g.add_node("alice", vec![]).unwrap();
    g.add_node("alice", vec![]).unwrap();
    assert_eq!(g.n_nodes(), 1);
    assert!(g.has_node("alice"));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_basic_edge_chain() {
    let path = tmp_path("basic-chain");
    let mut g = open_new(&path);
    g.add_edge("alice", "bob", 0, vec![]).unwrap();
    g.add_edge("bob", "carol", 0, vec![]).unwrap();
    assert_eq!(g.n_nodes(), 3);
    assert_eq!(g.n_edges(), 2);
    assert_eq!(g.neighbors("alice").unwrap(), vec!["bob".to_string()]);
    assert_eq!(g.predecessors("carol").unwrap(), vec!["bob".to_string()]);
    assert_eq!(g.out_degree("bob").unwrap(), 1);
    assert_eq!(g.in_degree("bob").unwrap(), 1);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_add_edge_is_idempotent_on_attrs() {
    let path = tmp_path("idempotent-edge");
    let mut g = open_new(&path);
    g.add_edge("alice", "bob", 0, vec![Value::I32(1)]).unwrap();
    g.add_edge("alice", "bob", 0, vec![Value::I32(2)]).unwrap();
    assert_eq!(g.n_edges(), 1);
    let e = g.edge("alice", "bob", 0).unwrap();
    assert_eq!(e.attrs, vec![Value::I32(2)]);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_self_loop_add_and_remove() {
    let path = tmp_path("self-loop");
    let mut g = open_new(&path);
    g.add_edge("alice", "alice", 0, vec![]).unwrap();
    assert!(g.has_edge("alice", "alice", 0));
    assert_eq!(g.out_degree("alice").unwrap(), 1);
    assert_eq!(g.in_degree("alice").unwrap(), 1);
    g.remove_edge("alice", "alice", 0).unwrap();
    assert!(!g.has_edge("alice", "alice", 0));
    assert_eq!(g.n_edges(), 0);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_remove_node_drops_incident_edges() {
    let path = tmp_path("remove-node");
    let mut g = open_new(&path);
    g.add_edge("alice", "bob", 0, vec![]).unwrap();
    g.add_edge("carol", "bob", 1, vec![]).unwrap();
    g.add_edge("bob", "dave", 0, vec![]).unwrap();
    g.remove_node("bob").unwrap();
    assert!(!g.has_node("bob"));
    assert_eq!(g.n_edges(), 0);
    assert!(g.has_node("alice"));
    assert!(g.has_node("carol"));
    assert!(g.has_node("dave"));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_set_neighbors_diffs_against_current() {
    let path = tmp_path("set-neighbors");
    let mut g = open_new(&path);
    g.add_edge("alice", "bob", DEFAULT_EDGE_TYPE, vec![]).unwrap();
    g.add_edge("alice", "carol", DEFAULT_EDGE_TYPE, vec![]).unwrap();
    let wanted: HashSet<String> = ["carol", "dave"].iter().map(|s| s.to_string()).collect();
    g.set_neighbors("alice", &wanted).unwrap();
    let mut got: Vec<String> = g.neighbors("alice").unwrap();
    got.sort();
    assert_eq!(got, vec!["carol".to_string(), "dave".to_string()]);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_common_neighbors() {
    let path = tmp_path("common-neighbors");
    let mut g = open_new(&path);
    g.add_edge("alice", "shared", DEFAULT_EDGE_TYPE, vec![]).unwrap();
    g.add_edge("alice", "only_a", DEFAULT_EDGE_TYPE, vec![]).unwrap();
    g.add_edge("bob", "shared", DEFAULT_EDGE_TYPE, vec![]).unwrap();
    let common = g.common_neighbors("alice", "bob").unwrap();
    assert_eq!(common, ["shared".to_string()].into_iter().collect());
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_nodes_and_edges_enumeration() {
    let path = tmp_path("enumeration");
    let mut g = open_new(&path);
    g.add_edge("alice", "bob", 0, vec![]).unwrap();
    g.add_edge("alice", "carol", 1, vec![]).unwrap();
    let mut nodes = g.nodes().unwrap();
    nodes.sort();
    assert_eq!(nodes, vec!["alice".to_string(), "bob".to_string(), "carol".to_string()]);
    let edges = g.edges().unwrap();
    assert_eq!(edges.len(), 2);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_batch_get_nodes_is_resumable() {
    let path = tmp_path("batch-nodes");
    let mut g = open_new(&path);
    for key in ["a", "b", "c", "d", "e"] {
        g.add_node(key, vec![]).unwrap();
    }
    let mut seen = Vec::new();
    let mut cursor = 0i64;
    loop {
        let (batch, next) = g.batch_get_nodes(2, cursor).unwrap();
        seen.extend(batch.into_iter().map(|n| n.key));
        if next == -1 {
            break;
        }
        cursor = next;
    }
    seen.sort();
    assert_eq!(seen, vec!["a", "b", "c", "d", "e"]);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_reopen_and_find_tombstones_recycles_slots() {
    let path = tmp_path("reopen-tombstones");
    {
        let mut g = open_new(&path);
        g.add_edge("alice", "bob", 0, vec![]).unwrap();
        g.remove_node("bob").unwrap();
        g.close().unwrap();
    }
    {
        let mut cfg = Config::new(&path);
        cfg.set_mode(ModeConfig::ReadWrite).set_preload(true);
        let mut g = Graph::open(cfg).unwrap();
        assert!(g.has_node("alice"));
        assert!(!g.has_node("bob"));
        g.add_node("carol", vec![]).unwrap();
        assert!(g.has_node("carol"));
    }
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_neighbors_from_and_predecessors_from() {
    let path = tmp_path("neighbors-from");
    let mut g = open_new(&path);
    g.add_edge("alice", "bob", 0, vec![]).unwrap();
    g.add_edge("alice", "carol", 0, vec![]).unwrap();
    g.add_edge("bob", "carol", 0, vec![]).unwrap();
    g.add_node("dave", vec![]).unwrap();

    let keys = vec!["alice".to_string(), "bob".to_string(), "dave".to_string()];
    let mut nbs = g.neighbors_from(&keys).unwrap();
    for n in &mut nbs {
        n.sort();
    }
    assert_eq!(nbs.len(), 3);
    assert_eq!(nbs[0], vec!["bob".to_string(), "carol".to_string()]);
    assert_eq!(nbs[1], vec!["carol".to_string()]);
    assert!(nbs[2].is_empty());

    let preds = g.predecessors_from(&keys).unwrap();
    assert_eq!(preds.len(), 3);
    assert!(preds[0].is_empty());
    assert_eq!(preds[1], vec!["alice".to_string()]);
    assert!(preds[2].is_empty());

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_random_edges_match_reference_adjacency() {
    let path = tmp_path("random-adjacency");
    let mut g = open_new(&path);
    let mut rng = StdRng::seed_from_u64(42);

    let keys: Vec<String> = (0..12).map(|i| format!("n{}", i)).collect();
    let mut pairs: Vec<(usize, usize)> = Vec::new();
    for i in 0..keys.len() {
        for j in 0..keys.len() {
            if i != j {
                pairs.push((i, j));
            }
        }
    }
    pairs.shuffle(&mut rng);
    pairs.truncate(20);

    let mut reference: std::collections::HashMap<String, HashSet<String>> = std::collections::HashMap::new();
    for &(i, j) in &pairs {
        g.add_edge(&keys[i], &keys[j], 0, vec![]).unwrap();
        reference.entry(keys[i].clone()).or_default().insert(keys[j].clone());
    }

    for key in &keys {
        let mut got: Vec<String> = g.neighbors(key).unwrap();
        got.sort();
        let mut want: Vec<String> = reference.get(key).cloned().unwrap_or_default().into_iter().collect();
        want.sort();
        assert_eq!(got, want, "neighbors mismatch for {}", key);
    }
    let _ = std::fs::remove_file(&path);
}
