use super::*;
use crate::file::GraphFile;
use crate::schema::Schema;

fn tmp_file() -> (std::path::PathBuf, GraphFile) {
    let mut p = std::env::temp_dir();
    p.push(format!("kinbaku-alloc-test-{}-{}.kbk", std::process::id(), rand_suffix()));
    let _ = std::fs::remove_file(&p);
    let gf = GraphFile::create(&p, 15, 15, 8, Schema::new(), Schema::new()).unwrap();
    (p, gf)
}

fn rand_suffix() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().subsec_nanos() as u64
}

#[test]
fn test_alloc_node_bumps_pointer() {
    let (path, mut gf) = tmp_file();
    let mut alloc = Allocator::new();
    let before = gf.header.next_table_position;
    let (pos, recycled) = alloc.alloc_node(&mut gf).unwrap();
    assert_eq!(pos, before);
    assert!(!recycled);
    assert_eq!(gf.header.next_table_position, before + gf.layout.node_slots as u64);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_free_then_alloc_recycles() {
    let (path, mut gf) = tmp_file();
    let mut alloc = Allocator::new();
    let (pos, _) = alloc.alloc_node(&mut gf).unwrap();
    alloc.free_node(&mut gf, pos).unwrap();
    assert_eq!(alloc.free_node_count(), 1);
    let (pos2, recycled) = alloc.alloc_node(&mut gf).unwrap();
    assert_eq!(pos2, pos);
    assert!(recycled);
    assert_eq!(alloc.free_node_count(), 0);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_alloc_edge_steps_by_one() {
    let (path, mut gf) = tmp_file();
    let mut alloc = Allocator::new();
    let (pos1, _) = alloc.alloc_edge(&mut gf).unwrap();
    let (pos2, _) = alloc.alloc_edge(&mut gf).unwrap();
    assert_eq!(pos2, pos1 + 1);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_alloc_triggers_grow_when_near_capacity() {
    let (path, mut gf) = tmp_file();
    let mut alloc = Allocator::new();
    let before_table = gf.header.table_size;
    for _ in 0..10 {
        alloc.alloc_edge(&mut gf).unwrap();
    }
    assert!(gf.header.table_size >= before_table);
    let _ = std::fs::remove_file(&path);
}
