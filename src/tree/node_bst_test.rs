use super::*;
use crate::cache::GraphCache;
use crate::codec::NodeRecord;
use crate::file::GraphFile;
use crate::schema::Schema;

fn tmp_file(tag: &str) -> (std::path::PathBuf, GraphFile) {
    let mut p = std::env::temp_dir();
    p.push(format!("kinbaku-nodebst-{}-{}.kbk", std::process::id(), tag));
    let _ = std::fs::remove_file(&p);
    let gf = GraphFile::create(&p, 15, 15, 64, Schema::new(), Schema::new()).unwrap();
    (p, gf)
}

fn insert(file: &mut GraphFile, cache: &mut GraphCache, idx: u64, hash: u32, key: &str) -> u64 {
    let (parent, side) = find_node_pos(file, cache, hash, key).unwrap();
    assert_ne!(side, 0, "key {} already present", key);
    let pos = file.layout.node_slots as u64 * (idx + 1);
    let node = NodeRecord {
        exists: true,
        hash,
        key: key.to_string(),
        index: idx,
        position: pos,
        parent: 0,
        left: 0,
        right: 0,
        edge_start: 0,
        attrs: vec![],
    };
    file.write_node(pos, &node).unwrap();
    attach(file, parent, side, pos).unwrap();
    pos
}

fn keys_inorder(file: &mut GraphFile) -> Vec<String> {
    let root = file.read_node(0).unwrap().left;
    inorder(file, root)
        .unwrap()
        .into_iter()
        .map(|pos| file.read_node(pos).unwrap().key)
        .collect()
}

#[test]
fn test_insert_and_find() {
    let (path, mut gf) = tmp_file("find");
    let mut cache = GraphCache::new(8);
    insert(&mut gf, &mut cache, 0, 10, "b");
    insert(&mut gf, &mut cache, 1, 5, "a");
    insert(&mut gf, &mut cache, 2, 20, "c");

    let (pos, side) = find_node_pos(&mut gf, &mut cache, 10, "b").unwrap();
    assert_eq!(side, 0);
    assert_eq!(gf.read_node(pos).unwrap().key, "b");

    assert_eq!(keys_inorder(&mut gf), vec!["a", "b", "c"]);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_delete_leaf() {
    let (path, mut gf) = tmp_file("delleaf");
    let mut cache = GraphCache::new(8);
    insert(&mut gf, &mut cache, 0, 10, "b");
    insert(&mut gf, &mut cache, 1, 5, "a");
    insert(&mut gf, &mut cache, 2, 20, "c");

    let (pos, _) = find_node_pos(&mut gf, &mut cache, 5, "a").unwrap();
    delete(&mut gf, pos).unwrap();
    assert_eq!(keys_inorder(&mut gf), vec!["b", "c"]);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_delete_one_child() {
    let (path, mut gf) = tmp_file("delonechild");
    let mut cache = GraphCache::new(8);
    insert(&mut gf, &mut cache, 0, 10, "b");
    insert(&mut gf, &mut cache, 1, 5, "a");
    insert(&mut gf, &mut cache, 2, 3, "aa"); // left child of "a"

    let (pos, _) = find_node_pos(&mut gf, &mut cache, 5, "a").unwrap();
    delete(&mut gf, pos).unwrap();
    assert_eq!(keys_inorder(&mut gf), vec!["aa", "b"]);
    let (_, side) = find_node_pos(&mut gf, &mut cache, 3, "aa").unwrap();
    assert_eq!(side, 0);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_delete_two_children_successor_is_direct_child() {
    let (path, mut gf) = tmp_file("del2a");
    let mut cache = GraphCache::new(8);
    insert(&mut gf, &mut cache, 0, 10, "b");
    insert(&mut gf, &mut cache, 1, 5, "a");
    insert(&mut gf, &mut cache, 2, 20, "d");
    insert(&mut gf, &mut cache, 3, 15, "c"); // right subtree's leftmost = direct right child of b? no: b's right is d

    // b: left=a, right=d; d: left=c. successor of b = leftmost(d's subtree)=c, which is d's left, not d itself.
    let (pos, _) = find_node_pos(&mut gf, &mut cache, 10, "b").unwrap();
    delete(&mut gf, pos).unwrap();
    assert_eq!(keys_inorder(&mut gf), vec!["a", "c", "d"]);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_delete_two_children_successor_is_right_child() {
    let (path, mut gf) = tmp_file("del2b");
    let mut cache = GraphCache::new(8);
    insert(&mut gf, &mut cache, 0, 10, "b");
    insert(&mut gf, &mut cache, 1, 5, "a");
    insert(&mut gf, &mut cache, 2, 20, "d"); // b's right child has no left child: successor == right child itself

    let (pos, _) = find_node_pos(&mut gf, &mut cache, 10, "b").unwrap();
    delete(&mut gf, pos).unwrap();
    assert_eq!(keys_inorder(&mut gf), vec!["a", "d"]);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_find_on_empty_tree() {
    let (path, mut gf) = tmp_file("empty");
    let mut cache = GraphCache::new(8);
    let (pos, side) = find_node_pos(&mut gf, &mut cache, 1, "x").unwrap();
    assert_eq!(pos, 0);
    assert_eq!(side, -1);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_sentinel_routes_both_directions() {
    use crate::file::SENTINEL_HASH;

    let (path, mut gf) = tmp_file("sentinel-both-sides");
    let mut cache = GraphCache::new(8);
    // below the sentinel's hash: must land in sentinel.left.
    insert(&mut gf, &mut cache, 0, SENTINEL_HASH - 1, "low");
    // above the sentinel's hash: must land in sentinel.right, not be
    // forced down the left subtree alongside "low".
    insert(&mut gf, &mut cache, 1, SENTINEL_HASH + 1, "high");

    let sentinel = gf.read_node(0).unwrap();
    assert_ne!(sentinel.left, 0);
    assert_ne!(sentinel.right, 0);
    assert_ne!(sentinel.left, sentinel.right);

    let (low_pos, low_side) = find_node_pos(&mut gf, &mut cache, SENTINEL_HASH - 1, "low").unwrap();
    assert_eq!(low_side, 0);
    assert_eq!(low_pos, sentinel.left);

    let (high_pos, high_side) = find_node_pos(&mut gf, &mut cache, SENTINEL_HASH + 1, "high").unwrap();
    assert_eq!(high_side, 0);
    assert_eq!(high_pos, sentinel.right);

    let _ = std::fs::remove_file(&path);
}
