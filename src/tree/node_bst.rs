//! The global node-BST, rooted through the sentinel at slot `0`. The
//! sentinel's own `left` field holds the position of the real root (`0`
//! when the tree is empty); its `right` is unused. Ordering key is
//! `(hash, key)` lexicographically (spec §3, §4.4.1).

use std::cmp::Ordering;

use crate::cache::GraphCache;
use crate::file::GraphFile;
use crate::{err_at, Result};

fn cmp_key(a_hash: u32, a_key: &str, b_hash: u32, b_key: &str) -> Ordering {
    (a_hash, a_key).cmp(&(b_hash, b_key))
}

/// Tree-info prefix for `pos`, via `cache` on a hit or a fast partial
/// decode on a miss — the BST-descent hot path that never needs the
/// node's key unless hashes tie.
fn tree_info(file: &mut GraphFile, cache: &mut GraphCache, pos: u64) -> Result<(u32, u64, u64)> {
    if let Some(info) = cache.tree_info(pos) {
        return Ok(info);
    }
    let info = file.read_node_tree_info(pos)?;
    cache.put_tree_info(pos, info);
    Ok(info)
}

/// Walk from the sentinel down to where `(hash, key)` either already
/// lives or would be inserted. Returns `(last_visited, side)` where
/// `side` is `-1`/`0`/`1` for left-of/equal-to/right-of the last visited
/// node; `last_visited == 0` (the sentinel) with `side == -1` means the
/// tree is empty.
///
/// The sentinel is a node like any other: its own `hash` field holds
/// [crate::file::SENTINEL_HASH], so it takes part in the very same
/// hash comparison as every other level instead of being special-cased
/// — a real key's hash can fall on either side of it.
pub fn find_node_pos(file: &mut GraphFile, cache: &mut GraphCache, hash: u32, key: &str) -> Result<(u64, i8)> {
    let mut cur = 0u64; // sentinel
    let (mut cur_hash, mut cur_left, mut cur_right) = tree_info(file, cache, cur)?;
    loop {
        let side = match hash.cmp(&cur_hash) {
            Ordering::Less => -1,
            Ordering::Greater => 1,
            Ordering::Equal => {
                let node = file.read_node(cur)?;
                cache.remember(&node);
                match cmp_key(hash, key, node.hash, &node.key) {
                    Ordering::Less => -1,
                    Ordering::Greater => 1,
                    Ordering::Equal => 0,
                }
            }
        };
        if side == 0 {
            return Ok((cur, 0));
        }
        let child = if side == -1 { cur_left } else { cur_right };
        if child == 0 {
            return Ok((cur, side));
        }
        cur = child;
        let info = tree_info(file, cache, cur)?;
        cur_hash = info.0;
        cur_left = info.1;
        cur_right = info.2;
    }
}

/// Attach `new_pos` as a child of `parent` on the given `side` (as
/// returned by [find_node_pos]). Also sets `new_pos`'s own `parent`
/// field. Caller has already written the rest of the new node's record.
pub fn attach(file: &mut GraphFile, parent: u64, side: i8, new_pos: u64) -> Result<()> {
    set_child(file, parent, side, new_pos)?;
    set_field(file, new_pos, Field::Parent, parent)
}

fn set_child(file: &mut GraphFile, parent: u64, side: i8, child: u64) -> Result<()> {
    match side {
        -1 => set_field(file, parent, Field::Left, child),
        1 => set_field(file, parent, Field::Right, child),
        _ => err_at!(Fatal, msg: "invalid bst side {}", side),
    }
}

enum Field {
    Left,
    Right,
    Parent,
}

fn set_field(file: &mut GraphFile, pos: u64, field: Field, value: u64) -> Result<()> {
    let mut node = file.read_node(pos)?;
    match field {
        Field::Left => node.left = value,
        Field::Right => node.right = value,
        Field::Parent => node.parent = value,
    }
    file.write_node(pos, &node)
}

/// Which side of `parent` currently holds `child`.
fn side_of(file: &mut GraphFile, parent: u64, child: u64) -> Result<i8> {
    let node = file.read_node(parent)?;
    if node.left == child {
        Ok(-1)
    } else if node.right == child {
        Ok(1)
    } else {
        log::error!("kinbaku: node-bst integrity violation: {} is not a child of {}", child, parent);
        err_at!(Integrity, msg: "{} is not a child of {}", child, parent)
    }
}

fn leftmost(file: &mut GraphFile, mut pos: u64) -> Result<u64> {
    loop {
        let node = file.read_node(pos)?;
        if node.left == 0 {
            return Ok(pos);
        }
        pos = node.left;
    }
}

/// Remove `pos` from the node-BST, rewiring parent/child links using the
/// fully-consistent successor-replacement variant for the two-children
/// case (spec §4.4.1, §9 open question resolution).
pub fn delete(file: &mut GraphFile, pos: u64) -> Result<()> {
    let node = file.read_node(pos)?;
    let (parent, left, right) = (node.parent, node.left, node.right);

    match (left, right) {
        (0, 0) => {
            let side = side_of(file, parent, pos)?;
            set_child(file, parent, side, 0)?;
        }
        (child, 0) | (0, child) => {
            let side = side_of(file, parent, pos)?;
            set_child(file, parent, side, child)?;
            set_field(file, child, Field::Parent, parent)?;
        }
        (left, right) => {
            let successor = leftmost(file, right)?;
            if successor == right {
                let side = side_of(file, parent, pos)?;
                set_child(file, parent, side, successor)?;
                set_field(file, successor, Field::Parent, parent)?;
                set_field(file, successor, Field::Left, left)?;
                set_field(file, left, Field::Parent, successor)?;
            } else {
                let succ_node = file.read_node(successor)?;
                let succ_parent = succ_node.parent;
                let succ_right = succ_node.right;

                set_field(file, succ_parent, Field::Left, succ_right)?;
                if succ_right != 0 {
                    set_field(file, succ_right, Field::Parent, succ_parent)?;
                }

                let side = side_of(file, parent, pos)?;
                set_child(file, parent, side, successor)?;
                set_field(file, successor, Field::Parent, parent)?;
                set_field(file, successor, Field::Left, left)?;
                set_field(file, left, Field::Parent, successor)?;
                set_field(file, successor, Field::Right, right)?;
                set_field(file, right, Field::Parent, successor)?;
            }
        }
    }
    Ok(())
}

/// In-order traversal of the subtree rooted at `root` (pass the
/// sentinel's `left` field as `root` to walk the whole tree), explicit
/// stack per spec §9 to avoid recursion-depth blowups on large graphs.
pub fn inorder(file: &mut GraphFile, root: u64) -> Result<Vec<u64>> {
    let mut stack = Vec::new();
    let mut out = Vec::new();
    let mut cur = root;
    loop {
        while cur != 0 {
            stack.push(cur);
            cur = file.read_node(cur)?.left;
        }
        match stack.pop() {
            Some(pos) => {
                out.push(pos);
                cur = file.read_node(pos)?.right;
            }
            None => break,
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "node_bst_test.rs"]
mod node_bst_test;
