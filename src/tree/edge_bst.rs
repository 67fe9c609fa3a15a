//! Per-node out- and in-edge BSTs. Both trees hang off the same edge
//! records — the out-tree via `out_edge_*`, the in-tree via `in_edge_*`
//! — so insertion and deletion are written generically over which field
//! group is in play (spec §4.4.2).

use std::cmp::Ordering;

use crate::codec::EdgeRecord;
use crate::file::GraphFile;
use crate::{err_at, Result};

/// Selects which of an edge record's two independent link triples a tree
/// operation should read and write.
pub trait Links {
    fn get(edge: &EdgeRecord) -> (u64, u64, u64); // (left, right, parent)
    fn set_left(edge: &mut EdgeRecord, v: u64);
    fn set_right(edge: &mut EdgeRecord, v: u64);
    fn set_parent(edge: &mut EdgeRecord, v: u64);
}

pub struct OutTree;

impl Links for OutTree {
    fn get(e: &EdgeRecord) -> (u64, u64, u64) {
        (e.out_edge_left, e.out_edge_right, e.out_edge_parent)
    }
    fn set_left(e: &mut EdgeRecord, v: u64) {
        e.out_edge_left = v;
    }
    fn set_right(e: &mut EdgeRecord, v: u64) {
        e.out_edge_right = v;
    }
    fn set_parent(e: &mut EdgeRecord, v: u64) {
        e.out_edge_parent = v;
    }
}

pub struct InTree;

impl Links for InTree {
    fn get(e: &EdgeRecord) -> (u64, u64, u64) {
        (e.in_edge_left, e.in_edge_right, e.in_edge_parent)
    }
    fn set_left(e: &mut EdgeRecord, v: u64) {
        e.in_edge_left = v;
    }
    fn set_right(e: &mut EdgeRecord, v: u64) {
        e.in_edge_right = v;
    }
    fn set_parent(e: &mut EdgeRecord, v: u64) {
        e.in_edge_parent = v;
    }
}

/// Ordering key shared by both trees: `(hash, source_position,
/// target_position, edge_type)`.
fn key(e: &EdgeRecord) -> (u32, u64, u64, i64) {
    (e.hash, e.source_position, e.target_position, e.edge_type)
}

fn cmp_key(a: (u32, u64, u64, i64), b: (u32, u64, u64, i64)) -> Ordering {
    a.cmp(&b)
}

/// Walk the tree rooted at `root` (a node's `edge_start` slot) looking
/// for `target`. Returns `(last_visited, side)`, `side` meaning the same
/// as in [crate::tree::node_bst::find_node_pos]; `root` itself is
/// returned with `side` describing where under the dummy the edge would
/// attach when the tree is empty.
///
/// The dummy at `root` is compared exactly like any other edge record:
/// its own `(hash, source_position, target_position, edge_type)` is a
/// real, meaningful key (the owning node's hash and position twice, edge
/// type `0`), so real edges route to either side of it, not just `left`.
pub fn find<L: Links>(file: &mut GraphFile, root: u64, target: (u32, u64, u64, i64)) -> Result<(u64, i8)> {
    let mut cur = root;
    loop {
        let edge = file.read_edge(cur)?;
        let (left, right, _) = L::get(&edge);
        let side = match cmp_key(target, key(&edge)) {
            Ordering::Less => -1,
            Ordering::Greater => 1,
            Ordering::Equal => return Ok((cur, 0)),
        };
        let child = if side == -1 { left } else { right };
        if child == 0 {
            return Ok((cur, side));
        }
        cur = child;
    }
}

fn set_child<L: Links>(file: &mut GraphFile, parent: u64, side: i8, child: u64) -> Result<()> {
    let mut edge = file.read_edge(parent)?;
    match side {
        -1 => L::set_left(&mut edge, child),
        1 => L::set_right(&mut edge, child),
        _ => return err_at!(Fatal, msg: "invalid bst side {}", side),
    }
    file.write_edge(parent, &edge)
}

fn set_parent<L: Links>(file: &mut GraphFile, pos: u64, parent: u64) -> Result<()> {
    if pos == 0 {
        return Ok(());
    }
    let mut edge = file.read_edge(pos)?;
    L::set_parent(&mut edge, parent);
    file.write_edge(pos, &edge)
}

fn set_left<L: Links>(file: &mut GraphFile, pos: u64, v: u64) -> Result<()> {
    if pos == 0 {
        return Ok(());
    }
    let mut edge = file.read_edge(pos)?;
    L::set_left(&mut edge, v);
    file.write_edge(pos, &edge)
}

fn set_right<L: Links>(file: &mut GraphFile, pos: u64, v: u64) -> Result<()> {
    if pos == 0 {
        return Ok(());
    }
    let mut edge = file.read_edge(pos)?;
    L::set_right(&mut edge, v);
    file.write_edge(pos, &edge)
}

fn side_of<L: Links>(file: &mut GraphFile, parent: u64, child: u64) -> Result<i8> {
    let edge = file.read_edge(parent)?;
    let (left, right, _) = L::get(&edge);
    if left == child {
        Ok(-1)
    } else if right == child {
        Ok(1)
    } else {
        log::error!("kinbaku: edge-bst integrity violation: {} is not a tree-child of {}", child, parent);
        err_at!(Integrity, msg: "{} is not a tree-child of {}", child, parent)
    }
}

fn leftmost<L: Links>(file: &mut GraphFile, mut pos: u64) -> Result<u64> {
    loop {
        let edge = file.read_edge(pos)?;
        let (left, _, _) = L::get(&edge);
        if left == 0 {
            return Ok(pos);
        }
        pos = left;
    }
}

/// Attach `new_pos` (already written with its full record) as a child of
/// `parent` on `side`.
pub fn attach<L: Links>(file: &mut GraphFile, parent: u64, side: i8, new_pos: u64) -> Result<()> {
    set_child::<L>(file, parent, side, new_pos)?;
    set_parent::<L>(file, new_pos, parent)
}

/// Remove `pos` from this tree (but do not erase the edge slot itself —
/// callers typically do this once for the out-tree and once for the
/// in-tree before freeing the slot).
pub fn delete<L: Links>(file: &mut GraphFile, pos: u64) -> Result<()> {
    let edge = file.read_edge(pos)?;
    let (left, right, parent) = L::get(&edge);

    match (left, right) {
        (0, 0) => {
            let side = side_of::<L>(file, parent, pos)?;
            set_child::<L>(file, parent, side, 0)?;
        }
        (child, 0) | (0, child) => {
            let side = side_of::<L>(file, parent, pos)?;
            set_child::<L>(file, parent, side, child)?;
            set_parent::<L>(file, child, parent)?;
        }
        (left, right) => {
            let successor = leftmost::<L>(file, right)?;
            if successor == right {
                let side = side_of::<L>(file, parent, pos)?;
                set_child::<L>(file, parent, side, successor)?;
                set_parent::<L>(file, successor, parent)?;
                set_left::<L>(file, successor, left)?;
                set_parent::<L>(file, left, successor)?;
            } else {
                let succ_edge = file.read_edge(successor)?;
                let (_, succ_right, succ_parent) = L::get(&succ_edge);

                set_left::<L>(file, succ_parent, succ_right)?;
                if succ_right != 0 {
                    set_parent::<L>(file, succ_right, succ_parent)?;
                }

                let side = side_of::<L>(file, parent, pos)?;
                set_child::<L>(file, parent, side, successor)?;
                set_parent::<L>(file, successor, parent)?;
                set_left::<L>(file, successor, left)?;
                set_parent::<L>(file, left, successor)?;
                set_right::<L>(file, successor, right)?;
                set_parent::<L>(file, right, successor)?;
            }
        }
    }
    Ok(())
}

/// In-order traversal of the real edges under `root` (a node's
/// `edge_start`), skipping the dummy itself. Explicit stack per spec §9.
pub fn inorder<L: Links>(file: &mut GraphFile, root: u64) -> Result<Vec<u64>> {
    let dummy = file.read_edge(root)?;
    let (start_left, _, _) = L::get(&dummy);

    let mut stack = Vec::new();
    let mut out = Vec::new();
    let mut cur = start_left;
    loop {
        while cur != 0 {
            stack.push(cur);
            let e = file.read_edge(cur)?;
            let (left, _, _) = L::get(&e);
            cur = left;
        }
        match stack.pop() {
            Some(pos) => {
                out.push(pos);
                let e = file.read_edge(pos)?;
                let (_, right, _) = L::get(&e);
                cur = right;
            }
            None => break,
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "edge_bst_test.rs"]
mod edge_bst_test;
