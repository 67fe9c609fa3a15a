//! Public graph API: node/edge CRUD, adjacency queries, iteration, and
//! maintenance, layered over the file substrate, allocator, index trees,
//! and cache (spec §4.5, §6).

use std::collections::HashSet;

use crate::alloc::Allocator;
use crate::cache::GraphCache;
use crate::codec::{EdgeRecord, NodeRecord};
use crate::config::Config;
use crate::file::GraphFile;
use crate::hash::{edge_hash, hash32};
use crate::schema::Value;
use crate::tree::edge_bst::{self, InTree, OutTree};
use crate::tree::node_bst;
use crate::{err_at, Error, ErrorKind, Result};

/// Default edge-type discriminant used by the adjacency-set convenience
/// methods (`set_neighbors`, `set_predecessors`, `common_neighbors`,
/// `common_predecessors`), which operate over neighborhoods rather than
/// individual typed edges.
pub const DEFAULT_EDGE_TYPE: i64 = 0;

/// A node as seen through the public API: its key and user attributes.
/// Structural fields (position, BST links, `edge_start`) are
/// implementation detail and never leave this module.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub key: String,
    pub attrs: Vec<Value>,
}

/// An edge as seen through the public API.
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub edge_type: i64,
    pub attrs: Vec<Value>,
}

pub struct Graph {
    file: GraphFile,
    alloc: Allocator,
    cache: GraphCache,
}

impl Graph {
    /// Open (or create) the graph described by `config`.
    pub fn open(config: Config) -> Result<Graph> {
        let mut file = match config.mode {
            crate::config::ModeConfig::New => GraphFile::create(
                &config.path,
                config.max_key_len,
                config.max_str_len,
                config.table_increment,
                config.node_schema.clone(),
                config.edge_schema.clone(),
            )?,
            mode => GraphFile::open(
                &config.path,
                mode.into(),
                config.node_schema.clone(),
                config.edge_schema.clone(),
            )?,
        };

        let mut alloc = Allocator::new();

        // The sentinel gets its own edge-start dummy just like any other
        // node, so the simple `n_edges - n_nodes` public count (spec §3)
        // holds uniformly. Only needed once, at creation time.
        let sentinel = file.read_node(0)?;
        if sentinel.edge_start == 0 {
            let (dummy_pos, _) = alloc.alloc_edge(&mut file)?;
            let dummy = EdgeRecord {
                exists: true,
                is_edge_start: true,
                position: dummy_pos,
                source_position: 0,
                target_position: 0,
                hash: sentinel.hash,
                edge_type: 0,
                out_edge_left: 0,
                out_edge_right: 0,
                out_edge_parent: 0,
                in_edge_left: 0,
                in_edge_right: 0,
                in_edge_parent: 0,
                attrs: vec![],
            };
            file.write_edge(dummy_pos, &dummy)?;
            let mut sentinel = sentinel;
            sentinel.edge_start = dummy_pos;
            file.write_node(0, &sentinel)?;
            file.header.n_edges += 1;
        }

        let mut graph = Graph {
            file,
            alloc,
            cache: GraphCache::new(config.cache_len),
        };

        if config.preload {
            graph.find_tombstones()?;
        }

        Ok(graph)
    }

    pub fn n_nodes(&self) -> u64 {
        self.file.header.n_nodes - 1
    }

    pub fn n_edges(&self) -> u64 {
        self.file.header.n_edges - self.file.header.n_nodes
    }

    fn not_found_node(key: &str) -> Error {
        Error(ErrorKind::NodeNotFound, format!("node {:?} not found", key))
    }

    fn not_found_edge(src: &str, tgt: &str, edge_type: i64) -> Error {
        Error(
            ErrorKind::EdgeNotFound,
            format!("edge ({:?}, {:?}, {}) not found", src, tgt, edge_type),
        )
    }

    /// Resolve `key` to its node record, consulting the position and
    /// full-record caches before walking the node-BST.
    fn resolve(&mut self, key: &str) -> Result<NodeRecord> {
        if let Some(pos) = self.cache.position_for_key(key) {
            if let Some(node) = self.cache.node_at(pos) {
                return Ok(node);
            }
            let node = self.file.read_node(pos)?;
            self.cache.remember(&node);
            return Ok(node);
        }
        let hash = hash32(key.as_bytes());
        let (pos, side) = node_bst::find_node_pos(&mut self.file, &mut self.cache, hash, key)?;
        if side != 0 {
            return Err(Self::not_found_node(key));
        }
        let node = self.file.read_node(pos)?;
        self.cache.remember(&node);
        Ok(node)
    }

    /// Key of the node at `pos`, via the position→node cache before
    /// falling back to a file read. Used by edge iterators to name
    /// endpoints without a redundant full decode of a node already seen.
    fn node_key_at(&mut self, pos: u64) -> Result<String> {
        if let Some(node) = self.cache.node_at(pos) {
            return Ok(node.key);
        }
        let node = self.file.read_node(pos)?;
        let key = node.key.clone();
        self.cache.remember(&node);
        Ok(key)
    }

    fn resolve_or_create(&mut self, key: &str) -> Result<NodeRecord> {
        match self.resolve(key) {
            Ok(node) => Ok(node),
            Err(Error(ErrorKind::NodeNotFound, _)) => {
                self.add_node(key, vec![])?;
                self.resolve(key)
            }
            Err(err) => Err(err),
        }
    }

    pub fn has_node(&mut self, key: &str) -> bool {
        matches!(self.resolve(key), Ok(_))
    }

    pub fn node(&mut self, key: &str) -> Result<Node> {
        let n = self.resolve(key)?;
        Ok(Node {
            key: n.key,
            attrs: n.attrs,
        })
    }

    /// Idempotent: if `key` already exists, overwrites its attributes
    /// only. Structural fields (`index`, `parent`, `left`, `right`,
    /// `edge_start`, `position`) are preserved untouched.
    pub fn add_node(&mut self, key: &str, attrs: Vec<Value>) -> Result<()> {
        if key.len() > self.file.layout.max_key_len as usize {
            return err_at!(KeyTooLong, msg: "key {:?} exceeds max_key_len {}", key, self.file.layout.max_key_len);
        }
        let hash = hash32(key.as_bytes());
        let (parent, side) = node_bst::find_node_pos(&mut self.file, &mut self.cache, hash, key)?;

        if side == 0 {
            let mut node = self.file.read_node(parent)?;
            node.attrs = attrs;
            self.file.write_node(parent, &node)?;
            self.cache.remember(&node);
            return Ok(());
        }

        let (pos, _) = self.alloc.alloc_node(&mut self.file)?;
        let (dummy_pos, _) = self.alloc.alloc_edge(&mut self.file)?;

        let node = NodeRecord {
            exists: true,
            hash,
            key: key.to_string(),
            index: self.file.header.node_id,
            position: pos,
            parent: 0,
            left: 0,
            right: 0,
            edge_start: dummy_pos,
            attrs,
        };
        self.file.write_node(pos, &node)?;

        let dummy = EdgeRecord {
            exists: true,
            is_edge_start: true,
            position: dummy_pos,
            source_position: pos,
            target_position: pos,
            hash,
            edge_type: 0,
            out_edge_left: 0,
            out_edge_right: 0,
            out_edge_parent: 0,
            in_edge_left: 0,
            in_edge_right: 0,
            in_edge_parent: 0,
            attrs: vec![],
        };
        self.file.write_edge(dummy_pos, &dummy)?;

        node_bst::attach(&mut self.file, parent, side, pos)?;

        self.file.header.node_id += 1;
        self.file.header.n_nodes += 1;
        self.file.header.n_edges += 1;
        self.cache.remember(&node);
        Ok(())
    }

    /// Remove `key` and every edge incident to it (as source or target).
    pub fn remove_node(&mut self, key: &str) -> Result<()> {
        let node = self.resolve(key)?;

        let out_edges = edge_bst::inorder::<OutTree>(&mut self.file, node.edge_start)?;
        for epos in out_edges {
            let e = self.file.read_edge(epos)?;
            let tgt = self.node_key_at(e.target_position)?;
            self.remove_edge(key, &tgt, e.edge_type)?;
        }
        let node = self.resolve(key)?; // re-fetch: edge_start etc. unaffected but be safe
        let in_edges = edge_bst::inorder::<InTree>(&mut self.file, node.edge_start)?;
        for epos in in_edges {
            let e = self.file.read_edge(epos)?;
            let src = self.node_key_at(e.source_position)?;
            self.remove_edge(&src, key, e.edge_type)?;
        }

        let node = self.resolve(key)?;
        self.alloc.free_edge(&mut self.file, node.edge_start)?;
        node_bst::delete(&mut self.file, node.position)?;
        self.alloc.free_node(&mut self.file, node.position)?;

        self.file.header.n_nodes -= 1;
        self.file.header.n_edges -= 1;
        self.cache.forget(&node);
        Ok(())
    }

    fn edge_key(src: &NodeRecord, tgt: &NodeRecord, edge_type: i64) -> (u32, u64, u64, i64) {
        let h = edge_hash(src.hash, edge_type, tgt.hash);
        (h, src.position, tgt.position, edge_type)
    }

    pub fn has_edge(&mut self, src: &str, tgt: &str, edge_type: i64) -> bool {
        matches!(self.edge(src, tgt, edge_type), Ok(_))
    }

    pub fn edge(&mut self, src: &str, tgt: &str, edge_type: i64) -> Result<Edge> {
        let s = self
            .resolve(src)
            .map_err(|_| Self::not_found_edge(src, tgt, edge_type))?;
        let t = self
            .resolve(tgt)
            .map_err(|_| Self::not_found_edge(src, tgt, edge_type))?;
        let key = Self::edge_key(&s, &t, edge_type);
        let (pos, side) = edge_bst::find::<OutTree>(&mut self.file, s.edge_start, key)?;
        if side != 0 {
            return Err(Self::not_found_edge(src, tgt, edge_type));
        }
        let e = self.file.read_edge(pos)?;
        Ok(Edge {
            source: src.to_string(),
            target: tgt.to_string(),
            edge_type,
            attrs: e.attrs,
        })
    }

    /// Idempotent on `(source, target, type)`: a repeated call overwrites
    /// attributes only. Creates either endpoint on demand.
    pub fn add_edge(&mut self, src: &str, tgt: &str, edge_type: i64, attrs: Vec<Value>) -> Result<()> {
        let s = self.resolve_or_create(src)?;
        let t = self.resolve_or_create(tgt)?;
        let key = Self::edge_key(&s, &t, edge_type);

        let (out_parent, out_side) = edge_bst::find::<OutTree>(&mut self.file, s.edge_start, key)?;
        if out_side == 0 {
            let mut e = self.file.read_edge(out_parent)?;
            e.attrs = attrs;
            self.file.write_edge(out_parent, &e)?;
            return Ok(());
        }

        let (pos, _) = self.alloc.alloc_edge(&mut self.file)?;
        let edge = EdgeRecord {
            exists: true,
            is_edge_start: false,
            position: pos,
            source_position: s.position,
            target_position: t.position,
            hash: key.0,
            edge_type,
            out_edge_left: 0,
            out_edge_right: 0,
            out_edge_parent: 0,
            in_edge_left: 0,
            in_edge_right: 0,
            in_edge_parent: 0,
            attrs,
        };
        self.file.write_edge(pos, &edge)?;
        edge_bst::attach::<OutTree>(&mut self.file, out_parent, out_side, pos)?;

        let (in_parent, in_side) = edge_bst::find::<InTree>(&mut self.file, t.edge_start, key)?;
        if in_side == 0 {
            return err_at!(
                Integrity,
                msg: "edge ({},{},{}) matched in out-tree but not in in-tree",
                src,
                tgt,
                edge_type
            );
        }
        edge_bst::attach::<InTree>(&mut self.file, in_parent, in_side, pos)?;

        self.file.header.n_edges += 1;
        Ok(())
    }

    pub fn remove_edge(&mut self, src: &str, tgt: &str, edge_type: i64) -> Result<()> {
        let s = self
            .resolve(src)
            .map_err(|_| Self::not_found_edge(src, tgt, edge_type))?;
        let t = self
            .resolve(tgt)
            .map_err(|_| Self::not_found_edge(src, tgt, edge_type))?;
        let key = Self::edge_key(&s, &t, edge_type);

        let (pos, side) = edge_bst::find::<OutTree>(&mut self.file, s.edge_start, key)?;
        if side != 0 {
            return Err(Self::not_found_edge(src, tgt, edge_type));
        }

        edge_bst::delete::<OutTree>(&mut self.file, pos)?;
        edge_bst::delete::<InTree>(&mut self.file, pos)?;
        self.alloc.free_edge(&mut self.file, pos)?;
        self.file.header.n_edges -= 1;
        Ok(())
    }

    /// Out-neighborhood of `key`: the targets of its outgoing edges, in
    /// node-BST-independent, edge-BST in-order.
    pub fn neighbors(&mut self, key: &str) -> Result<Vec<String>> {
        let node = self.resolve(key)?;
        let positions = edge_bst::inorder::<OutTree>(&mut self.file, node.edge_start)?;
        let mut out = Vec::with_capacity(positions.len());
        for pos in positions {
            let e = self.file.read_edge(pos)?;
            out.push(self.node_key_at(e.target_position)?);
        }
        Ok(out)
    }

    pub fn predecessors(&mut self, key: &str) -> Result<Vec<String>> {
        let node = self.resolve(key)?;
        let positions = edge_bst::inorder::<InTree>(&mut self.file, node.edge_start)?;
        let mut out = Vec::with_capacity(positions.len());
        for pos in positions {
            let e = self.file.read_edge(pos)?;
            out.push(self.node_key_at(e.source_position)?);
        }
        Ok(out)
    }

    /// Out-neighborhoods of each of `keys`, in order — one list per key,
    /// not merged into a single set (spec §4.5).
    pub fn neighbors_from(&mut self, keys: &[String]) -> Result<Vec<Vec<String>>> {
        keys.iter().map(|key| self.neighbors(key)).collect()
    }

    /// Predecessor sets of each of `keys`, in order.
    pub fn predecessors_from(&mut self, keys: &[String]) -> Result<Vec<Vec<String>>> {
        keys.iter().map(|key| self.predecessors(key)).collect()
    }

    pub fn out_degree(&mut self, key: &str) -> Result<usize> {
        let node = self.resolve(key)?;
        Ok(edge_bst::inorder::<OutTree>(&mut self.file, node.edge_start)?.len())
    }

    pub fn in_degree(&mut self, key: &str) -> Result<usize> {
        let node = self.resolve(key)?;
        Ok(edge_bst::inorder::<InTree>(&mut self.file, node.edge_start)?.len())
    }

    /// Diff `key`'s out-neighborhood against `wanted`, adding/removing
    /// edges of [DEFAULT_EDGE_TYPE] so the two agree (spec §4.5).
    pub fn set_neighbors(&mut self, key: &str, wanted: &HashSet<String>) -> Result<()> {
        let old: HashSet<String> = self.neighbors(key)?.into_iter().collect();
        for add in wanted.difference(&old) {
            self.add_edge(key, add, DEFAULT_EDGE_TYPE, vec![])?;
        }
        for remove in old.difference(wanted) {
            self.remove_edge(key, remove, DEFAULT_EDGE_TYPE)?;
        }
        Ok(())
    }

    pub fn set_predecessors(&mut self, key: &str, wanted: &HashSet<String>) -> Result<()> {
        let old: HashSet<String> = self.predecessors(key)?.into_iter().collect();
        for add in wanted.difference(&old) {
            self.add_edge(add, key, DEFAULT_EDGE_TYPE, vec![])?;
        }
        for remove in old.difference(wanted) {
            self.remove_edge(remove, key, DEFAULT_EDGE_TYPE)?;
        }
        Ok(())
    }

    pub fn common_neighbors(&mut self, a: &str, b: &str) -> Result<HashSet<String>> {
        let na: HashSet<String> = self.neighbors(a)?.into_iter().collect();
        let nb: HashSet<String> = self.neighbors(b)?.into_iter().collect();
        Ok(na.intersection(&nb).cloned().collect())
    }

    pub fn common_predecessors(&mut self, a: &str, b: &str) -> Result<HashSet<String>> {
        let na: HashSet<String> = self.predecessors(a)?.into_iter().collect();
        let nb: HashSet<String> = self.predecessors(b)?.into_iter().collect();
        Ok(na.intersection(&nb).cloned().collect())
    }

    /// All live node keys, in node-BST order (spec §4.4.3).
    pub fn nodes(&mut self) -> Result<Vec<String>> {
        let root = self.file.read_node(0)?.left;
        let positions = node_bst::inorder(&mut self.file, root)?;
        positions
            .into_iter()
            .map(|pos| Ok(self.file.read_node(pos)?.key))
            .collect()
    }

    /// All live edges, via one linear slot scan (spec §4.4.3).
    pub fn edges(&mut self) -> Result<Vec<(String, String, i64)>> {
        let (items, _) = self.scan(0, usize::MAX, false, true)?;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match item {
                ScanItem::Edge(e) => {
                    let s = self.node_key_at(e.source_position)?;
                    let t = self.node_key_at(e.target_position)?;
                    out.push((s, t, e.edge_type));
                }
                ScanItem::Node(_) => unreachable!(),
            }
        }
        Ok(out)
    }

    /// Resumable linear scan, filtered to node records only. `cursor`
    /// should be `0` on the first call; pass back the returned cursor on
    /// each subsequent call until it comes back `-1`.
    pub fn batch_get_nodes(&mut self, batch_size: usize, cursor: i64) -> Result<(Vec<Node>, i64)> {
        let (items, next) = self.scan(cursor, batch_size, true, false)?;
        let nodes = items
            .into_iter()
            .map(|item| match item {
                ScanItem::Node(n) => Node {
                    key: n.key,
                    attrs: n.attrs,
                },
                ScanItem::Edge(_) => unreachable!(),
            })
            .collect();
        Ok((nodes, next))
    }

    /// Resumable linear scan, filtered to real (non-dummy) edge records.
    pub fn batch_get_edges(&mut self, batch_size: usize, cursor: i64) -> Result<(Vec<Edge>, i64)> {
        let (items, next) = self.scan(cursor, batch_size, false, true)?;
        let mut edges = Vec::with_capacity(items.len());
        for item in items {
            if let ScanItem::Edge(e) = item {
                let source = self.node_key_at(e.source_position)?;
                let target = self.node_key_at(e.target_position)?;
                edges.push(Edge {
                    source,
                    target,
                    edge_type: e.edge_type,
                    attrs: e.attrs,
                });
            }
        }
        Ok((edges, next))
    }

    fn scan(
        &mut self,
        cursor: i64,
        batch_size: usize,
        want_nodes: bool,
        want_edges: bool,
    ) -> Result<(Vec<ScanItem>, i64)> {
        let mut pos = if cursor <= 0 {
            self.file.layout.node_slots as u64
        } else {
            cursor as u64
        };
        let limit = self.file.header.next_table_position;
        let mut out = Vec::new();
        while pos < limit && out.len() < batch_size {
            let (is_node, exists) = self.file.read_kind(pos)?;
            if is_node {
                if exists && want_nodes {
                    out.push(ScanItem::Node(self.file.read_node(pos)?));
                }
                pos += self.file.layout.node_slots as u64;
            } else {
                if exists {
                    let e = self.file.read_edge(pos)?;
                    if !e.is_edge_start && want_edges {
                        out.push(ScanItem::Edge(e));
                    }
                }
                pos += 1;
            }
        }
        let next_cursor = if pos >= limit { -1 } else { pos as i64 };
        Ok((out, next_cursor))
    }

    /// Sweep the whole slot table once, seeding the allocator's free
    /// lists from tombstoned slots. Needed after reopening a file whose
    /// in-memory free lists were lost when the previous handle closed
    /// (spec §8 scenario 5).
    pub fn find_tombstones(&mut self) -> Result<()> {
        let mut pos = self.file.layout.node_slots as u64;
        let limit = self.file.header.next_table_position;
        let mut free_nodes = Vec::new();
        let mut free_edges = Vec::new();
        while pos < limit {
            let (is_node, exists) = self.file.read_kind(pos)?;
            if is_node {
                if !exists {
                    free_nodes.push(pos);
                }
                pos += self.file.layout.node_slots as u64;
            } else {
                if !exists {
                    free_edges.push(pos);
                }
                pos += 1;
            }
        }
        log::info!(
            "kinbaku: find_tombstones found {} free nodes, {} free edges",
            free_nodes.len(),
            free_edges.len()
        );
        self.alloc.reseed(free_nodes, free_edges);
        Ok(())
    }

    pub fn empty_cache(&mut self) {
        self.cache.clear();
    }

    /// Flush the header and mapping to the backing file.
    pub fn close(mut self) -> Result<()> {
        self.file.sync_header()
    }
}

enum ScanItem {
    Node(NodeRecord),
    Edge(EdgeRecord),
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod graph_test;
